//! Error taxonomy for transaction pipelines.

use crate::raw_log::ExtractError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, programmatic classification of a failed transaction stream.
///
/// Callers and tests branch on the code, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxErrorCode {
	SubmissionFailure,
	PollingTimeout,
	ChainExecutionFailure,
	MissingRawLog,
	MissingEvents,
	MissingAttribute,
	ParseFailure,
	Cancelled,
	Unexpected,
}

impl TxErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::SubmissionFailure => "submission failure",
			Self::PollingTimeout => "polling timeout",
			Self::ChainExecutionFailure => "chain execution failure",
			Self::MissingRawLog => "missing raw log",
			Self::MissingEvents => "missing events",
			Self::MissingAttribute => "missing attribute",
			Self::ParseFailure => "failed to parse tx result",
			Self::Cancelled => "cancelled",
			Self::Unexpected => "unexpected",
		}
	}
}

impl std::fmt::Display for TxErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Failure raised by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
	#[error("Transaction submission failed: {0}")]
	Submission(String),

	#[error("Transaction {tx_hash} was not included after {attempts} attempts ({elapsed_ms}ms)")]
	PollingTimeout {
		tx_hash: String,
		attempts: u32,
		elapsed_ms: u64,
	},

	#[error("Stage '{stage}' did not finish within {after_ms}ms")]
	StageTimeout { stage: String, after_ms: u64 },

	#[error("Transaction {tx_hash} failed on chain: {reason}")]
	ChainExecution { tx_hash: String, reason: String },

	#[error(transparent)]
	Extract(#[from] ExtractError),

	#[error("Failed to decode {what}: {reason}")]
	Decode { what: String, reason: String },

	#[error("Operation {0} was cancelled")]
	Cancelled(String),

	#[error("Unexpected error: {0}")]
	Unexpected(String),
}

impl TxError {
	pub fn code(&self) -> TxErrorCode {
		match self {
			Self::Submission(_) => TxErrorCode::SubmissionFailure,
			Self::PollingTimeout { .. } | Self::StageTimeout { .. } => TxErrorCode::PollingTimeout,
			Self::ChainExecution { .. } => TxErrorCode::ChainExecutionFailure,
			Self::Extract(e) => e.code(),
			Self::Decode { .. } => TxErrorCode::ParseFailure,
			Self::Cancelled(_) => TxErrorCode::Cancelled,
			Self::Unexpected(_) => TxErrorCode::Unexpected,
		}
	}
}

/// Structured error carried by a terminal `Fail` rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFailure {
	pub code: TxErrorCode,
	/// Message suitable for direct display.
	pub message: String,
}

impl TxFailure {
	pub fn new(code: TxErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}
}

impl From<&TxError> for TxFailure {
	fn from(error: &TxError) -> Self {
		Self::new(error.code(), error.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codes_per_category() {
		assert_eq!(
			TxError::Submission("rejected".into()).code(),
			TxErrorCode::SubmissionFailure
		);
		assert_eq!(
			TxError::StageTimeout {
				stage: "post".into(),
				after_ms: 10
			}
			.code(),
			TxErrorCode::PollingTimeout
		);
		assert_eq!(
			TxError::Extract(ExtractError::NoRawLog).code(),
			TxErrorCode::MissingRawLog
		);
		assert_eq!(
			TxError::Extract(ExtractError::EventNotFound("transfer".into())).code(),
			TxErrorCode::MissingEvents
		);
		assert_eq!(
			TxError::Decode {
				what: "amount".into(),
				reason: "empty".into()
			}
			.code(),
			TxErrorCode::ParseFailure
		);
		assert_eq!(TxError::Cancelled("op-1".into()).code(), TxErrorCode::Cancelled);
	}

	#[test]
	fn test_failure_from_error() {
		let failure = TxFailure::from(&TxError::Submission("insufficient funds".into()));
		assert_eq!(failure.code, TxErrorCode::SubmissionFailure);
		assert!(failure.message.contains("insufficient funds"));
		assert_eq!(failure.code.as_str(), "submission failure");
	}
}
