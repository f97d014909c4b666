//! The value threaded through a transaction pipeline.

use crate::errors::TxFailure;
use crate::phase::TxStreamPhase;
use crate::tx::TxValue;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Display-ready name/value pair summarizing part of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
	pub name: String,
	pub value: String,
}

impl Receipt {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

/// Current state of one transaction stream.
///
/// The phase only moves forward. Once it is terminal the rendering is
/// frozen: further transitions, receipts and errors are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxResultRendering {
	phase: TxStreamPhase,
	value: Option<TxValue>,
	receipts: Vec<Receipt>,
	error: Option<TxFailure>,
}

impl Default for TxResultRendering {
	fn default() -> Self {
		Self::new()
	}
}

impl TxResultRendering {
	pub fn new() -> Self {
		Self {
			phase: TxStreamPhase::Broadcast,
			value: None,
			receipts: Vec::new(),
			error: None,
		}
	}

	/// A terminal failure rendering.
	pub fn failure(failure: TxFailure, receipts: impl IntoIterator<Item = Option<Receipt>>) -> Self {
		Self {
			phase: TxStreamPhase::Fail,
			value: None,
			receipts: receipts.into_iter().flatten().collect(),
			error: Some(failure),
		}
	}

	pub fn phase(&self) -> TxStreamPhase {
		self.phase
	}

	pub fn value(&self) -> Option<&TxValue> {
		self.value.as_ref()
	}

	pub fn receipts(&self) -> &[Receipt] {
		&self.receipts
	}

	pub fn error(&self) -> Option<&TxFailure> {
		self.error.as_ref()
	}

	pub fn is_terminal(&self) -> bool {
		self.phase.is_terminal()
	}

	/// Moves to a non-terminal `phase` carrying `value`.
	pub fn advance(mut self, phase: TxStreamPhase, value: TxValue) -> Self {
		if self.is_terminal() || phase.is_terminal() {
			warn!("Ignoring advance to {} from {}", phase, self.phase);
			return self;
		}
		if phase != self.phase && !self.phase.can_transition_to(phase) {
			warn!("Ignoring backward transition {} -> {}", self.phase, phase);
			return self;
		}

		self.phase = phase;
		self.value = Some(value);
		self
	}

	pub fn with_receipt(mut self, receipt: Option<Receipt>) -> Self {
		if self.is_terminal() {
			warn!("Ignoring receipt on terminal rendering");
			return self;
		}

		self.receipts.extend(receipt);
		self
	}

	/// Terminal success with the given receipts appended. `None` entries are
	/// skipped.
	pub fn succeed(mut self, receipts: impl IntoIterator<Item = Option<Receipt>>) -> Self {
		if self.is_terminal() {
			warn!("Ignoring success on terminal rendering ({})", self.phase);
			return self;
		}

		self.phase = TxStreamPhase::Succeed;
		self.value = None;
		self.receipts.extend(receipts.into_iter().flatten());
		self
	}

	/// Terminal failure keeping the receipts gathered so far.
	pub fn fail(mut self, failure: TxFailure) -> Self {
		if self.is_terminal() {
			warn!("Ignoring failure on terminal rendering ({})", self.phase);
			return self;
		}

		self.phase = TxStreamPhase::Fail;
		self.value = None;
		self.error = Some(failure);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::coin::Coin;
	use crate::errors::TxErrorCode;
	use crate::tx::{Fee, TxResult};

	fn posted() -> TxValue {
		TxValue::Posted(TxResult {
			tx_hash: "HASH".into(),
			fee: Fee {
				gas: 100,
				amount: Coin::new(1, "uusd"),
			},
		})
	}

	#[test]
	fn test_forward_progress() {
		let rendering = TxResultRendering::new()
			.advance(TxStreamPhase::Polling, posted())
			.with_receipt(Some(Receipt::new("Tx Hash", "HASH")))
			.succeed([Some(Receipt::new("Amount", "1 ANC")), None]);

		assert_eq!(rendering.phase(), TxStreamPhase::Succeed);
		assert!(rendering.value().is_none());
		assert_eq!(rendering.receipts().len(), 2);
	}

	#[test]
	fn test_backward_transition_ignored() {
		let rendering = TxResultRendering::new()
			.advance(TxStreamPhase::Polling, posted())
			.advance(TxStreamPhase::Broadcast, posted());

		assert_eq!(rendering.phase(), TxStreamPhase::Polling);
	}

	#[test]
	fn test_terminal_is_frozen() {
		let failure = TxFailure::new(TxErrorCode::MissingRawLog, "Failed to find raw log");
		let rendering = TxResultRendering::new()
			.fail(failure.clone())
			.with_receipt(Some(Receipt::new("Late", "receipt")))
			.succeed([Some(Receipt::new("Amount", "1"))])
			.fail(TxFailure::new(TxErrorCode::Unexpected, "other"));

		assert_eq!(rendering.phase(), TxStreamPhase::Fail);
		assert!(rendering.receipts().is_empty());
		assert_eq!(rendering.error(), Some(&failure));
	}
}
