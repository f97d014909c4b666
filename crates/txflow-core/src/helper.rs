//! Shared factory for receipts and failure renderings.
//!
//! Every transaction pipeline binds one [`TxHelper`] at construction time.
//! It carries the fee, the target network and an optional error reporter,
//! and remembers the posted [`TxResult`] so later stages and the failure
//! boundary can emit the hash and fee receipts.

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use txflow_types::{
	pick_tx_fee, ExtractError, Fee, NetworkInfo, Receipt, TxError, TxErrorCode, TxFailure,
	TxResult, TxResultRendering,
};

/// Formats a stage failure for display. Never consulted for classification.
pub type ErrorReporter = Arc<dyn Fn(&TxError) -> String + Send + Sync>;

pub struct TxHelper {
	fee: Fee,
	network: NetworkInfo,
	error_reporter: Option<ErrorReporter>,
	tx_result: ArcSwapOption<TxResult>,
}

impl fmt::Debug for TxHelper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TxHelper")
			.field("fee", &self.fee)
			.field("network", &self.network.name)
			.field("tx_result", &self.tx_result.load_full())
			.finish()
	}
}

impl TxHelper {
	pub fn new(fee: Fee, network: NetworkInfo) -> Self {
		Self {
			fee,
			network,
			error_reporter: None,
			tx_result: ArcSwapOption::empty(),
		}
	}

	pub fn with_error_reporter(mut self, reporter: ErrorReporter) -> Self {
		self.error_reporter = Some(reporter);
		self
	}

	pub fn fee(&self) -> &Fee {
		&self.fee
	}

	pub fn network(&self) -> &NetworkInfo {
		&self.network
	}

	/// Records the result of a successful submission.
	pub fn save_tx_result(&self, tx_result: &TxResult) {
		debug!(network = %self.network.name, "Saving tx result {}", tx_result.tx_hash);
		self.tx_result.store(Some(Arc::new(tx_result.clone())));
	}

	pub fn tx_result(&self) -> Option<Arc<TxResult>> {
		self.tx_result.load_full()
	}

	/// `None` until a submission succeeded.
	pub fn tx_hash_receipt(&self) -> Option<Receipt> {
		self.tx_result
			.load_full()
			.map(|tx_result| Receipt::new("Tx Hash", tx_result.tx_hash.clone()))
	}

	/// Fee of the posted transaction, falling back to the configured fee
	/// before submission. `None` for a zero fee.
	pub fn tx_fee_receipt(&self) -> Option<Receipt> {
		let posted = self.tx_result.load_full();
		let fee = match posted.as_deref() {
			Some(tx_result) => pick_tx_fee(tx_result),
			None => &self.fee.amount,
		};

		(!fee.amount.is_zero()).then(|| Receipt::new("Tx Fee", fee.format_demicrofied()))
	}

	pub fn failed_to_find_raw_log(&self) -> TxResultRendering {
		self.fail_with(TxFailure::new(
			TxErrorCode::MissingRawLog,
			"Failed to find raw log",
		))
	}

	pub fn failed_to_find_events(&self, event_type: &str) -> TxResultRendering {
		self.fail_with(TxFailure::new(
			TxErrorCode::MissingEvents,
			format!("Failed to find {} events", event_type),
		))
	}

	pub fn failed_to_parse_tx_result(&self) -> TxResultRendering {
		self.fail_with(TxFailure::new(
			TxErrorCode::ParseFailure,
			"Failed to parse tx result",
		))
	}

	/// Converts a stage failure into a terminal `Fail` rendering.
	///
	/// Missing raw logs and events use the dedicated factories above; every
	/// other error keeps its own code with a message from the error reporter
	/// when one is installed.
	pub fn catch_tx_error(&self, error: &TxError) -> TxResultRendering {
		match error {
			TxError::Extract(ExtractError::NoRawLog)
			| TxError::Extract(ExtractError::RawLogIndexOutOfRange { .. }) => self.failed_to_find_raw_log(),
			TxError::Extract(ExtractError::EventNotFound(event_type)) => {
				self.failed_to_find_events(event_type)
			}
			_ => {
				let message = match &self.error_reporter {
					Some(reporter) => reporter(error),
					None => error.to_string(),
				};
				self.fail_with(TxFailure::new(error.code(), message))
			}
		}
	}

	fn fail_with(&self, failure: TxFailure) -> TxResultRendering {
		TxResultRendering::failure(failure, [self.tx_hash_receipt(), self.tx_fee_receipt()])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use txflow_types::{Coin, TxStreamPhase};

	fn helper() -> TxHelper {
		TxHelper::new(
			Fee {
				gas: 400_000,
				amount: Coin::new(250_000, "uusd"),
			},
			NetworkInfo {
				name: "testnet".into(),
				chain_id: "bombay-12".into(),
				lcd: "http://localhost:1317".into(),
			},
		)
	}

	fn posted(helper: &TxHelper) {
		helper.save_tx_result(&TxResult {
			tx_hash: "ABC123".into(),
			fee: Fee {
				gas: 400_000,
				amount: Coin::new(150_000, "uusd"),
			},
		});
	}

	#[test]
	fn test_hash_receipt_requires_submission() {
		let helper = helper();
		assert!(helper.tx_hash_receipt().is_none());

		posted(&helper);
		assert_eq!(helper.tx_hash_receipt(), Some(Receipt::new("Tx Hash", "ABC123")));
	}

	#[test]
	fn test_fee_receipt_prefers_posted_fee() {
		let helper = helper();
		assert_eq!(helper.tx_fee_receipt(), Some(Receipt::new("Tx Fee", "0.25 UST")));

		posted(&helper);
		assert_eq!(helper.tx_fee_receipt(), Some(Receipt::new("Tx Fee", "0.15 UST")));
	}

	#[test]
	fn test_failure_factories_use_stable_codes() {
		let helper = helper();
		let cases = [
			(helper.failed_to_find_raw_log(), TxErrorCode::MissingRawLog),
			(helper.failed_to_find_events("transfer"), TxErrorCode::MissingEvents),
			(helper.failed_to_parse_tx_result(), TxErrorCode::ParseFailure),
		];

		for (rendering, code) in cases {
			assert_eq!(rendering.phase(), TxStreamPhase::Fail);
			assert_eq!(rendering.error().map(|e| e.code), Some(code));
		}

		assert_eq!(
			helper.failed_to_find_events("transfer").error().unwrap().message,
			"Failed to find transfer events"
		);
	}

	#[test]
	fn test_catch_maps_extraction_failures() {
		let helper = helper();
		posted(&helper);

		let rendering = helper.catch_tx_error(&TxError::Extract(ExtractError::NoRawLog));
		assert_eq!(rendering, helper.failed_to_find_raw_log());
		assert_eq!(rendering.receipts()[0], Receipt::new("Tx Hash", "ABC123"));

		let rendering =
			helper.catch_tx_error(&TxError::Extract(ExtractError::EventNotFound("from_contract".into())));
		assert_eq!(rendering.error().unwrap().code, TxErrorCode::MissingEvents);
	}

	#[test]
	fn test_error_reporter_only_changes_message() {
		let helper = helper().with_error_reporter(Arc::new(|error: &TxError| {
			format!("Something went wrong ({})", error.code())
		}));

		let rendering = helper.catch_tx_error(&TxError::Submission("insufficient funds".into()));
		let failure = rendering.error().unwrap();
		assert_eq!(failure.code, TxErrorCode::SubmissionFailure);
		assert_eq!(failure.message, "Something went wrong (submission failure)");
	}
}
