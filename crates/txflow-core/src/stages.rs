//! Standard transaction stages: build, submit, confirm.

use crate::helper::TxHelper;
use crate::pipeline::Stage;
use crate::utils::truncate_hash;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use txflow_delivery::{AbortSignal, ConfirmationPoller, PollError, TxPoster};
use txflow_types::{
	CreateTxOptions, TxError, TxResultRendering, TxStreamPhase, TxValue,
};

/// Wraps the caller's messages with the helper's fee.
pub struct CreateTxOptionsStage {
	msgs: Vec<serde_json::Value>,
	gas_adjustment: Decimal,
	helper: Arc<TxHelper>,
}

pub fn create_tx_options(
	msgs: Vec<serde_json::Value>,
	gas_adjustment: Decimal,
	helper: Arc<TxHelper>,
) -> CreateTxOptionsStage {
	CreateTxOptionsStage {
		msgs,
		gas_adjustment,
		helper,
	}
}

#[async_trait]
impl Stage<TxResultRendering> for CreateTxOptionsStage {
	fn name(&self) -> &str {
		"create_tx_options"
	}

	async fn execute(&self, input: TxResultRendering) -> Result<TxResultRendering, TxError> {
		if self.msgs.is_empty() {
			return Err(TxError::Unexpected("no messages to submit".into()));
		}

		let options = CreateTxOptions {
			msgs: self.msgs.clone(),
			fee: self.helper.fee().clone(),
			gas_adjustment: self.gas_adjustment,
		};
		Ok(input.advance(TxStreamPhase::Broadcast, TxValue::Options(options)))
	}
}

/// Submits the transaction built by the previous stage.
pub struct PostTxStage {
	poster: Arc<dyn TxPoster>,
	helper: Arc<TxHelper>,
}

pub fn post_tx(poster: Arc<dyn TxPoster>, helper: Arc<TxHelper>) -> PostTxStage {
	PostTxStage { poster, helper }
}

#[async_trait]
impl Stage<TxResultRendering> for PostTxStage {
	fn name(&self) -> &str {
		"post_tx"
	}

	async fn execute(&self, input: TxResultRendering) -> Result<TxResultRendering, TxError> {
		let Some(TxValue::Options(options)) = input.value() else {
			return Err(TxError::Unexpected("post_tx expects tx options".into()));
		};

		let tx_result = self
			.poster
			.post(options)
			.await
			.map_err(|e| TxError::Submission(e.to_string()))?;

		info!(
			network = %self.helper.network().name,
			"Transaction posted: {}",
			truncate_hash(&tx_result.tx_hash)
		);
		self.helper.save_tx_result(&tx_result);

		Ok(input.advance(TxStreamPhase::Polling, TxValue::Posted(tx_result)))
	}
}

/// Waits for the posted transaction to be included.
///
/// An included transaction that failed on chain becomes
/// [`TxError::ChainExecution`]; an exhausted budget becomes
/// [`TxError::PollingTimeout`]; an abort becomes [`TxError::Cancelled`].
pub struct PollTxInfoStage {
	poller: ConfirmationPoller,
	operation_id: String,
	abort: Arc<dyn AbortSignal>,
}

pub fn poll_tx_info(
	poller: ConfirmationPoller,
	operation_id: impl Into<String>,
	abort: Arc<dyn AbortSignal>,
) -> PollTxInfoStage {
	PollTxInfoStage {
		poller,
		operation_id: operation_id.into(),
		abort,
	}
}

#[async_trait]
impl Stage<TxResultRendering> for PollTxInfoStage {
	fn name(&self) -> &str {
		"poll_tx_info"
	}

	async fn execute(&self, input: TxResultRendering) -> Result<TxResultRendering, TxError> {
		let Some(TxValue::Posted(tx_result)) = input.value() else {
			return Err(TxError::Unexpected("poll_tx_info expects a posted tx".into()));
		};
		let tx_result = tx_result.clone();

		debug!(
			operation = %self.operation_id,
			"Polling for {}",
			truncate_hash(&tx_result.tx_hash)
		);

		let tx_info = self
			.poller
			.wait_for_inclusion(&tx_result.tx_hash, self.abort.as_ref())
			.await
			.map_err(|e| match e {
				PollError::Timeout { attempts, elapsed } => TxError::PollingTimeout {
					tx_hash: tx_result.tx_hash.clone(),
					attempts,
					elapsed_ms: elapsed.as_millis() as u64,
				},
				PollError::Aborted => TxError::Cancelled(self.operation_id.clone()),
			})?;

		if !tx_info.success {
			let reason = tx_info
				.failure_log
				.clone()
				.unwrap_or_else(|| "execution failed".to_string());
			warn!(
				operation = %self.operation_id,
				"Transaction {} failed on chain: {}",
				truncate_hash(&tx_info.tx_hash),
				reason
			);
			return Err(TxError::ChainExecution {
				tx_hash: tx_info.tx_hash,
				reason,
			});
		}

		Ok(input.advance(
			TxStreamPhase::Polling,
			TxValue::Included { tx_result, tx_info },
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio_util::sync::CancellationToken;
	use txflow_delivery::implementations::{InMemoryChain, ScriptedTx};
	use txflow_delivery::PollConfig;
	use txflow_types::{Coin, Fee, NetworkInfo, TxErrorCode};

	fn helper() -> Arc<TxHelper> {
		Arc::new(TxHelper::new(
			Fee {
				gas: 400_000,
				amount: Coin::new(250_000, "uusd"),
			},
			NetworkInfo {
				name: "testnet".into(),
				chain_id: "bombay-12".into(),
				lcd: "http://localhost:1317".into(),
			},
		))
	}

	fn poller(chain: Arc<InMemoryChain>, max_attempts: u32) -> ConfirmationPoller {
		ConfirmationPoller::new(
			chain,
			PollConfig {
				interval: Duration::from_millis(100),
				max_attempts,
				timeout: Duration::from_secs(30),
			},
		)
	}

	async fn posted(chain: Arc<InMemoryChain>, helper: Arc<TxHelper>) -> TxResultRendering {
		let options = create_tx_options(vec![serde_json::json!({ "stake": {} })], Decimal::ONE, helper.clone())
			.execute(TxResultRendering::new())
			.await
			.unwrap();
		post_tx(chain, helper).execute(options).await.unwrap()
	}

	#[tokio::test]
	async fn test_create_and_post() {
		let chain = Arc::new(InMemoryChain::new());
		let helper = helper();

		let rendering = posted(chain.clone(), helper.clone()).await;
		assert_eq!(rendering.phase(), TxStreamPhase::Polling);
		let tx_result = rendering.value().and_then(TxValue::tx_result).unwrap();
		assert_eq!(tx_result.fee, *helper.fee());
		assert_eq!(helper.tx_result().unwrap().tx_hash, tx_result.tx_hash);
		assert_eq!(chain.post_count(), 1);
	}

	#[tokio::test]
	async fn test_create_without_messages_fails() {
		let err = create_tx_options(vec![], Decimal::ONE, helper())
			.execute(TxResultRendering::new())
			.await
			.unwrap_err();
		assert_eq!(err.code(), TxErrorCode::Unexpected);
	}

	#[tokio::test]
	async fn test_post_rejection_is_submission_failure() {
		let chain = Arc::new(InMemoryChain::new().with_tx(ScriptedTx::rejected("insufficient fee")));
		let helper = helper();
		let options = create_tx_options(vec![serde_json::json!({})], Decimal::ONE, helper.clone())
			.execute(TxResultRendering::new())
			.await
			.unwrap();

		let err = post_tx(chain, helper.clone()).execute(options).await.unwrap_err();
		assert_eq!(err.code(), TxErrorCode::SubmissionFailure);
		assert!(helper.tx_hash_receipt().is_none());
	}

	#[tokio::test]
	async fn test_poll_included() {
		let chain = Arc::new(InMemoryChain::new());
		let helper = helper();
		let rendering = posted(chain.clone(), helper).await;

		let stage = poll_tx_info(poller(chain, 5), "op-1", Arc::new(CancellationToken::new()));
		let rendering = stage.execute(rendering).await.unwrap();
		assert!(rendering.value().and_then(TxValue::tx_info).unwrap().success);
	}

	#[tokio::test]
	async fn test_poll_chain_failure() {
		let chain = Arc::new(InMemoryChain::new().with_tx(ScriptedTx::reverted("out of gas")));
		let helper = helper();
		let rendering = posted(chain.clone(), helper).await;

		let stage = poll_tx_info(poller(chain, 5), "op-1", Arc::new(CancellationToken::new()));
		let err = stage.execute(rendering).await.unwrap_err();
		assert!(matches!(err, TxError::ChainExecution { ref reason, .. } if reason == "out of gas"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_poll_timeout() {
		let chain = Arc::new(InMemoryChain::new().with_tx(ScriptedTx::never_included()));
		let helper = helper();
		let rendering = posted(chain.clone(), helper).await;

		let stage = poll_tx_info(poller(chain, 3), "op-1", Arc::new(CancellationToken::new()));
		let err = stage.execute(rendering).await.unwrap_err();
		assert!(matches!(err, TxError::PollingTimeout { attempts: 3, .. }));
	}

	#[tokio::test]
	async fn test_poll_aborted() {
		let chain = Arc::new(InMemoryChain::new());
		let helper = helper();
		let rendering = posted(chain.clone(), helper).await;

		let token = CancellationToken::new();
		token.cancel();
		let stage = poll_tx_info(poller(chain, 3), "op-7", Arc::new(token));
		let err = stage.execute(rendering).await.unwrap_err();
		assert_eq!(err, TxError::Cancelled("op-7".into()));
	}
}
