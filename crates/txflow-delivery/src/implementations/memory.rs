//! In-process chain with scripted transaction outcomes.
//!
//! Each call to [`TxPoster::post`] consumes the next [`ScriptedTx`]; when the
//! script is exhausted transactions are included immediately with an empty
//! raw log.

use crate::{DeliveryError, TxInfoSource, TxPoster};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use txflow_types::{CreateTxOptions, RawLog, TxInfo, TxResult};

/// Scripted outcome for one posted transaction.
#[derive(Debug, Clone)]
pub enum ScriptedTx {
	/// Submission fails with the given reason.
	Rejected(String),
	/// Transaction is included after `pending_polls` unanswered queries.
	Included {
		pending_polls: u32,
		success: bool,
		raw_log: Option<Vec<RawLog>>,
		failure_log: Option<String>,
	},
	/// Transaction is accepted but never shows up on chain.
	NeverIncluded,
}

impl ScriptedTx {
	pub fn included(raw_log: Option<Vec<RawLog>>) -> Self {
		Self::Included {
			pending_polls: 0,
			success: true,
			raw_log,
			failure_log: None,
		}
	}

	pub fn reverted(failure_log: impl Into<String>) -> Self {
		Self::Included {
			pending_polls: 0,
			success: false,
			raw_log: None,
			failure_log: Some(failure_log.into()),
		}
	}

	pub fn rejected(reason: impl Into<String>) -> Self {
		Self::Rejected(reason.into())
	}

	pub fn never_included() -> Self {
		Self::NeverIncluded
	}

	/// Delays inclusion by `polls` queries. No effect on other variants.
	pub fn after_polls(mut self, polls: u32) -> Self {
		if let Self::Included { pending_polls, .. } = &mut self {
			*pending_polls = polls;
		}
		self
	}
}

struct PendingTx {
	remaining_polls: u32,
	info: Option<TxInfo>,
}

#[derive(Default)]
struct ChainState {
	script: VecDeque<ScriptedTx>,
	txs: HashMap<String, PendingTx>,
	height: u64,
}

/// Scriptable chain implementing [`TxPoster`] and [`TxInfoSource`].
#[derive(Default)]
pub struct InMemoryChain {
	state: Mutex<ChainState>,
	post_count: AtomicU32,
	query_count: AtomicU32,
}

impl InMemoryChain {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_tx(mut self, tx: ScriptedTx) -> Self {
		self.state.get_mut().script.push_back(tx);
		self
	}

	pub async fn push_tx(&self, tx: ScriptedTx) {
		self.state.lock().await.script.push_back(tx);
	}

	pub fn post_count(&self) -> u32 {
		self.post_count.load(Ordering::SeqCst)
	}

	pub fn query_count(&self) -> u32 {
		self.query_count.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl TxPoster for InMemoryChain {
	async fn post(&self, options: &CreateTxOptions) -> Result<TxResult, DeliveryError> {
		let nonce = self.post_count.fetch_add(1, Ordering::SeqCst) + 1;
		let mut state = self.state.lock().await;
		let scripted = state
			.script
			.pop_front()
			.unwrap_or_else(|| ScriptedTx::included(Some(vec![])));

		if let ScriptedTx::Rejected(reason) = scripted {
			debug!("Rejecting transaction #{}: {}", nonce, reason);
			return Err(DeliveryError::Rejected(reason));
		}

		let tx_hash = format!("{:064X}", nonce);
		state.height += 1;
		let height = state.height;

		let pending = match scripted {
			ScriptedTx::Included {
				pending_polls,
				success,
				raw_log,
				failure_log,
			} => PendingTx {
				remaining_polls: pending_polls,
				info: Some(TxInfo {
					tx_hash: tx_hash.clone(),
					height,
					success,
					raw_log,
					failure_log,
					gas_wanted: options.fee.gas,
					gas_used: options.fee.gas / 4 * 3,
				}),
			},
			_ => PendingTx {
				remaining_polls: 0,
				info: None,
			},
		};
		state.txs.insert(tx_hash.clone(), pending);
		debug!("Accepted transaction {}", tx_hash);

		Ok(TxResult {
			tx_hash,
			fee: options.fee.clone(),
		})
	}
}

#[async_trait]
impl TxInfoSource for InMemoryChain {
	async fn tx_info(&self, tx_hash: &str) -> Result<Option<TxInfo>, DeliveryError> {
		self.query_count.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().await;

		let Some(pending) = state.txs.get_mut(tx_hash) else {
			return Ok(None);
		};

		if pending.remaining_polls > 0 {
			pending.remaining_polls -= 1;
			return Ok(None);
		}

		Ok(pending.info.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use txflow_types::{Coin, Fee};

	fn options() -> CreateTxOptions {
		CreateTxOptions {
			msgs: vec![serde_json::json!({ "withdraw_unbonded": {} })],
			fee: Fee {
				gas: 400_000,
				amount: Coin::new(150_000, "uusd"),
			},
			gas_adjustment: 1.into(),
		}
	}

	#[tokio::test]
	async fn test_scripted_outcomes_in_order() {
		let chain = InMemoryChain::new()
			.with_tx(ScriptedTx::rejected("out of gas"))
			.with_tx(ScriptedTx::reverted("execute wasm contract failed"));

		let err = chain.post(&options()).await.unwrap_err();
		assert!(matches!(err, DeliveryError::Rejected(reason) if reason == "out of gas"));

		let posted = chain.post(&options()).await.unwrap();
		let info = chain.tx_info(&posted.tx_hash).await.unwrap().unwrap();
		assert!(!info.success);
		assert_eq!(info.failure_log.as_deref(), Some("execute wasm contract failed"));
		assert_eq!(chain.post_count(), 2);
	}

	#[tokio::test]
	async fn test_unknown_hash_is_pending() {
		let chain = InMemoryChain::new();
		assert!(chain.tx_info("UNKNOWN").await.unwrap().is_none());
		assert_eq!(chain.query_count(), 1);
	}

	#[tokio::test]
	async fn test_default_outcome_included() {
		let chain = InMemoryChain::new();
		let posted = chain.post(&options()).await.unwrap();
		let info = chain.tx_info(&posted.tx_hash).await.unwrap().unwrap();

		assert!(info.success);
		assert_eq!(info.raw_log, Some(vec![]));
		assert_eq!(info.gas_wanted, 400_000);
		assert_eq!(posted.fee, options().fee);
	}

	#[tokio::test]
	async fn test_gas_used_near_u64_max() {
		let chain = InMemoryChain::new();
		let mut options = options();
		options.fee.gas = u64::MAX;

		let posted = chain.post(&options).await.unwrap();
		let info = chain.tx_info(&posted.tx_hash).await.unwrap().unwrap();

		assert_eq!(info.gas_wanted, u64::MAX);
		assert_eq!(info.gas_used, u64::MAX / 4 * 3);
	}
}
