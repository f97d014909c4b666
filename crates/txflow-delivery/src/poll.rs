//! Confirmation polling.

use crate::TxInfoSource;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use txflow_types::TxInfo;

/// Budget and pacing for confirmation polling.
#[derive(Debug, Clone)]
pub struct PollConfig {
	/// Wait between two attempts.
	pub interval: Duration,
	/// Maximum number of tx info queries.
	pub max_attempts: u32,
	/// Wall-clock budget for the whole poll.
	pub timeout: Duration,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(500),
			max_attempts: 60,
			timeout: Duration::from_secs(120),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
	#[error("Confirmation timed out after {attempts} attempts ({elapsed:?})")]
	Timeout { attempts: u32, elapsed: Duration },
	#[error("Polling aborted")]
	Aborted,
}

/// Cancellation signal consulted by the poller.
///
/// `is_aborted` is checked before every attempt; `token` is raced against
/// every wait and every in-flight query.
pub trait AbortSignal: Send + Sync {
	fn is_aborted(&self) -> bool;

	fn token(&self) -> CancellationToken;
}

impl AbortSignal for CancellationToken {
	fn is_aborted(&self) -> bool {
		self.is_cancelled()
	}

	fn token(&self) -> CancellationToken {
		self.clone()
	}
}

/// Polls a [`TxInfoSource`] until a transaction is included.
#[derive(Clone)]
pub struct ConfirmationPoller {
	source: Arc<dyn TxInfoSource>,
	config: PollConfig,
}

impl ConfirmationPoller {
	pub fn new(source: Arc<dyn TxInfoSource>, config: PollConfig) -> Self {
		Self { source, config }
	}

	pub fn config(&self) -> &PollConfig {
		&self.config
	}

	/// Waits until `tx_hash` is included and returns its record.
	///
	/// Query errors are treated as transient and count as an attempt. The
	/// wall-clock budget also bounds in-flight queries and waits.
	pub async fn wait_for_inclusion(
		&self,
		tx_hash: &str,
		abort: &dyn AbortSignal,
	) -> Result<TxInfo, PollError> {
		let start_time = Instant::now();
		let deadline = start_time + self.config.timeout;
		let token = abort.token();
		let mut attempts = 0;
		let timed_out = |attempts: u32| PollError::Timeout {
			attempts,
			elapsed: start_time.elapsed(),
		};

		loop {
			if abort.is_aborted() {
				debug!("Polling for tx {} aborted", tx_hash);
				return Err(PollError::Aborted);
			}

			if attempts >= self.config.max_attempts || Instant::now() >= deadline {
				return Err(timed_out(attempts));
			}

			attempts += 1;
			debug!("Attempt {} to get tx info for {}", attempts, tx_hash);

			let result = tokio::select! {
				_ = token.cancelled() => return Err(PollError::Aborted),
				_ = tokio::time::sleep_until(deadline) => {
					debug!("Tx info query for {} outlived the polling budget", tx_hash);
					return Err(timed_out(attempts));
				}
				result = self.source.tx_info(tx_hash) => result,
			};

			match result {
				Ok(Some(tx_info)) => {
					info!(
						"Transaction {} included at height {} after {} attempts in {}ms",
						tx_hash,
						tx_info.height,
						attempts,
						start_time.elapsed().as_millis()
					);
					return Ok(tx_info);
				}
				Ok(None) => {
					debug!("Transaction {} not yet included (attempt {})", tx_hash, attempts);
				}
				Err(e) => {
					debug!("Tx info query for {} failed (attempt {}): {}", tx_hash, attempts, e);
				}
			}

			tokio::select! {
				_ = token.cancelled() => return Err(PollError::Aborted),
				_ = tokio::time::sleep_until(deadline) => return Err(timed_out(attempts)),
				_ = tokio::time::sleep(self.config.interval) => {}
			}
		}
	}
}
