//! Transaction delivery boundaries.
//!
//! This crate defines the two collaborator interfaces a transaction pipeline
//! talks to: a poster that submits a transaction and returns its hash, and a
//! tx info source that reports whether a hash has been included yet. It also
//! provides the confirmation poller that repeatedly queries the tx info
//! source under a cancellation signal and an attempt/time budget.

use async_trait::async_trait;
use thiserror::Error;
use txflow_types::{CreateTxOptions, TxInfo, TxResult};

pub mod implementations;
pub mod poll;

pub use poll::{AbortSignal, ConfirmationPoller, PollConfig, PollError};

/// Errors reported by delivery collaborators.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Request never reached the network or the connection failed.
	#[error("Network error: {0}")]
	Network(String),
	/// Wallet or node refused the transaction.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// The node answered with something that could not be understood.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// Submits transactions on behalf of the connected wallet.
#[async_trait]
pub trait TxPoster: Send + Sync {
	/// Signs and broadcasts the transaction, returning its network hash.
	async fn post(&self, options: &CreateTxOptions) -> Result<TxResult, DeliveryError>;
}

/// Reports the on-chain record of a transaction.
#[async_trait]
pub trait TxInfoSource: Send + Sync {
	/// Returns `None` while the transaction is not yet included.
	async fn tx_info(&self, tx_hash: &str) -> Result<Option<TxInfo>, DeliveryError>;
}
