//! Transaction envelope types exchanged with wallet and chain collaborators.

use crate::coin::Coin;
use crate::raw_log::RawLog;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Network the transactions are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
	pub name: String,
	pub chain_id: String,
	/// LCD endpoint used for tx info queries.
	pub lcd: String,
}

/// Fee attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
	pub gas: u64,
	pub amount: Coin,
}

/// Unsigned transaction handed to the wallet for signing and submission.
///
/// Messages are opaque to this crate; they are built by fabricators
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTxOptions {
	pub msgs: Vec<serde_json::Value>,
	pub fee: Fee,
	pub gas_adjustment: Decimal,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
	pub tx_hash: String,
	pub fee: Fee,
}

/// Transaction record returned once the transaction is included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
	pub tx_hash: String,
	pub height: u64,
	/// Whether execution succeeded on chain.
	pub success: bool,
	/// Per-message raw logs; `None` when the chain returned none.
	pub raw_log: Option<Vec<RawLog>>,
	/// Failure description reported by the chain for failed executions.
	pub failure_log: Option<String>,
	pub gas_wanted: u64,
	pub gas_used: u64,
}

/// Opaque value produced by the most recent pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TxValue {
	Options(CreateTxOptions),
	Posted(TxResult),
	Included { tx_result: TxResult, tx_info: TxInfo },
}

impl TxValue {
	pub fn tx_result(&self) -> Option<&TxResult> {
		match self {
			Self::Options(_) => None,
			Self::Posted(tx_result) | Self::Included { tx_result, .. } => Some(tx_result),
		}
	}

	pub fn tx_info(&self) -> Option<&TxInfo> {
		match self {
			Self::Included { tx_info, .. } => Some(tx_info),
			_ => None,
		}
	}
}

/// Fee paid by a posted transaction.
pub fn pick_tx_fee(tx_result: &TxResult) -> &Coin {
	&tx_result.fee.amount
}
