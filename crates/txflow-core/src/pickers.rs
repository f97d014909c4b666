//! Result pickers: the final stage of each operation kind.
//!
//! A picker reads the included transaction's raw log and turns it into
//! display receipts. Missing logs, events and attributes surface as
//! [`TxError::Extract`]; unparseable values as [`TxError::Decode`].

use crate::helper::TxHelper;
use crate::pipeline::{stage_sync, Stage};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use txflow_types::{
	pick_attribute_value, pick_attribute_value_by_key, pick_event, pick_raw_log, Coin, Receipt,
	TxError, TxInfo, TxResultRendering, TxValue,
};

const ANC_DENOM: &str = "uanc";

fn included(rendering: &TxResultRendering) -> Result<&TxInfo, TxError> {
	rendering
		.value()
		.and_then(TxValue::tx_info)
		.ok_or_else(|| TxError::Unexpected("picker expects an included tx".into()))
}

/// `transfer` event, attribute 2 (`amount`), e.g. `20000000uluna`.
///
/// Produces `Unbonded Amount`, then the tx hash and tx fee receipts. An
/// empty amount skips the amount receipt.
pub fn pick_withdraw_result(helper: Arc<TxHelper>) -> impl Stage<TxResultRendering> {
	stage_sync(
		"pick_withdraw_result",
		move |rendering: TxResultRendering| {
			let unbonded = {
				let raw_log = pick_raw_log(included(&rendering)?, 0)?;
				let transfer = pick_event(raw_log, "transfer")?;
				let amount = pick_attribute_value(transfer, 2)?;

				if amount.is_empty() {
					None
				} else {
					let coin = Coin::from_str(amount).map_err(|e| TxError::Decode {
						what: "unbonded amount".into(),
						reason: e.to_string(),
					})?;
					Some(Receipt::new("Unbonded Amount", coin.format_demicrofied()))
				}
			};

			Ok(rendering.succeed([unbonded, helper.tx_hash_receipt(), helper.tx_fee_receipt()]))
		},
	)
}

/// `from_contract` event, attribute `amount` in micro ANC.
pub fn pick_governance_stake_result(helper: Arc<TxHelper>) -> impl Stage<TxResultRendering> {
	stage_sync(
		"pick_governance_stake_result",
		move |rendering: TxResultRendering| {
			let staked = {
				let raw_log = pick_raw_log(included(&rendering)?, 0)?;
				let from_contract = pick_event(raw_log, "from_contract")?;
				let amount = pick_attribute_value_by_key(from_contract, "amount")?;

				if amount.is_empty() {
					None
				} else {
					let amount = Decimal::from_str(amount).map_err(|e| TxError::Decode {
						what: "staked amount".into(),
						reason: e.to_string(),
					})?;
					Some(Receipt::new(
						"Amount",
						Coin::new(amount, ANC_DENOM).format_demicrofied(),
					))
				}
			};

			Ok(rendering.succeed([staked, helper.tx_hash_receipt(), helper.tx_fee_receipt()]))
		},
	)
}
