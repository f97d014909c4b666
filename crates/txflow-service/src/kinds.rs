//! Operation kinds offered by the binary.

use rust_decimal::Decimal;
use std::sync::Arc;
use txflow_core::{
	pick_governance_stake_result, pick_withdraw_result, OperationContext, OperationOptions, TxDeps,
	TxHelper,
};
use txflow_types::{Fee, NetworkInfo, TxError};

/// Builds [`OperationOptions`] sharing one set of collaborators.
#[derive(Clone)]
pub struct OperationKinds {
	deps: TxDeps,
	fee: Fee,
	network: NetworkInfo,
}

impl OperationKinds {
	pub fn new(deps: TxDeps, fee: Fee, network: NetworkInfo) -> Self {
		Self { deps, fee, network }
	}

	fn helper(fee: &Fee, network: &NetworkInfo) -> Arc<TxHelper> {
		Arc::new(
			TxHelper::new(fee.clone(), network.clone()).with_error_reporter(Arc::new(
				|error: &TxError| format!("{} ({})", error, error.code()),
			)),
		)
	}

	pub fn withdraw(&self) -> OperationOptions {
		let kinds = self.clone();
		OperationOptions::new("withdraw", move |context: &OperationContext| {
			let helper = Self::helper(&kinds.fee, &kinds.network);
			kinds.deps.build(
				"withdraw",
				helper.clone(),
				vec![serde_json::json!({ "withdraw_unbonded": {} })],
				context.id(),
				context.abort_signal(),
				pick_withdraw_result(helper),
			)
		})
	}

	/// `amount` is in micro ANC.
	pub fn governance_stake(&self, amount: Decimal) -> OperationOptions {
		let kinds = self.clone();
		OperationOptions::new("gov-stake", move |context: &OperationContext| {
			let helper = Self::helper(&kinds.fee, &kinds.network);
			kinds.deps.build(
				"gov-stake",
				helper.clone(),
				vec![serde_json::json!({
					"send": {
						"amount": amount.to_string(),
						"msg": { "stake_voting_tokens": {} },
					}
				})],
				context.id(),
				context.abort_signal(),
				pick_governance_stake_result(helper),
			)
		})
	}
}
