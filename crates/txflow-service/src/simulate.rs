//! `simulate` command: runs operation kinds against in-memory chains.

use crate::cli::Scenario;
use crate::kinds::OperationKinds;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use txflow_config::TxflowConfig;
use txflow_core::{Broadcasting, Operation, OperationBroadcaster, TxDeps};
use txflow_delivery::implementations::{InMemoryChain, ScriptedTx};
use txflow_delivery::ConfirmationPoller;
use txflow_types::{microfy, Event, OperationEvent, RawLog, TxResultRendering};
use uuid::Uuid;

/// Polls a never-included transaction this many times before cancelling it.
const POLLS_BEFORE_CANCEL: u32 = 3;

fn script(scenario: Scenario) -> ScriptedTx {
	match scenario {
		Scenario::Withdraw => ScriptedTx::included(Some(vec![RawLog::new(vec![
			Event::new("message").with_attribute("action", "execute_contract"),
			Event::new("transfer")
				.with_attribute("recipient", "terra1x46rqay4d3cssq8gxxvqz8xt6nwlz4td20k38v")
				.with_attribute("sender", "terra1kzx23xs8v9yggf6lqpwgerg455e8xzsv0s0glf")
				.with_attribute("amount", "20000000uluna"),
		])]))
		.after_polls(1),
		Scenario::Stake => ScriptedTx::included(Some(vec![RawLog::new(vec![Event::new(
			"from_contract",
		)
		.with_attribute("contract_address", "terra1f32xyep306hhcxxxf7mlyh0ucggc00rm2s9da5")
		.with_attribute("action", "staking")
		.with_attribute("amount", "1500000")])])),
		Scenario::MissingRawLog => ScriptedTx::included(None),
		Scenario::Rejected => ScriptedTx::rejected("account sequence mismatch"),
		Scenario::Reverted => ScriptedTx::reverted("execute wasm contract failed: insufficient funds"),
		Scenario::Cancelled => ScriptedTx::never_included(),
	}
}

fn describe(event: &OperationEvent) -> String {
	match event {
		OperationEvent::Started { kind } => format!("started {}", kind),
		OperationEvent::PhaseChanged { phase } => format!("phase {}", phase),
		OperationEvent::Succeeded { receipts } => {
			let receipts: Vec<_> = receipts
				.iter()
				.map(|receipt| format!("{}: {}", receipt.name, receipt.value))
				.collect();
			format!("succeeded [{}]", receipts.join(", "))
		}
		OperationEvent::Failed { failure } => {
			format!("failed ({}) {}", failure.code, failure.message)
		}
	}
}

/// Runs every scenario concurrently on its own chain and returns the final
/// registry snapshot.
pub async fn simulate(
	config: &TxflowConfig,
	scenarios: &[Scenario],
	registry: &OperationBroadcaster,
) -> Result<Arc<Vec<Broadcasting>>> {
	let poll_config = config.polling.to_poll_config();
	let mut handles: Vec<(String, JoinHandle<TxResultRendering>)> = Vec::new();

	for scenario in scenarios {
		let chain = Arc::new(InMemoryChain::new().with_tx(script(*scenario)));
		let deps = TxDeps::new(
			chain.clone(),
			ConfirmationPoller::new(chain, poll_config.clone()),
		)
		.with_gas_adjustment(config.fee.gas_adjustment)
		.with_post_timeout(config.operation.post_timeout());
		let kinds = OperationKinds::new(
			deps,
			config.fee.to_fee(),
			config.network.to_network_info(),
		);

		let options = match scenario {
			Scenario::Stake => kinds.governance_stake(microfy(Decimal::new(15, 1))),
			_ => kinds.withdraw(),
		};
		let operation = Operation::new(registry.clone(), options);

		let id = format!("{}-{}", scenario.name(), &Uuid::new_v4().simple().to_string()[..8]);
		debug!("Spawning {} as {}", operation.kind(), id);
		let handle = operation
			.spawn(id.clone())
			.with_context(|| format!("Failed to start {}", id))?;
		handles.push((id, handle));
	}

	let cancelled: Vec<String> = scenarios
		.iter()
		.zip(&handles)
		.filter(|(scenario, _)| **scenario == Scenario::Cancelled)
		.map(|(_, (id, _))| id.clone())
		.collect();
	if !cancelled.is_empty() {
		tokio::time::sleep(poll_config.interval * POLLS_BEFORE_CANCEL + poll_config.interval / 2)
			.await;
		for id in cancelled {
			info!("Cancelling {}", id);
			registry.cancel(&id);
		}
	}

	for (id, handle) in handles {
		let rendering = handle
			.await
			.with_context(|| format!("Operation {} did not complete", id))?;
		info!("{} finished in phase {}", id, rendering.phase());
	}

	Ok(registry.broadcasting())
}

pub async fn run(config: &TxflowConfig, scenarios: Vec<Scenario>, json: bool) -> Result<()> {
	let scenarios = if scenarios.is_empty() {
		Scenario::all()
	} else {
		scenarios
	};

	let registry = OperationBroadcaster::new();
	let printer = registry.subscribe(|id, event| println!("{:<24} {}", id, describe(event)));

	let mut notices = registry.events();
	let observer = tokio::spawn(async move {
		let mut count = 0usize;
		while let Ok(notice) = notices.recv().await {
			debug!(operation = %notice.id, "Observed {:?}", notice.event);
			count += 1;
		}
		count
	});

	let snapshot = simulate(config, &scenarios, &registry).await?;
	printer.unsubscribe();

	if json {
		println!(
			"{}",
			serde_json::to_string_pretty(&*snapshot).context("Failed to serialize registry")?
		);
	} else {
		println!();
		for entry in snapshot.iter() {
			println!(
				"{:<24} {:<8} {:?} ({}/{} stages)",
				entry.id,
				entry.rendering.phase().to_string(),
				entry.result.status,
				entry.result.completed_stages,
				entry.result.total_stages
			);
		}
	}

	drop(registry);
	let observed = tokio::time::timeout(Duration::from_secs(1), observer)
		.await
		.ok()
		.and_then(|joined| joined.ok())
		.unwrap_or_default();
	debug!("Event stream delivered {} notices", observed);

	Ok(())
}
