//! `watch` command: polls the configured LCD for one transaction.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use txflow_config::TxflowConfig;
use txflow_delivery::implementations::LcdTxInfoSource;
use txflow_delivery::{ConfirmationPoller, PollError};
use txflow_types::{pick_event, Event, TxInfo};

fn format_event(event: &Event) -> String {
	let mut lines = vec![format!("  {}", event.event_type)];
	lines.extend(
		event
			.attributes
			.iter()
			.map(|attribute| format!("    {} = {}", attribute.key, attribute.value)),
	);
	lines.join("\n")
}

/// Renders the tx summary followed by its events, optionally restricted to
/// one event type.
pub fn summarize(tx_info: &TxInfo, event_type: Option<&str>) -> String {
	let mut out = vec![
		format!("tx       {}", tx_info.tx_hash),
		format!("height   {}", tx_info.height),
		format!("success  {}", tx_info.success),
		format!("gas      {}/{}", tx_info.gas_used, tx_info.gas_wanted),
	];
	if let Some(failure_log) = tx_info.failure_log.as_deref().filter(|log| !log.is_empty()) {
		out.push(format!("failure  {}", failure_log));
	}

	for (index, raw_log) in tx_info.raw_log.iter().flatten().enumerate() {
		out.push(format!("msg #{}", index));
		match event_type {
			Some(event_type) => match pick_event(raw_log, event_type) {
				Ok(event) => out.push(format_event(event)),
				Err(e) => out.push(format!("  {}", e)),
			},
			None => out.extend(raw_log.events.iter().map(format_event)),
		}
	}

	out.join("\n")
}

pub async fn run(config: &TxflowConfig, tx_hash: &str, event_type: Option<&str>) -> Result<()> {
	let source = LcdTxInfoSource::new(&config.network.lcd)
		.with_context(|| format!("Failed to create LCD client for {}", config.network.lcd))?;
	let poller = ConfirmationPoller::new(Arc::new(source), config.polling.to_poll_config());

	let token = CancellationToken::new();
	let ctrl_c = token.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("Interrupted, stopping");
			ctrl_c.cancel();
		}
	});

	info!("Waiting for {} on {}", tx_hash, config.network.chain_id);
	let tx_info = match poller.wait_for_inclusion(tx_hash, &token).await {
		Ok(tx_info) => tx_info,
		Err(PollError::Aborted) => bail!("Stopped before {} was included", tx_hash),
		Err(e) => return Err(e).context(format!("Transaction {} not found", tx_hash)),
	};

	println!("{}", summarize(&tx_info, event_type));
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use txflow_types::RawLog;

	fn tx_info() -> TxInfo {
		TxInfo {
			tx_hash: "AB12".into(),
			height: 42,
			success: true,
			raw_log: Some(vec![RawLog::new(vec![
				Event::new("message").with_attribute("action", "withdraw"),
				Event::new("transfer").with_attribute("amount", "20000000uluna"),
			])]),
			failure_log: None,
			gas_wanted: 400_000,
			gas_used: 300_000,
		}
	}

	#[test]
	fn test_summary_lists_all_events() {
		let summary = summarize(&tx_info(), None);
		assert!(summary.contains("height   42"));
		assert!(summary.contains("  message\n    action = withdraw"));
		assert!(summary.contains("    amount = 20000000uluna"));
	}

	#[test]
	fn test_summary_filters_events() {
		let summary = summarize(&tx_info(), Some("transfer"));
		assert!(!summary.contains("message"));
		assert!(summary.contains("  transfer"));

		let summary = summarize(&tx_info(), Some("wasm"));
		assert!(summary.contains("Undefined the wasm event"));
	}
}
