use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use txflow_config::{ConfigLoader, TxflowConfig};

mod cli;
mod kinds;
mod logging;
mod simulate;
mod watch;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config(&args).await?;

	// CLI flags win over the configuration file
	let level = args
		.log_level
		.clone()
		.unwrap_or_else(|| config.logging.level.clone());
	logging::setup_tracing(&level, args.json_logs || config.logging.json)?;

	match args.command {
		Command::Validate => validate(&config),
		Command::Simulate { scenario, json } => simulate::run(&config, scenario, json).await,
		Command::Watch { tx_hash, event } => watch::run(&config, &tx_hash, event.as_deref()).await,
	}
}

async fn load_config(args: &Args) -> Result<TxflowConfig> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &args.config {
		loader = loader.with_file(path);
	}

	loader.load().await.context("Failed to load configuration")
}

fn validate(config: &TxflowConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Network: {} ({})", config.network.name, config.network.chain_id);
	info!("LCD: {}", config.network.lcd);
	info!(
		"Fee: {} gas, {} (adjustment {})",
		config.fee.gas, config.fee.amount, config.fee.gas_adjustment
	);
	info!(
		"Polling: every {}ms, at most {} attempts within {}s",
		config.polling.interval_ms, config.polling.max_attempts, config.polling.timeout_secs
	);
	info!("Submission timeout: {}s", config.operation.post_timeout_secs);

	Ok(())
}
