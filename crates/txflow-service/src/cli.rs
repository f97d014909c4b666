//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "txflow")]
#[command(about = "Transaction lifecycle runner", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file (TOML, JSON or YAML)
	#[arg(short, long, env = "TXFLOW_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long, env = "TXFLOW_LOG_LEVEL")]
	pub log_level: Option<String>,

	/// Emit logs as JSON lines
	#[arg(long)]
	pub json_logs: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Validate the configuration and print the effective settings
	Validate,

	/// Run operations against an in-memory chain and print their events
	Simulate {
		/// Scenarios to run; all of them when omitted
		#[arg(short, long, value_enum)]
		scenario: Vec<Scenario>,

		/// Print the final registry snapshot as JSON
		#[arg(long)]
		json: bool,
	},

	/// Wait for a transaction on the configured LCD and print its events
	Watch {
		/// Transaction hash
		tx_hash: String,

		/// Only print events of this type
		#[arg(short, long)]
		event: Option<String>,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
	/// Withdraw unbonded Luna
	Withdraw,
	/// Stake ANC in governance
	Stake,
	/// Included transaction without raw log
	MissingRawLog,
	/// Submission rejected by the node
	Rejected,
	/// Transaction reverted on chain
	Reverted,
	/// Never included, cancelled while polling
	Cancelled,
}

impl Scenario {
	pub fn all() -> Vec<Scenario> {
		Scenario::value_variants().to_vec()
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Withdraw => "withdraw",
			Self::Stake => "stake",
			Self::MissingRawLog => "missing-raw-log",
			Self::Rejected => "rejected",
			Self::Reverted => "reverted",
			Self::Cancelled => "cancelled",
		}
	}
}
