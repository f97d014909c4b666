//! Configuration types.

use crate::serde_helpers::{deserialize_coin, serialize_coin};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use txflow_delivery::PollConfig;
use txflow_types::{Coin, Fee, NetworkInfo};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxflowConfig {
	#[serde(default)]
	pub network: NetworkConfig,
	#[serde(default)]
	pub fee: FeeConfig,
	#[serde(default)]
	pub polling: PollingConfig,
	#[serde(default)]
	pub operation: OperationConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub name: String,
	pub chain_id: String,
	/// LCD endpoint used for tx info queries.
	pub lcd: String,
}

impl Default for NetworkConfig {
	fn default() -> Self {
		Self {
			name: "mainnet".to_string(),
			chain_id: "columbus-5".to_string(),
			lcd: "https://lcd.terra.dev".to_string(),
		}
	}
}

impl NetworkConfig {
	pub fn to_network_info(&self) -> NetworkInfo {
		NetworkInfo {
			name: self.name.clone(),
			chain_id: self.chain_id.clone(),
			lcd: self.lcd.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
	/// Gas limit attached to every transaction.
	pub gas: u64,
	#[serde(deserialize_with = "deserialize_coin", serialize_with = "serialize_coin")]
	pub amount: Coin,
	pub gas_adjustment: Decimal,
}

impl Default for FeeConfig {
	fn default() -> Self {
		Self {
			gas: 1_000_000,
			amount: Coin::new(250_000, "uusd"),
			gas_adjustment: Decimal::new(16, 1),
		}
	}
}

impl FeeConfig {
	pub fn to_fee(&self) -> Fee {
		Fee {
			gas: self.gas,
			amount: self.amount.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
	#[serde(default = "default_interval_ms")]
	pub interval_ms: u64,
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

fn default_interval_ms() -> u64 {
	500
}

fn default_max_attempts() -> u32 {
	60
}

fn default_timeout_secs() -> u64 {
	120
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			interval_ms: default_interval_ms(),
			max_attempts: default_max_attempts(),
			timeout_secs: default_timeout_secs(),
		}
	}
}

impl PollingConfig {
	pub fn to_poll_config(&self) -> PollConfig {
		PollConfig {
			interval: Duration::from_millis(self.interval_ms),
			max_attempts: self.max_attempts,
			timeout: Duration::from_secs(self.timeout_secs),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationConfig {
	/// Budget for the submission stage.
	#[serde(default = "default_post_timeout_secs")]
	pub post_timeout_secs: u64,
}

fn default_post_timeout_secs() -> u64 {
	120
}

impl Default for OperationConfig {
	fn default() -> Self {
		Self {
			post_timeout_secs: default_post_timeout_secs(),
		}
	}
}

impl OperationConfig {
	pub fn post_timeout(&self) -> Duration {
		Duration::from_secs(self.post_timeout_secs)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
	#[serde(default = "default_log_level")]
	pub level: String,
	/// Emit JSON lines instead of human-readable output.
	#[serde(default)]
	pub json: bool,
}

fn default_log_level() -> String {
	"info".to_string()
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: default_log_level(),
			json: false,
		}
	}
}
