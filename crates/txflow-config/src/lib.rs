// txflow-config/src/lib.rs

use regex::Regex;
use rust_decimal::Decimal;
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub mod serde_helpers;
pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Source format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				path.display()
			))),
		}
	}
}

/// Configuration loader with environment variable substitution.
///
/// Without a file the defaults are used. `${VAR}` references in the file
/// are substituted before parsing, then `<prefix>*` variables override
/// individual settings, then the result is validated.
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "TXFLOW_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<TxflowConfig, ConfigError> {
		let mut config = match &self.file_path {
			Some(file_path) => self.load_from_file(file_path).await?,
			None => {
				debug!("No configuration file given, using defaults");
				TxflowConfig::default()
			}
		};

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<TxflowConfig, ConfigError> {
		let path = Path::new(file_path);
		if !path.exists() {
			return Err(ConfigError::FileNotFound(file_path.to_string()));
		}
		info!("Loading configuration from {}", file_path);

		let format = ConfigFormat::from_path(path)?;
		let content = tokio::fs::read_to_string(path).await?;
		let substituted = substitute_env_vars(&content)?;

		parse_config(&substituted, format)
	}

	fn apply_env_overrides(&self, config: &mut TxflowConfig) -> Result<(), ConfigError> {
		let var = |name: &str| env::var(format!("{}{}", self.env_prefix, name)).ok();

		if let Some(lcd) = var("LCD") {
			debug!("Overriding LCD endpoint from environment");
			config.network.lcd = lcd;
		}

		if let Some(chain_id) = var("CHAIN_ID") {
			config.network.chain_id = chain_id;
		}

		if let Some(log_level) = var("LOG_LEVEL") {
			config.logging.level = log_level;
		}

		if let Some(interval) = var("POLL_INTERVAL_MS") {
			config.polling.interval_ms = interval.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll interval: {}", e))
			})?;
		}

		if let Some(max_attempts) = var("POLL_MAX_ATTEMPTS") {
			config.polling.max_attempts = max_attempts.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll attempt limit: {}", e))
			})?;
		}

		if let Some(gas_adjustment) = var("GAS_ADJUSTMENT") {
			config.fee.gas_adjustment = Decimal::from_str(&gas_adjustment).map_err(|e| {
				ConfigError::ValidationError(format!("Invalid gas adjustment: {}", e))
			})?;
		}

		Ok(())
	}
}

/// Parses configuration text without substitution or validation.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<TxflowConfig, ConfigError> {
	match format {
		ConfigFormat::Toml => {
			toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Json => {
			serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Yaml => {
			serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
	}
}

/// Replaces every `${VAR_NAME}` with the value of the environment variable.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

pub fn validate_config(config: &TxflowConfig) -> Result<(), ConfigError> {
	let fail = |message: &str| Err(ConfigError::ValidationError(message.to_string()));

	if config.network.chain_id.is_empty() {
		return fail("network.chain_id must not be empty");
	}
	if !(config.network.lcd.starts_with("http://") || config.network.lcd.starts_with("https://")) {
		return fail("network.lcd must be an http(s) URL");
	}

	if config.fee.gas == 0 {
		return fail("fee.gas must be greater than zero");
	}
	if config.fee.gas_adjustment < Decimal::ONE {
		return fail("fee.gas_adjustment must be at least 1");
	}

	if config.polling.interval_ms == 0 {
		return fail("polling.interval_ms must be greater than zero");
	}
	if config.polling.max_attempts == 0 {
		return fail("polling.max_attempts must be greater than zero");
	}
	if config.polling.timeout_secs == 0 {
		return fail("polling.timeout_secs must be greater than zero");
	}
	if config.operation.post_timeout_secs == 0 {
		return fail("operation.post_timeout_secs must be greater than zero");
	}

	if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
		return Err(ConfigError::ValidationError(format!(
			"Unknown log level '{}'",
			config.logging.level
		)));
	}

	Ok(())
}
