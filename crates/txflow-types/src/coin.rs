//! Coin amounts in micro denominations and their display form.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Number of micro units in one display unit.
pub const MICRO: i64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinParseError {
	#[error("Missing amount in '{0}'")]
	MissingAmount(String),
	#[error("Missing denomination in '{0}'")]
	MissingDenom(String),
	#[error("Invalid amount in '{input}': {reason}")]
	InvalidAmount { input: String, reason: String },
}

/// An amount in a micro denomination, e.g. `20000000uluna`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
	pub amount: Decimal,
	pub denom: String,
}

impl Coin {
	pub fn new(amount: impl Into<Decimal>, denom: impl Into<String>) -> Self {
		Self {
			amount: amount.into(),
			denom: denom.into(),
		}
	}

	/// Human-facing form, e.g. `20 Luna`.
	pub fn format_demicrofied(&self) -> String {
		format!(
			"{} {}",
			format_amount(demicrofy(self.amount)),
			display_denom(&self.denom)
		)
	}
}

impl FromStr for Coin {
	type Err = CoinParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let split = s
			.find(|c: char| !(c.is_ascii_digit() || c == '.'))
			.unwrap_or(s.len());
		let (amount, denom) = s.split_at(split);

		if amount.is_empty() {
			return Err(CoinParseError::MissingAmount(s.to_string()));
		}
		if denom.is_empty() {
			return Err(CoinParseError::MissingDenom(s.to_string()));
		}

		let amount = Decimal::from_str(amount).map_err(|e| CoinParseError::InvalidAmount {
			input: s.to_string(),
			reason: e.to_string(),
		})?;

		Ok(Self::new(amount, denom))
	}
}

impl std::fmt::Display for Coin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}", self.amount.normalize(), self.denom)
	}
}

pub fn demicrofy(amount: Decimal) -> Decimal {
	amount / Decimal::from(MICRO)
}

pub fn microfy(amount: Decimal) -> Decimal {
	amount * Decimal::from(MICRO)
}

/// Formats a display amount with at most six decimals and no trailing zeros.
pub fn format_amount(amount: Decimal) -> String {
	amount
		.round_dp_with_strategy(6, RoundingStrategy::ToZero)
		.normalize()
		.to_string()
}

/// Display symbol for a micro denomination.
pub fn display_denom(denom: &str) -> String {
	match denom {
		"uluna" => "Luna".to_string(),
		"uusd" => "UST".to_string(),
		"uanc" => "ANC".to_string(),
		"ubluna" => "bLuna".to_string(),
		"uaust" => "aUST".to_string(),
		other => other.strip_prefix('u').unwrap_or(other).to_uppercase(),
	}
}
