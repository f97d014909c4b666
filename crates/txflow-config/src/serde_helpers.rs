//! Serde helpers for configuration deserialization

use serde::{Deserialize, Deserializer, Serializer};
use std::str::FromStr;
use txflow_types::Coin;

/// Reads a coin written as `<amount><denom>`, e.g. `"250000uusd"`.
pub fn deserialize_coin<'de, D>(deserializer: D) -> Result<Coin, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;
	Coin::from_str(&raw).map_err(serde::de::Error::custom)
}

/// Writes a coin back as `<amount><denom>`.
pub fn serialize_coin<S>(coin: &Coin, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.collect_str(coin)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Serialize;

	#[derive(Debug, Deserialize, Serialize)]
	struct TestStruct {
		#[serde(deserialize_with = "deserialize_coin", serialize_with = "serialize_coin")]
		fee: Coin,
	}

	#[test]
	fn test_deserialize_coin() {
		let parsed: TestStruct = toml::from_str(r#"fee = "250000uusd""#).unwrap();
		assert_eq!(parsed.fee, Coin::new(250_000, "uusd"));

		let toml = toml::to_string(&parsed).unwrap();
		assert!(toml.contains("fee = \"250000uusd\""));
	}

	#[test]
	fn test_deserialize_coin_rejects_bare_number() {
		let result: Result<TestStruct, _> = toml::from_str(r#"fee = "250000""#);
		assert!(result.is_err());
	}
}
