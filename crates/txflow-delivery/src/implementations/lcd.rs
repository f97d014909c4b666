//! Tx info queries against a Cosmos LCD endpoint.

use crate::{DeliveryError, TxInfoSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use txflow_types::{RawLog, TxInfo};

/// `GET /cosmos/tx/v1beta1/txs/{hash}` based [`TxInfoSource`].
///
/// A 404 answer means the transaction is not yet included.
pub struct LcdTxInfoSource {
	client: reqwest::Client,
	endpoint: String,
}

impl LcdTxInfoSource {
	pub fn new(endpoint: impl Into<String>) -> Result<Self, DeliveryError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(10))
			.build()
			.map_err(|e| DeliveryError::Network(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			endpoint: endpoint.into().trim_end_matches('/').to_string(),
		})
	}

	fn tx_url(&self, tx_hash: &str) -> String {
		format!("{}/cosmos/tx/v1beta1/txs/{}", self.endpoint, tx_hash)
	}
}

#[derive(Debug, Deserialize)]
struct GetTxResponse {
	tx_response: LcdTxResponse,
}

#[derive(Debug, Deserialize)]
struct LcdTxResponse {
	height: String,
	txhash: String,
	#[serde(default)]
	code: u32,
	#[serde(default)]
	raw_log: String,
	#[serde(default)]
	logs: Vec<RawLog>,
	#[serde(default)]
	gas_wanted: String,
	#[serde(default)]
	gas_used: String,
}

impl LcdTxResponse {
	fn into_tx_info(self) -> Result<TxInfo, DeliveryError> {
		let parse = |field: &str, value: &str| -> Result<u64, DeliveryError> {
			if value.is_empty() {
				return Ok(0);
			}
			value.parse::<u64>().map_err(|e| {
				DeliveryError::InvalidResponse(format!("Invalid {} '{}': {}", field, value, e))
			})
		};

		let success = self.code == 0;

		Ok(TxInfo {
			height: parse("height", &self.height)?,
			gas_wanted: parse("gas_wanted", &self.gas_wanted)?,
			gas_used: parse("gas_used", &self.gas_used)?,
			tx_hash: self.txhash,
			success,
			raw_log: (!self.logs.is_empty()).then_some(self.logs),
			failure_log: (!success).then_some(self.raw_log),
		})
	}
}

#[async_trait]
impl TxInfoSource for LcdTxInfoSource {
	async fn tx_info(&self, tx_hash: &str) -> Result<Option<TxInfo>, DeliveryError> {
		let url = self.tx_url(tx_hash);
		debug!("Querying tx info from {}", url);

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| DeliveryError::Network(e.to_string()))?;

		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !status.is_success() {
			return Err(DeliveryError::Network(format!(
				"LCD returned {} for tx {}",
				status, tx_hash
			)));
		}

		let body: GetTxResponse = response
			.json()
			.await
			.map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;

		body.tx_response.into_tx_info().map(Some)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use txflow_types::{pick_attribute_value, pick_event, pick_raw_log};

	const SUCCESS_RESPONSE: &str = r#"{
		"tx_response": {
			"height": "7401234",
			"txhash": "5A1F",
			"code": 0,
			"raw_log": "[]",
			"logs": [{
				"msg_index": 0,
				"log": "",
				"events": [{
					"type": "transfer",
					"attributes": [
						{ "key": "recipient", "value": "terra1x46rqay4d3cssq8gxxvqz8xt6nwlz4td20k38v" },
						{ "key": "sender", "value": "terra1kzx23xs8v9yggf6lqpwgerg455e8xzsv0s0glf" },
						{ "key": "amount", "value": "20000000uluna" }
					]
				}]
			}],
			"gas_wanted": "400000",
			"gas_used": "312345"
		}
	}"#;

	#[test]
	fn test_success_response() {
		let body: GetTxResponse = serde_json::from_str(SUCCESS_RESPONSE).unwrap();
		let info = body.tx_response.into_tx_info().unwrap();

		assert!(info.success);
		assert_eq!(info.height, 7_401_234);
		assert_eq!(info.gas_used, 312_345);
		assert!(info.failure_log.is_none());

		let raw_log = pick_raw_log(&info, 0).unwrap();
		let transfer = pick_event(raw_log, "transfer").unwrap();
		assert_eq!(pick_attribute_value(transfer, 2), Ok("20000000uluna"));
	}

	#[test]
	fn test_failed_response() {
		let json = r#"{
			"tx_response": {
				"height": "10",
				"txhash": "BEEF",
				"code": 5,
				"raw_log": "insufficient funds",
				"logs": [],
				"gas_wanted": "100",
				"gas_used": "90"
			}
		}"#;
		let body: GetTxResponse = serde_json::from_str(json).unwrap();
		let info = body.tx_response.into_tx_info().unwrap();

		assert!(!info.success);
		assert!(info.raw_log.is_none());
		assert_eq!(info.failure_log.as_deref(), Some("insufficient funds"));
	}

	#[test]
	fn test_invalid_height() {
		let json = r#"{ "tx_response": { "height": "tall", "txhash": "BEEF" } }"#;
		let body: GetTxResponse = serde_json::from_str(json).unwrap();
		assert!(matches!(
			body.tx_response.into_tx_info(),
			Err(DeliveryError::InvalidResponse(_))
		));
	}

	#[test]
	fn test_tx_url() {
		let source = LcdTxInfoSource::new("https://lcd.terra.dev/").unwrap();
		assert_eq!(
			source.tx_url("ABC"),
			"https://lcd.terra.dev/cosmos/tx/v1beta1/txs/ABC"
		);
	}
}
