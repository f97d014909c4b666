//! Raw log and event extraction.
//!
//! A transaction's execution trace is a list of raw logs (one per message),
//! each holding ordered events, each holding ordered key/value attributes.
//! Producers do not key attributes uniformly, so lookups exist both by key
//! and by position. Every lookup returns an [`ExtractError`] instead of
//! panicking; a found-but-empty value is `Ok("")`.

use crate::errors::TxErrorCode;
use crate::tx::TxInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Execution log of a single message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawLog {
	#[serde(default)]
	pub msg_index: u32,
	#[serde(default)]
	pub log: String,
	#[serde(default)]
	pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
	#[serde(rename = "type")]
	pub event_type: String,
	#[serde(default)]
	pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
	pub key: String,
	#[serde(default)]
	pub value: String,
}

impl Event {
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			attributes: Vec::new(),
		}
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.push(Attribute {
			key: key.into(),
			value: value.into(),
		});
		self
	}
}

impl RawLog {
	pub fn new(events: Vec<Event>) -> Self {
		Self {
			events,
			..Default::default()
		}
	}
}

/// Why an extraction found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
	#[error("Transaction info has no raw log")]
	NoRawLog,

	#[error("Raw log index {index} out of range ({len} entries)")]
	RawLogIndexOutOfRange { index: usize, len: usize },

	#[error("Undefined the {0} event")]
	EventNotFound(String),

	#[error("Attribute '{key}' not found in {event} event")]
	AttributeKeyNotFound { event: String, key: String },

	#[error("Attribute #{position} not found in {event} event ({len} attributes)")]
	AttributePositionOutOfRange {
		event: String,
		position: usize,
		len: usize,
	},
}

impl ExtractError {
	pub fn code(&self) -> TxErrorCode {
		match self {
			Self::NoRawLog | Self::RawLogIndexOutOfRange { .. } => TxErrorCode::MissingRawLog,
			Self::EventNotFound(_) => TxErrorCode::MissingEvents,
			Self::AttributeKeyNotFound { .. } | Self::AttributePositionOutOfRange { .. } => {
				TxErrorCode::MissingAttribute
			}
		}
	}
}

/// Returns the raw log at `index`.
pub fn pick_raw_log(tx_info: &TxInfo, index: usize) -> Result<&RawLog, ExtractError> {
	let raw_logs = tx_info.raw_log.as_ref().ok_or(ExtractError::NoRawLog)?;

	raw_logs
		.get(index)
		.ok_or(ExtractError::RawLogIndexOutOfRange {
			index,
			len: raw_logs.len(),
		})
}

/// Returns the first event of `event_type`.
pub fn pick_event<'a>(raw_log: &'a RawLog, event_type: &str) -> Result<&'a Event, ExtractError> {
	raw_log
		.events
		.iter()
		.find(|event| event.event_type == event_type)
		.ok_or_else(|| ExtractError::EventNotFound(event_type.to_string()))
}

/// Returns the value of the first attribute named `key`.
pub fn pick_attribute_value_by_key<'a>(
	event: &'a Event,
	key: &str,
) -> Result<&'a str, ExtractError> {
	event
		.attributes
		.iter()
		.find(|attribute| attribute.key == key)
		.map(|attribute| attribute.value.as_str())
		.ok_or_else(|| ExtractError::AttributeKeyNotFound {
			event: event.event_type.clone(),
			key: key.to_string(),
		})
}

/// Returns the value of the attribute at `position`.
pub fn pick_attribute_value(event: &Event, position: usize) -> Result<&str, ExtractError> {
	event
		.attributes
		.get(position)
		.map(|attribute| attribute.value.as_str())
		.ok_or_else(|| ExtractError::AttributePositionOutOfRange {
			event: event.event_type.clone(),
			position,
			len: event.attributes.len(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn transfer_event() -> Event {
		Event::new("transfer")
			.with_attribute("recipient", "terra1x46rqay4d3cssq8gxxvqz8xt6nwlz4td20k38v")
			.with_attribute("sender", "terra1kzx23xs8v9yggf6lqpwgerg455e8xzsv0s0glf")
			.with_attribute("amount", "20000000uluna")
	}

	fn tx_info(raw_log: Option<Vec<RawLog>>) -> TxInfo {
		TxInfo {
			tx_hash: "ABC".into(),
			height: 10,
			success: true,
			raw_log,
			failure_log: None,
			gas_wanted: 0,
			gas_used: 0,
		}
	}

	#[test]
	fn test_pick_raw_log() {
		let info = tx_info(Some(vec![RawLog::new(vec![transfer_event()])]));
		assert_eq!(pick_raw_log(&info, 0).unwrap().events.len(), 1);
		assert_eq!(
			pick_raw_log(&info, 1),
			Err(ExtractError::RawLogIndexOutOfRange { index: 1, len: 1 })
		);

		let missing = tx_info(None);
		assert_eq!(pick_raw_log(&missing, 0), Err(ExtractError::NoRawLog));
	}

	#[test]
	fn test_pick_event_first_match() {
		let raw_log = RawLog::new(vec![
			Event::new("message").with_attribute("action", "send"),
			transfer_event(),
			Event::new("transfer").with_attribute("amount", "1uluna"),
		]);

		let event = pick_event(&raw_log, "transfer").unwrap();
		assert_eq!(pick_attribute_value_by_key(event, "amount"), Ok("20000000uluna"));

		let err = pick_event(&raw_log, "from_contract").unwrap_err();
		assert_eq!(err, ExtractError::EventNotFound("from_contract".into()));
		assert_eq!(err.code(), TxErrorCode::MissingEvents);
	}

	#[test]
	fn test_duplicate_keys_first_wins() {
		let event = Event::new("from_contract")
			.with_attribute("amount", "100")
			.with_attribute("contract_address", "terra1...")
			.with_attribute("amount", "200");

		assert_eq!(pick_attribute_value_by_key(&event, "amount"), Ok("100"));
	}

	#[test]
	fn test_missing_differs_from_empty() {
		let event = Event::new("from_contract").with_attribute("amount", "");

		assert_eq!(pick_attribute_value_by_key(&event, "amount"), Ok(""));
		assert!(matches!(
			pick_attribute_value_by_key(&event, "share"),
			Err(ExtractError::AttributeKeyNotFound { .. })
		));
	}

	#[test]
	fn test_pick_attribute_by_position() {
		let event = transfer_event();
		assert_eq!(pick_attribute_value(&event, 2), Ok("20000000uluna"));
		assert_eq!(
			pick_attribute_value(&event, 3),
			Err(ExtractError::AttributePositionOutOfRange {
				event: "transfer".into(),
				position: 3,
				len: 3,
			})
		);
	}

	#[test]
	fn test_deserialize_wire_format() {
		let json = r#"[{"msg_index":0,"log":"","events":[{"type":"transfer","attributes":[{"key":"amount","value":"5uluna"}]}]}]"#;
		let logs: Vec<RawLog> = serde_json::from_str(json).unwrap();
		let event = pick_event(&logs[0], "transfer").unwrap();
		assert_eq!(pick_attribute_value(event, 0), Ok("5uluna"));
	}
}
