// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure request encoding.
//!
//! `encode` turns an in-memory event batch or session signal into the
//! JSON body the server ingests. It performs no I/O and has no failure
//! modes beyond malformed input.

use chrono::Utc;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::event::Event;

/// Identifiers every request carries.
#[derive(Debug, Clone)]
pub struct ClientIds {
	pub app_key: String,
	pub device_id: String,
}

impl ClientIds {
	pub fn new(app_key: impl Into<String>, device_id: impl Into<String>) -> Self {
		Self {
			app_key: app_key.into(),
			device_id: device_id.into(),
		}
	}

	fn validate(&self) -> Result<()> {
		if self.app_key.trim().is_empty() {
			return Err(CoreError::InvalidInput("app key is empty".to_string()));
		}
		if self.device_id.trim().is_empty() {
			return Err(CoreError::InvalidInput("device id is empty".to_string()));
		}
		Ok(())
	}
}

/// SDK self-identification included in every request.
#[derive(Debug, Clone)]
pub struct SdkMetadata {
	pub name: String,
	pub version: String,
}

impl Default for SdkMetadata {
	fn default() -> Self {
		Self {
			name: "beacon-rust".to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
		}
	}
}

/// The record being encoded.
#[derive(Debug, Clone)]
pub enum RequestBody<'a> {
	/// A batch of telemetry events.
	Events(&'a [Event]),
	/// Session began.
	SessionStart,
	/// Periodic heartbeat carrying seconds since the last signal.
	SessionHeartbeat { duration: f64 },
	/// Session ended after `duration` seconds.
	SessionEnd { duration: f64 },
}

#[derive(Serialize)]
struct RequestEnvelope<'a> {
	app_key: &'a str,
	device_id: &'a str,
	sdk_name: &'a str,
	sdk_version: &'a str,
	/// Milliseconds since the Unix epoch at encode time.
	timestamp: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	events: Option<&'a [Event]>,
	#[serde(skip_serializing_if = "Option::is_none")]
	begin_session: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	end_session: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	session_duration: Option<f64>,
}

/// Encodes a request body into transport-ready bytes.
///
/// Pure and side-effect free. Fails only on malformed input: missing
/// identifiers or invalid events.
pub fn encode(body: &RequestBody<'_>, ids: &ClientIds, sdk: &SdkMetadata) -> Result<Vec<u8>> {
	ids.validate()?;

	let mut envelope = RequestEnvelope {
		app_key: &ids.app_key,
		device_id: &ids.device_id,
		sdk_name: &sdk.name,
		sdk_version: &sdk.version,
		timestamp: Utc::now().timestamp_millis(),
		events: None,
		begin_session: None,
		end_session: None,
		session_duration: None,
	};

	match body {
		RequestBody::Events(events) => {
			if events.is_empty() {
				return Err(CoreError::InvalidInput("empty event batch".to_string()));
			}
			for event in events.iter() {
				event.validate()?;
			}
			envelope.events = Some(events);
		}
		RequestBody::SessionStart => {
			envelope.begin_session = Some(1);
		}
		RequestBody::SessionHeartbeat { duration } => {
			envelope.session_duration = Some(*duration);
		}
		RequestBody::SessionEnd { duration } => {
			envelope.end_session = Some(1);
			envelope.session_duration = Some(*duration);
		}
	}

	Ok(serde_json::to_vec(&envelope)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn ids() -> ClientIds {
		ClientIds::new("app_key_1", "device_42")
	}

	#[test]
	fn encode_events_carries_identifiers() {
		let events = vec![Event::new("app_open")];
		let bytes = encode(&RequestBody::Events(&events), &ids(), &SdkMetadata::default()).unwrap();
		let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(json["app_key"], "app_key_1");
		assert_eq!(json["device_id"], "device_42");
		assert_eq!(json["sdk_name"], "beacon-rust");
		assert_eq!(json["events"][0]["key"], "app_open");
		assert!(json.get("begin_session").is_none());
	}

	#[test]
	fn encode_rejects_missing_app_key() {
		let events = vec![Event::new("app_open")];
		let bad = ClientIds::new("", "device_42");
		let result = encode(&RequestBody::Events(&events), &bad, &SdkMetadata::default());
		assert!(matches!(result, Err(CoreError::InvalidInput(_))));
	}

	#[test]
	fn encode_rejects_missing_device_id() {
		let events = vec![Event::new("app_open")];
		let bad = ClientIds::new("app_key_1", "   ");
		let result = encode(&RequestBody::Events(&events), &bad, &SdkMetadata::default());
		assert!(matches!(result, Err(CoreError::InvalidInput(_))));
	}

	#[test]
	fn encode_rejects_invalid_event_in_batch() {
		let events = vec![Event::new("ok"), Event::new("bad").with_count(0)];
		let result = encode(&RequestBody::Events(&events), &ids(), &SdkMetadata::default());
		assert!(matches!(result, Err(CoreError::InvalidInput(_))));
	}

	#[test]
	fn encode_rejects_empty_batch() {
		let result = encode(&RequestBody::Events(&[]), &ids(), &SdkMetadata::default());
		assert!(matches!(result, Err(CoreError::InvalidInput(_))));
	}

	#[test]
	fn encode_session_signals() {
		let start = encode(&RequestBody::SessionStart, &ids(), &SdkMetadata::default()).unwrap();
		let json: serde_json::Value = serde_json::from_slice(&start).unwrap();
		assert_eq!(json["begin_session"], 1);

		let end = encode(
			&RequestBody::SessionEnd { duration: 12.5 },
			&ids(),
			&SdkMetadata::default(),
		)
		.unwrap();
		let json: serde_json::Value = serde_json::from_slice(&end).unwrap();
		assert_eq!(json["end_session"], 1);
		assert_eq!(json["session_duration"], 12.5);
	}

	proptest! {
		#[test]
		fn encoded_events_roundtrip_exactly(
			key in "[a-z_]{1,16}",
			count in 1..100u32,
			sum in proptest::option::of(-1e6..1e6f64),
		) {
			let mut event = Event::new(key).with_count(count);
			if let Some(s) = sum {
				event = event.with_sum(s);
			}
			let events = vec![event.clone()];
			let bytes = encode(&RequestBody::Events(&events), &ids(), &SdkMetadata::default()).unwrap();
			let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
			let back: Vec<Event> = serde_json::from_value(json["events"].clone()).unwrap();
			prop_assert_eq!(back, events);
		}
	}
}
