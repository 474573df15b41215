// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Push-notification payload decoding.
//!
//! The vendor delivers push payloads as a flat map of string fields
//! with reserved `c.`-prefixed keys. `decode_payload` extracts the
//! message content without touching the delivery queue; it is pure
//! parsing over the map it is handed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved vendor keys in the push payload.
const KEY_ID: &str = "c.i";
const KEY_LINK: &str = "c.l";
const KEY_MEDIA: &str = "c.m";
const KEY_BUTTONS: &str = "c.b";
const KEY_TITLE: &str = "title";
const KEY_MESSAGE: &str = "message";
const KEY_SOUND: &str = "sound";
const KEY_BADGE: &str = "badge";

/// Errors raised while decoding a push payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
	/// A required field was absent from the payload map.
	#[error("missing required push field: {0}")]
	MissingField(&'static str),

	/// The buttons field was present but not valid button JSON.
	#[error("malformed buttons field: {0}")]
	MalformedButtons(String),

	/// The badge field was present but not an integer.
	#[error("malformed badge field: {0}")]
	MalformedBadge(String),
}

/// Result type alias for push decoding.
pub type Result<T> = std::result::Result<T, PushError>;

/// An action button attached to a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushButton {
	/// Button label.
	#[serde(rename = "t")]
	pub title: String,
	/// Link opened on tap.
	#[serde(rename = "l")]
	pub link: String,
}

/// A decoded push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
	/// Vendor message identifier.
	pub id: String,
	pub title: Option<String>,
	pub message: String,
	pub sound: Option<String>,
	/// Link opened when the notification body is tapped.
	pub link: Option<String>,
	/// Attached media URL.
	pub media: Option<String>,
	pub badge: Option<u32>,
	pub buttons: Vec<PushButton>,
}

/// Decodes a vendor push payload map into a [`PushMessage`].
///
/// `c.i` (message id) and `message` are required; everything else is
/// optional. Unknown keys are ignored.
pub fn decode_payload(fields: &HashMap<String, String>) -> Result<PushMessage> {
	let id = fields
		.get(KEY_ID)
		.ok_or(PushError::MissingField(KEY_ID))?
		.clone();
	let message = fields
		.get(KEY_MESSAGE)
		.ok_or(PushError::MissingField(KEY_MESSAGE))?
		.clone();

	let badge = match fields.get(KEY_BADGE) {
		Some(raw) => Some(
			raw.parse::<u32>()
				.map_err(|_| PushError::MalformedBadge(raw.clone()))?,
		),
		None => None,
	};

	let buttons = match fields.get(KEY_BUTTONS) {
		Some(raw) => serde_json::from_str::<Vec<PushButton>>(raw)
			.map_err(|e| PushError::MalformedButtons(e.to_string()))?,
		None => Vec::new(),
	};

	Ok(PushMessage {
		id,
		title: fields.get(KEY_TITLE).cloned(),
		message,
		sound: fields.get(KEY_SOUND).cloned(),
		link: fields.get(KEY_LINK).cloned(),
		media: fields.get(KEY_MEDIA).cloned(),
		badge,
		buttons,
	})
}
