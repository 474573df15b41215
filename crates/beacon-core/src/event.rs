// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry event types.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A single primitive segmentation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentValue {
	String(String),
	Bool(bool),
	Int(i64),
	Float(f64),
}

impl From<&str> for SegmentValue {
	fn from(v: &str) -> Self {
		Self::String(v.to_string())
	}
}

impl From<String> for SegmentValue {
	fn from(v: String) -> Self {
		Self::String(v)
	}
}

impl From<bool> for SegmentValue {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<i64> for SegmentValue {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<f64> for SegmentValue {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

/// Named segmentation attached to an event. Ordered map so encoded
/// output is deterministic.
pub type Segmentation = BTreeMap<String, SegmentValue>;

/// A discrete telemetry record. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub key: String,
	#[serde(default, skip_serializing_if = "Segmentation::is_empty")]
	pub segmentation: Segmentation,
	pub count: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sum: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration: Option<f64>,
	/// Milliseconds since the Unix epoch.
	pub timestamp: i64,
}

impl Event {
	/// Creates an event with the given key, count 1, stamped now.
	pub fn new(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			segmentation: Segmentation::new(),
			count: 1,
			sum: None,
			duration: None,
			timestamp: Utc::now().timestamp_millis(),
		}
	}

	/// Adds a segmentation key-value pair (builder pattern).
	pub fn with_segment(mut self, key: impl Into<String>, value: impl Into<SegmentValue>) -> Self {
		self.segmentation.insert(key.into(), value.into());
		self
	}

	/// Sets the occurrence count (builder pattern).
	pub fn with_count(mut self, count: u32) -> Self {
		self.count = count;
		self
	}

	/// Sets the sum value (builder pattern).
	pub fn with_sum(mut self, sum: f64) -> Self {
		self.sum = Some(sum);
		self
	}

	/// Sets the duration in seconds (builder pattern).
	pub fn with_duration(mut self, duration: f64) -> Self {
		self.duration = Some(duration);
		self
	}

	/// Rejects events that must not reach the queue.
	pub fn validate(&self) -> Result<()> {
		if self.key.trim().is_empty() {
			return Err(CoreError::InvalidInput("event key is empty".to_string()));
		}
		if self.count == 0 {
			return Err(CoreError::InvalidInput(format!(
				"event '{}' has count 0",
				self.key
			)));
		}
		Ok(())
	}
}
