// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session types for app session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}

	#[must_use]
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for SessionId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for SessionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for SessionId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// A single usage period of the host application.
///
/// Owned exclusively by the session tracker; never shared or cloned
/// into caller code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionId,
	pub started_at: DateTime<Utc>,
	pub last_update_at: DateTime<Utc>,
	pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
	/// Starts a new session stamped now.
	#[must_use]
	pub fn start() -> Self {
		let now = Utc::now();
		Self {
			id: SessionId::new(),
			started_at: now,
			last_update_at: now,
			ended_at: None,
		}
	}

	/// Seconds elapsed since the last update.
	#[must_use]
	pub fn since_last_update(&self, now: DateTime<Utc>) -> f64 {
		(now - self.last_update_at).num_milliseconds() as f64 / 1000.0
	}

	/// Marks the session as updated at `now` and returns the heartbeat
	/// duration in seconds.
	pub fn touch(&mut self, now: DateTime<Utc>) -> f64 {
		let elapsed = self.since_last_update(now);
		self.last_update_at = now;
		elapsed
	}

	/// Closes the session and returns its total duration in seconds.
	pub fn end(&mut self, now: DateTime<Utc>) -> f64 {
		self.ended_at = Some(now);
		(now - self.started_at).num_milliseconds() as f64 / 1000.0
	}
}
