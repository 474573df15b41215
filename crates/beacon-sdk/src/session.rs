// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session lifecycle tracking.
//!
//! The tracker owns the one active session per client and turns
//! lifecycle transitions into request bodies for the queue. It never
//! performs I/O itself.

use std::sync::Mutex;
use std::time::Duration;

use beacon_core::{RequestBody, Session, SessionId};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Result, SdkError};

/// Session tracking settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Minimum interval between heartbeat updates.
	pub heartbeat_interval: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			heartbeat_interval: Duration::from_secs(60),
		}
	}
}

enum SessionState {
	NoSession,
	Active(Session),
	Ended,
}

/// Owns the begin/update/end session lifecycle.
///
/// Exactly one session is active at a time; `begin` after `end` starts
/// a fresh one.
pub struct SessionTracker {
	config: SessionConfig,
	state: Mutex<SessionState>,
}

impl SessionTracker {
	pub fn new(config: SessionConfig) -> Self {
		Self {
			config,
			state: Mutex::new(SessionState::NoSession),
		}
	}

	/// Starts a session, producing the session-start request body.
	/// Fails if a session is already active.
	pub fn begin(&self) -> Result<RequestBody<'static>> {
		let mut state = self.state.lock().unwrap();
		if matches!(*state, SessionState::Active(_)) {
			return Err(SdkError::Core(beacon_core::CoreError::InvalidInput(
				"session already active".to_string(),
			)));
		}
		let session = Session::start();
		info!(session_id = %session.id, "session started");
		*state = SessionState::Active(session);
		Ok(RequestBody::SessionStart)
	}

	/// Produces a heartbeat body if a session is active and the
	/// heartbeat interval has elapsed; `None` otherwise.
	pub fn update(&self) -> Option<RequestBody<'static>> {
		let mut state = self.state.lock().unwrap();
		let SessionState::Active(session) = &mut *state else {
			debug!("update_session called with no active session");
			return None;
		};

		let now = Utc::now();
		if session.since_last_update(now) < self.config.heartbeat_interval.as_secs_f64() {
			return None;
		}
		let duration = session.touch(now);
		debug!(session_id = %session.id, duration, "session heartbeat");
		Some(RequestBody::SessionHeartbeat { duration })
	}

	/// Ends the active session, producing the session-end body with
	/// its total duration. With no active session this logs one
	/// warning and produces nothing; it is not an error.
	pub fn end(&self) -> Option<RequestBody<'static>> {
		let mut state = self.state.lock().unwrap();
		let SessionState::Active(session) = &mut *state else {
			warn!("end_session called with no active session");
			return None;
		};

		let duration = session.end(Utc::now());
		info!(session_id = %session.id, duration, "session ended");
		*state = SessionState::Ended;
		Some(RequestBody::SessionEnd { duration })
	}

	/// True while a session is active.
	pub fn is_active(&self) -> bool {
		matches!(*self.state.lock().unwrap(), SessionState::Active(_))
	}

	/// Id of the active session, if any.
	pub fn current_session_id(&self) -> Option<SessionId> {
		match &*self.state.lock().unwrap() {
			SessionState::Active(session) => Some(session.id.clone()),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tracker(interval: Duration) -> SessionTracker {
		SessionTracker::new(SessionConfig {
			heartbeat_interval: interval,
		})
	}

	#[test]
	fn begin_transitions_to_active() {
		let tracker = tracker(Duration::from_secs(60));
		assert!(!tracker.is_active());
		let body = tracker.begin().unwrap();
		assert!(matches!(body, RequestBody::SessionStart));
		assert!(tracker.is_active());
		assert!(tracker.current_session_id().is_some());
	}

	#[test]
	fn begin_while_active_is_rejected() {
		let tracker = tracker(Duration::from_secs(60));
		tracker.begin().unwrap();
		assert!(tracker.begin().is_err());
	}

	#[test]
	fn update_before_interval_is_a_no_op() {
		let tracker = tracker(Duration::from_secs(3600));
		tracker.begin().unwrap();
		assert!(tracker.update().is_none());
	}

	#[test]
	fn update_after_interval_produces_heartbeat() {
		let tracker = tracker(Duration::ZERO);
		tracker.begin().unwrap();
		let body = tracker.update();
		assert!(matches!(
			body,
			Some(RequestBody::SessionHeartbeat { .. })
		));
	}

	#[test]
	fn update_without_session_is_a_no_op() {
		let tracker = tracker(Duration::ZERO);
		assert!(tracker.update().is_none());
	}

	#[test]
	fn end_produces_duration_and_transitions() {
		let tracker = tracker(Duration::from_secs(60));
		tracker.begin().unwrap();
		let body = tracker.end().unwrap();
		let RequestBody::SessionEnd { duration } = body else {
			panic!("expected session end");
		};
		assert!(duration >= 0.0);
		assert!(!tracker.is_active());
	}

	#[test]
	fn end_without_session_produces_nothing() {
		let tracker = tracker(Duration::from_secs(60));
		assert!(tracker.end().is_none());
	}

	#[test]
	fn session_can_restart_after_end() {
		let tracker = tracker(Duration::from_secs(60));
		tracker.begin().unwrap();
		let first = tracker.current_session_id().unwrap();
		tracker.end().unwrap();
		tracker.begin().unwrap();
		let second = tracker.current_session_id().unwrap();
		assert_ne!(first, second);
	}
}
