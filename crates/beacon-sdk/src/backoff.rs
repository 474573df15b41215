// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exponential backoff for transient delivery failures.

use std::time::Duration;

/// Backoff settings: base delay doubling up to a cap.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
	pub base: Duration,
	pub cap: Duration,
}

impl Default for BackoffConfig {
	fn default() -> Self {
		Self {
			base: Duration::from_secs(1),
			cap: Duration::from_secs(60),
		}
	}
}

/// Tracks the current backoff delay across consecutive failures.
#[derive(Debug)]
pub struct Backoff {
	config: BackoffConfig,
	current: Option<Duration>,
}

impl Backoff {
	pub fn new(config: BackoffConfig) -> Self {
		Self {
			config,
			current: None,
		}
	}

	/// Returns the delay to apply for the next retry: the base on the
	/// first failure, doubling after that, capped.
	pub fn next_delay(&mut self) -> Duration {
		let next = match self.current {
			None => self.config.base,
			Some(d) => self.config.cap.min(d.saturating_mul(2)),
		};
		self.current = Some(next);
		next
	}

	/// Clears the failure streak after a successful delivery.
	pub fn reset(&mut self) {
		self.current = None;
	}
}
