// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hook for surfacing delivery outcomes to the host application.

/// Observer for delivery outcomes.
///
/// All methods default to no-ops; implement what you need. Methods are
/// called from the delivery worker task (or the appending thread for
/// overflow) and must not block.
pub trait DeliveryObserver: Send + Sync {
	/// A request was delivered and acknowledged.
	fn on_delivered(&self, seq: u64) {
		let _ = seq;
	}

	/// The server rejected a request with a definite client error.
	/// Called once per request in the batch; none of them will be
	/// retried.
	fn on_rejected(&self, seq: u64, status: u16) {
		let _ = (seq, status);
	}

	/// The queue exceeded capacity and evicted its oldest entries.
	/// Called once per overflow episode, not once per entry.
	fn on_overflow(&self, evicted: usize) {
		let _ = evicted;
	}
}

/// Observer that ignores everything. The default.
pub struct NoOpObserver;

impl DeliveryObserver for NoOpObserver {}
