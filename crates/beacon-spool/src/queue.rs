// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The durable FIFO queue of pending requests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::ByteStore;

/// An encoded request waiting for delivery.
///
/// Immutable once appended, except for `attempts` which is bumped by
/// [`SpoolQueue::requeue_front`]. Sequence numbers are strictly
/// increasing and never reused, across restarts included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
	pub seq: u64,
	pub payload: Vec<u8>,
	/// Milliseconds since the Unix epoch.
	pub created_at: i64,
	pub attempts: u32,
}

/// Spool capacity settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
	/// Maximum number of pending entries before the oldest are evicted.
	pub capacity: usize,
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self { capacity: 1000 }
	}
}

/// Result of an append.
#[derive(Debug, Clone, Copy)]
pub struct Appended {
	/// Sequence number assigned to the new entry.
	pub seq: u64,
	/// Oldest entries evicted to stay within capacity.
	pub evicted: usize,
	/// True on the first eviction of an overflow episode. The flag
	/// rearms once occupancy drops back below capacity, so a sustained
	/// burst surfaces one report rather than one per entry.
	pub first_overflow: bool,
}

struct Inner {
	entries: VecDeque<PendingRequest>,
	next_seq: u64,
	overflow_reported: bool,
}

/// Durable ordered queue of pending requests.
///
/// All operations are synchronous and serialized by a single mutex;
/// they may be called concurrently from any thread.
pub struct SpoolQueue<S: ByteStore> {
	store: S,
	config: QueueConfig,
	inner: Mutex<Inner>,
}

impl<S: ByteStore> SpoolQueue<S> {
	/// Opens the queue, recovering any un-acked entries from the store.
	///
	/// Entries that fail to decode are dropped from the store with a
	/// warning rather than wedging recovery.
	pub fn open(store: S, config: QueueConfig) -> Result<Self> {
		let mut entries = VecDeque::new();
		let mut next_seq = 0u64;

		for (key, value) in store.scan()? {
			match serde_json::from_slice::<PendingRequest>(&value) {
				Ok(entry) => {
					next_seq = next_seq.max(entry.seq + 1);
					entries.push_back(entry);
				}
				Err(e) => {
					warn!(seq = key, error = %e, "dropping corrupt spool entry");
					store.delete(key)?;
					next_seq = next_seq.max(key + 1);
				}
			}
		}

		if !entries.is_empty() {
			debug!(count = entries.len(), "recovered pending requests");
		}

		Ok(Self {
			store,
			config,
			inner: Mutex::new(Inner {
				entries,
				next_seq,
				overflow_reported: false,
			}),
		})
	}

	/// Appends an encoded payload at the tail, persisting it before
	/// returning. On storage failure nothing is enqueued and the caller
	/// keeps the payload.
	pub fn append(&self, payload: &[u8]) -> Result<Appended> {
		let mut inner = self.inner.lock().unwrap();
		let seq = inner.next_seq;
		let entry = PendingRequest {
			seq,
			payload: payload.to_vec(),
			created_at: now_ms(),
			attempts: 0,
		};

		self.store.put(seq, &serde_json::to_vec(&entry)?)?;
		inner.next_seq += 1;
		inner.entries.push_back(entry);

		let mut evicted = 0;
		while inner.entries.len() > self.config.capacity {
			if let Some(oldest) = inner.entries.pop_front() {
				if let Err(e) = self.store.delete(oldest.seq) {
					warn!(seq = oldest.seq, error = %e, "failed to delete evicted entry");
				}
				evicted += 1;
			}
		}

		let first_overflow = evicted > 0 && !inner.overflow_reported;
		if first_overflow {
			inner.overflow_reported = true;
		}

		Ok(Appended {
			seq,
			evicted,
			first_overflow,
		})
	}

	/// Returns up to `max` oldest entries without removing them.
	pub fn peek_batch(&self, max: usize) -> Vec<PendingRequest> {
		let inner = self.inner.lock().unwrap();
		inner.entries.iter().take(max).cloned().collect()
	}

	/// Removes a delivered entry. Idempotent: acking a seq that is
	/// already gone is a no-op.
	pub fn ack(&self, seq: u64) -> Result<()> {
		let mut inner = self.inner.lock().unwrap();
		if let Some(pos) = inner.entries.iter().position(|e| e.seq == seq) {
			inner.entries.remove(pos);
			self.store.delete(seq)?;
		}
		if inner.entries.len() < self.config.capacity {
			inner.overflow_reported = false;
		}
		Ok(())
	}

	/// Records a failed delivery attempt, leaving the entry at the
	/// head for the next peek. A seq evicted in the meantime is a
	/// no-op.
	pub fn requeue_front(&self, seq: u64) -> Result<()> {
		let mut inner = self.inner.lock().unwrap();
		if let Some(entry) = inner.entries.iter_mut().find(|e| e.seq == seq) {
			entry.attempts += 1;
			let record = serde_json::to_vec(&*entry)?;
			self.store.put(seq, &record)?;
		}
		Ok(())
	}

	/// Number of pending entries.
	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as i64)
		.unwrap_or(0)
}
