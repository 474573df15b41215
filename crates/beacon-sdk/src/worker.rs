// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background delivery worker draining the spool to the transport.

use std::sync::Arc;
use std::time::Duration;

use beacon_spool::{ByteStore, PendingRequest, SpoolQueue};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::observer::DeliveryObserver;
use crate::transport::{SendOutcome, Transport};

/// Delivery worker settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
	/// Maximum requests sent in one transport call.
	pub batch_size: usize,
	/// Interval between periodic drain attempts.
	pub tick: Duration,
	/// Timeout applied to each transport call.
	pub request_timeout: Duration,
	/// Backoff applied after transient failures.
	pub backoff: BackoffConfig,
	/// How long `shutdown` waits for the final drain.
	pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self {
			batch_size: 10,
			tick: Duration::from_secs(10),
			request_timeout: Duration::from_secs(30),
			backoff: BackoffConfig::default(),
			shutdown_timeout: Duration::from_secs(5),
		}
	}
}

/// Command sent to the delivery worker.
#[derive(Debug)]
pub enum WorkerCommand {
	/// A new entry was appended; drain when convenient.
	Wake,
	/// Drain now and resolve the sender once the queue is empty or a
	/// delivery attempt has failed.
	Flush(oneshot::Sender<()>),
	/// Stop after a best-effort drain.
	Shutdown,
}

/// The single-flight background task that drains the queue.
///
/// Wakes on appended entries, periodic ticks, explicit flushes, and
/// shutdown. A bad batch never terminates the loop; failures are
/// isolated per batch.
pub struct DeliveryWorker<S: ByteStore> {
	queue: Arc<SpoolQueue<S>>,
	transport: Arc<dyn Transport>,
	observer: Arc<dyn DeliveryObserver>,
	config: WorkerConfig,
	rx: mpsc::Receiver<WorkerCommand>,
}

impl<S: ByteStore> DeliveryWorker<S> {
	pub fn new(
		queue: Arc<SpoolQueue<S>>,
		transport: Arc<dyn Transport>,
		observer: Arc<dyn DeliveryObserver>,
		config: WorkerConfig,
		rx: mpsc::Receiver<WorkerCommand>,
	) -> Self {
		Self {
			queue,
			transport,
			observer,
			config,
			rx,
		}
	}

	/// Runs the delivery loop until shutdown.
	pub async fn run(mut self) {
		info!(
			batch_size = self.config.batch_size,
			tick_secs = self.config.tick.as_secs(),
			"delivery worker started"
		);

		let mut backoff = Backoff::new(self.config.backoff.clone());
		let mut flush_waiters: Vec<oneshot::Sender<()>> = Vec::new();
		let mut shutting_down = false;

		loop {
			let batch = self.queue.peek_batch(self.config.batch_size);

			if batch.is_empty() {
				for waiter in flush_waiters.drain(..) {
					let _ = waiter.send(());
				}
				if shutting_down {
					break;
				}
				// Idle until the next wake source.
				tokio::select! {
					command = self.rx.recv() => match command {
						Some(WorkerCommand::Wake) => {}
						Some(WorkerCommand::Flush(waiter)) => flush_waiters.push(waiter),
						Some(WorkerCommand::Shutdown) | None => shutting_down = true,
					},
					_ = tokio::time::sleep(self.config.tick) => {}
				}
				continue;
			}

			let body = frame_batch(&batch);
			let outcome = self
				.transport
				.send(&body, self.config.request_timeout)
				.await;

			match outcome {
				SendOutcome::Success => {
					for entry in &batch {
						if let Err(e) = self.queue.ack(entry.seq) {
							error!(seq = entry.seq, error = %e, "failed to ack delivered entry");
						}
						self.observer.on_delivered(entry.seq);
					}
					backoff.reset();
					debug!(count = batch.len(), "batch delivered");
				}
				SendOutcome::ClientError { status } => {
					// Retrying a rejected batch would loop forever; ack
					// and surface the loss.
					for entry in &batch {
						if let Err(e) = self.queue.ack(entry.seq) {
							error!(seq = entry.seq, error = %e, "failed to ack rejected entry");
						}
						self.observer.on_rejected(entry.seq, status);
					}
					backoff.reset();
					warn!(status, count = batch.len(), "batch rejected, dropped");
				}
				SendOutcome::Transient { reason } => {
					for entry in &batch {
						if let Err(e) = self.queue.requeue_front(entry.seq) {
							error!(seq = entry.seq, error = %e, "failed to requeue entry");
						}
					}
					for waiter in flush_waiters.drain(..) {
						let _ = waiter.send(());
					}
					if shutting_down {
						warn!(reason = %reason, "transient failure during shutdown, abandoning drain");
						break;
					}
					let delay = backoff.next_delay();
					warn!(
						reason = %reason,
						delay_ms = delay.as_millis() as u64,
						"transient delivery failure, backing off"
					);
					shutting_down = self.wait_backoff(delay, &mut flush_waiters).await;
				}
			}
		}

		for waiter in flush_waiters {
			let _ = waiter.send(());
		}
		info!("delivery worker stopped");
	}

	/// Sleeps out the backoff delay. New appends do not cut it short;
	/// an explicit flush or shutdown does. Returns true when shutdown
	/// was requested.
	async fn wait_backoff(
		&mut self,
		delay: Duration,
		flush_waiters: &mut Vec<oneshot::Sender<()>>,
	) -> bool {
		let deadline = Instant::now() + delay;
		loop {
			tokio::select! {
				_ = tokio::time::sleep_until(deadline) => return false,
				command = self.rx.recv() => match command {
					Some(WorkerCommand::Wake) => {}
					Some(WorkerCommand::Flush(waiter)) => {
						flush_waiters.push(waiter);
						return false;
					}
					Some(WorkerCommand::Shutdown) | None => return true,
				},
			}
		}
	}
}

/// Frames a batch as one JSON array body. Payloads are JSON objects
/// produced by the encoder; the store just never needed to know.
pub(crate) fn frame_batch(batch: &[PendingRequest]) -> Vec<u8> {
	let payload_len: usize = batch.iter().map(|e| e.payload.len() + 1).sum();
	let mut body = Vec::with_capacity(payload_len + 1);
	body.push(b'[');
	for (i, entry) in batch.iter().enumerate() {
		if i > 0 {
			body.push(b',');
		}
		body.extend_from_slice(&entry.payload);
	}
	body.push(b']');
	body
}
