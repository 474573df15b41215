// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The Beacon client: explicit context object owning the queue, the
//! delivery worker, and the session tracker.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon_core::{encode, ClientIds, Event, RequestBody, SdkMetadata};
use beacon_spool::{ByteStore, DirStore, MemoryStore, QueueConfig, SpoolQueue};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::crash::{CrashReporter, NoOpCrashReporter};
use crate::error::{Result, SdkError};
use crate::observer::{DeliveryObserver, NoOpObserver};
use crate::session::{SessionConfig, SessionTracker};
use crate::transport::{HttpTransport, Transport};
use crate::worker::{DeliveryWorker, WorkerCommand, WorkerConfig};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Builder for constructing a [`BeaconClient`].
pub struct BeaconClientBuilder {
	app_key: Option<String>,
	device_id: Option<String>,
	base_url: Option<String>,
	sdk: SdkMetadata,
	queue_config: QueueConfig,
	worker_config: WorkerConfig,
	session_config: SessionConfig,
	spool_dir: Option<PathBuf>,
	store: Option<Box<dyn ByteStore>>,
	transport: Option<Arc<dyn Transport>>,
	observer: Arc<dyn DeliveryObserver>,
	crash_reporter: Option<Box<dyn CrashReporter>>,
	crash_dump_dir: Option<PathBuf>,
}

impl BeaconClientBuilder {
	pub fn new() -> Self {
		Self {
			app_key: None,
			device_id: None,
			base_url: None,
			sdk: SdkMetadata::default(),
			queue_config: QueueConfig::default(),
			worker_config: WorkerConfig::default(),
			session_config: SessionConfig::default(),
			spool_dir: None,
			store: None,
			transport: None,
			observer: Arc::new(NoOpObserver),
			crash_reporter: None,
			crash_dump_dir: None,
		}
	}

	/// Sets the application key issued by the server. Required.
	pub fn app_key(mut self, key: impl Into<String>) -> Self {
		self.app_key = Some(key.into());
		self
	}

	/// Sets the device identifier. Required.
	pub fn device_id(mut self, id: impl Into<String>) -> Self {
		self.device_id = Some(id.into());
		self
	}

	/// Sets the server base URL, e.g. `https://telemetry.example.com`.
	/// Required unless a custom transport is provided.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	/// Spools pending requests under this directory so they survive
	/// restarts. Without it (or a custom store) the queue is in-memory
	/// only.
	pub fn spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.spool_dir = Some(dir.into());
		self
	}

	/// Replaces the byte store backing the queue.
	pub fn store(mut self, store: Box<dyn ByteStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Replaces the network transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Installs a delivery observer.
	pub fn observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
		self.observer = observer;
		self
	}

	/// Installs a native crash-reporter binding. `dump_dir` is where
	/// the binding writes its crash dumps.
	pub fn crash_reporter(
		mut self,
		reporter: Box<dyn CrashReporter>,
		dump_dir: impl Into<PathBuf>,
	) -> Self {
		self.crash_reporter = Some(reporter);
		self.crash_dump_dir = Some(dump_dir.into());
		self
	}

	/// Maximum number of spooled requests before the oldest are
	/// evicted.
	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.queue_config.capacity = capacity;
		self
	}

	/// Overrides the delivery worker settings.
	pub fn worker_config(mut self, config: WorkerConfig) -> Self {
		self.worker_config = config;
		self
	}

	/// Minimum interval between session heartbeats.
	pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
		self.session_config.heartbeat_interval = interval;
		self
	}

	/// Builds the client and spawns its delivery worker. Must be
	/// called within a tokio runtime.
	pub fn build(self) -> Result<BeaconClient> {
		let app_key = self
			.app_key
			.ok_or_else(|| SdkError::Config("app key is required".to_string()))?;
		let device_id = self
			.device_id
			.ok_or_else(|| SdkError::Config("device id is required".to_string()))?;
		let ids = ClientIds::new(app_key, device_id);

		let transport: Arc<dyn Transport> = match (self.transport, self.base_url) {
			(Some(transport), _) => transport,
			(None, Some(base_url)) => {
				let endpoint = format!("{}/i", base_url.trim_end_matches('/'));
				Arc::new(HttpTransport::new(endpoint)?)
			}
			(None, None) => {
				return Err(SdkError::Config(
					"base URL or custom transport is required".to_string(),
				))
			}
		};

		let store: Box<dyn ByteStore> = match (self.store, self.spool_dir) {
			(Some(store), _) => store,
			(None, Some(dir)) => Box::new(
				DirStore::open(dir).map_err(|e| SdkError::Storage(e.into()))?,
			),
			(None, None) => Box::new(MemoryStore::new()),
		};
		let queue = Arc::new(SpoolQueue::open(store, self.queue_config)?);

		let (crash, crash_available) = match self.crash_reporter {
			Some(reporter) => {
				let dump_dir = self
					.crash_dump_dir
					.unwrap_or_else(|| std::env::temp_dir().join("beacon-dumps"));
				let available = reporter.initialize(&dump_dir);
				info!(available, dump_dir = %dump_dir.display(), "crash reporter initialized");
				(reporter, available)
			}
			None => (Box::new(NoOpCrashReporter) as Box<dyn CrashReporter>, false),
		};

		let shutdown_timeout = self.worker_config.shutdown_timeout;
		let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
		let worker = DeliveryWorker::new(
			Arc::clone(&queue),
			transport,
			Arc::clone(&self.observer),
			self.worker_config,
			rx,
		);
		let handle = tokio::spawn(worker.run());

		Ok(BeaconClient {
			ids,
			sdk: self.sdk,
			queue,
			sessions: SessionTracker::new(self.session_config),
			observer: self.observer,
			tx,
			worker: Mutex::new(Some(handle)),
			shutdown_timeout,
			shutdown: AtomicBool::new(false),
			crash,
			crash_available,
		})
	}
}

impl Default for BeaconClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Client context for one telemetry endpoint.
///
/// Append-side methods are synchronous fire-and-forget: they validate,
/// encode, persist to the spool, and wake the worker. Only `flush` and
/// `shutdown` suspend.
pub struct BeaconClient {
	ids: ClientIds,
	sdk: SdkMetadata,
	queue: Arc<SpoolQueue<Box<dyn ByteStore>>>,
	sessions: SessionTracker,
	observer: Arc<dyn DeliveryObserver>,
	tx: mpsc::Sender<WorkerCommand>,
	worker: Mutex<Option<JoinHandle<()>>>,
	shutdown_timeout: Duration,
	shutdown: AtomicBool,
	crash: Box<dyn CrashReporter>,
	crash_available: bool,
}

impl BeaconClient {
	/// Starts building a client.
	pub fn builder() -> BeaconClientBuilder {
		BeaconClientBuilder::new()
	}

	/// Records a telemetry event. Malformed events are rejected here,
	/// before anything reaches the queue.
	pub fn record_event(&self, event: Event) -> Result<()> {
		event.validate()?;
		self.enqueue(&RequestBody::Events(std::slice::from_ref(&event)))
	}

	/// Begins a session. Fails if one is already active.
	pub fn begin_session(&self) -> Result<()> {
		let body = self.sessions.begin()?;
		self.enqueue(&body)
	}

	/// Sends a session heartbeat if the heartbeat interval elapsed.
	/// A no-op otherwise, and outside an active session.
	pub fn update_session(&self) -> Result<()> {
		match self.sessions.update() {
			Some(body) => self.enqueue(&body),
			None => Ok(()),
		}
	}

	/// Ends the active session. With no active session this logs a
	/// warning and succeeds without enqueueing anything.
	pub fn end_session(&self) -> Result<()> {
		match self.sessions.end() {
			Some(body) => self.enqueue(&body),
			None => Ok(()),
		}
	}

	/// True while a session is active.
	pub fn session_active(&self) -> bool {
		self.sessions.is_active()
	}

	/// Number of requests waiting for delivery.
	pub fn pending_requests(&self) -> usize {
		self.queue.len()
	}

	/// Asks the worker to drain now; resolves once the queue is empty
	/// or a delivery attempt has failed.
	pub async fn flush(&self) -> Result<()> {
		if self.shutdown.load(Ordering::SeqCst) {
			return Err(SdkError::ClientShutdown);
		}
		let (done_tx, done_rx) = oneshot::channel();
		self
			.tx
			.send(WorkerCommand::Flush(done_tx))
			.await
			.map_err(|_| SdkError::ClientShutdown)?;
		done_rx.await.map_err(|_| SdkError::ClientShutdown)
	}

	/// Shuts down: ends any active session, lets the worker drain
	/// best-effort within the shutdown timeout, then stops it.
	/// Idempotent.
	pub async fn shutdown(&self) -> Result<()> {
		if self.shutdown.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		if self.sessions.is_active() {
			if let Some(body) = self.sessions.end() {
				if let Err(e) = self.append_encoded(&body) {
					warn!(error = %e, "failed to spool session end during shutdown");
				}
			}
		}

		let _ = self.tx.send(WorkerCommand::Shutdown).await;

		let handle = self.worker.lock().unwrap().take();
		if let Some(mut handle) = handle {
			match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
				Ok(_) => {}
				Err(_) => {
					warn!("delivery worker did not drain in time, aborting");
					handle.abort();
				}
			}
		}
		Ok(())
	}

	/// True when a native crash reporter is bound and initialized.
	pub fn crash_reporting_available(&self) -> bool {
		self.crash_available
	}

	/// Forwards a crash to the native reporter, if one is available.
	pub fn report_crash(&self) {
		if self.crash_available {
			self.crash.report_crash();
		} else {
			debug!("crash report requested but no reporter is available");
		}
	}

	fn enqueue(&self, body: &RequestBody<'_>) -> Result<()> {
		if self.shutdown.load(Ordering::SeqCst) {
			return Err(SdkError::ClientShutdown);
		}
		self.append_encoded(body)?;
		// A full command channel is fine; the worker will see the
		// entry on its next tick or flush.
		let _ = self.tx.try_send(WorkerCommand::Wake);
		Ok(())
	}

	fn append_encoded(&self, body: &RequestBody<'_>) -> Result<()> {
		let bytes = encode(body, &self.ids, &self.sdk)?;
		let appended = self.queue.append(&bytes)?;
		if appended.first_overflow {
			warn!(evicted = appended.evicted, "queue over capacity, evicted oldest requests");
			self.observer.on_overflow(appended.evicted);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::SendOutcome;
	use std::collections::VecDeque;
	use std::sync::Mutex as StdMutex;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	struct ScriptedTransport {
		script: StdMutex<VecDeque<SendOutcome>>,
		calls: StdMutex<usize>,
	}

	impl ScriptedTransport {
		fn new(script: Vec<SendOutcome>) -> Arc<Self> {
			Arc::new(Self {
				script: StdMutex::new(script.into()),
				calls: StdMutex::new(0),
			})
		}

		fn calls(&self) -> usize {
			*self.calls.lock().unwrap()
		}
	}

	#[async_trait::async_trait]
	impl crate::transport::Transport for ScriptedTransport {
		async fn send(&self, _body: &[u8], _timeout: Duration) -> SendOutcome {
			*self.calls.lock().unwrap() += 1;
			self
				.script
				.lock()
				.unwrap()
				.pop_front()
				.unwrap_or(SendOutcome::Success)
		}
	}

	#[derive(Default)]
	struct CountingObserver {
		rejected: StdMutex<Vec<(u64, u16)>>,
		overflows: StdMutex<Vec<usize>>,
	}

	impl DeliveryObserver for CountingObserver {
		fn on_rejected(&self, seq: u64, status: u16) {
			self.rejected.lock().unwrap().push((seq, status));
		}

		fn on_overflow(&self, evicted: usize) {
			self.overflows.lock().unwrap().push(evicted);
		}
	}

	fn quiet_worker_config() -> WorkerConfig {
		WorkerConfig {
			tick: Duration::from_secs(60),
			backoff: crate::backoff::BackoffConfig {
				base: Duration::from_secs(60),
				cap: Duration::from_secs(60),
			},
			..WorkerConfig::default()
		}
	}

	#[tokio::test]
	async fn build_requires_identifiers() {
		let result = BeaconClient::builder()
			.base_url("http://localhost:1")
			.build();
		assert!(matches!(result, Err(SdkError::Config(_))));

		let result = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.build();
		assert!(matches!(result, Err(SdkError::Config(_))));
	}

	#[tokio::test]
	async fn record_event_rejects_invalid_input_before_enqueue() {
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(ScriptedTransport::new(vec![]))
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		let result = client.record_event(Event::new("bad").with_count(0));
		assert!(matches!(result, Err(SdkError::Core(_))));
		assert_eq!(client.pending_requests(), 0);

		client.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn end_session_without_active_session_is_silent() {
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(ScriptedTransport::new(vec![]))
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		client.end_session().unwrap();
		assert_eq!(client.pending_requests(), 0);

		client.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn rejected_batch_reports_each_request_once() {
		let transport = ScriptedTransport::new(vec![SendOutcome::ClientError { status: 400 }]);
		let observer = Arc::new(CountingObserver::default());
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(transport.clone())
			.observer(observer.clone())
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		client.record_event(Event::new("one")).unwrap();
		client.record_event(Event::new("two")).unwrap();
		client.flush().await.unwrap();

		assert_eq!(client.pending_requests(), 0);
		assert_eq!(transport.calls(), 1);
		let rejected = observer.rejected.lock().unwrap().clone();
		assert_eq!(rejected.len(), 2);
		assert!(rejected.iter().all(|(_, status)| *status == 400));

		client.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn offline_overflow_reports_once_then_delivers_remainder() {
		let transport = ScriptedTransport::new(vec![SendOutcome::Transient {
			reason: "offline".to_string(),
		}]);
		let observer = Arc::new(CountingObserver::default());
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(transport.clone())
			.observer(observer.clone())
			.queue_capacity(5)
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		for i in 0..8 {
			client
				.record_event(Event::new(format!("event_{i}")))
				.unwrap();
		}
		assert_eq!(client.pending_requests(), 5);
		assert_eq!(observer.overflows.lock().unwrap().len(), 1);

		// First flush hits the offline transport, second drains.
		client.flush().await.unwrap();
		client.flush().await.unwrap();
		assert_eq!(client.pending_requests(), 0);

		client.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn events_roundtrip_through_http_transport() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/i"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;

		let client = BeaconClient::builder()
			.app_key("app_key_1")
			.device_id("device_42")
			.base_url(server.uri())
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		client
			.record_event(
				Event::new("purchase")
					.with_segment("item", "book")
					.with_count(2)
					.with_sum(19.99),
			)
			.unwrap();
		client.flush().await.unwrap();
		assert_eq!(client.pending_requests(), 0);

		let requests = server.received_requests().await.unwrap();
		assert_eq!(requests.len(), 1);
		let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
		let batch = body.as_array().unwrap();
		assert_eq!(batch.len(), 1);
		assert_eq!(batch[0]["app_key"], "app_key_1");
		assert_eq!(batch[0]["device_id"], "device_42");
		let event = &batch[0]["events"][0];
		assert_eq!(event["key"], "purchase");
		assert_eq!(event["count"], 2);
		assert_eq!(event["sum"], 19.99);
		assert_eq!(event["segmentation"]["item"], "book");

		client.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn session_lifecycle_reaches_the_server() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/i"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;

		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.base_url(server.uri())
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		client.begin_session().unwrap();
		assert!(client.session_active());
		client.end_session().unwrap();
		client.flush().await.unwrap();

		let requests = server.received_requests().await.unwrap();
		let bodies: Vec<serde_json::Value> = requests
			.iter()
			.flat_map(|r| {
				serde_json::from_slice::<serde_json::Value>(&r.body)
					.unwrap()
					.as_array()
					.unwrap()
					.clone()
			})
			.collect();
		assert_eq!(bodies.len(), 2);
		assert_eq!(bodies[0]["begin_session"], 1);
		assert_eq!(bodies[1]["end_session"], 1);
		assert!(bodies[1]["session_duration"].is_number());

		client.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn shutdown_is_idempotent_and_blocks_new_events() {
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(ScriptedTransport::new(vec![]))
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		client.shutdown().await.unwrap();
		client.shutdown().await.unwrap();

		let result = client.record_event(Event::new("late"));
		assert!(matches!(result, Err(SdkError::ClientShutdown)));
	}

	#[tokio::test]
	async fn shutdown_ends_the_active_session() {
		let transport = ScriptedTransport::new(vec![]);
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(transport.clone())
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		client.begin_session().unwrap();
		client.shutdown().await.unwrap();

		assert!(!client.session_active());
		// Begin + end both reached the transport during the drain.
		assert_eq!(client.pending_requests(), 0);
	}

	#[tokio::test]
	async fn spooled_events_survive_restart() {
		let dir = tempfile::tempdir().unwrap();
		let offline = ScriptedTransport::new(vec![
			SendOutcome::Transient {
				reason: "offline".to_string(),
			};
			4
		]);

		{
			let client = BeaconClient::builder()
				.app_key("k")
				.device_id("d")
				.transport(offline)
				.spool_dir(dir.path())
				.worker_config(quiet_worker_config())
				.build()
				.unwrap();
			client.record_event(Event::new("before_restart")).unwrap();
			client.flush().await.unwrap();
			client.shutdown().await.unwrap();
		}

		let transport = ScriptedTransport::new(vec![]);
		let client = BeaconClient::builder()
			.app_key("k")
			.device_id("d")
			.transport(transport)
			.spool_dir(dir.path())
			.worker_config(quiet_worker_config())
			.build()
			.unwrap();

		assert_eq!(client.pending_requests(), 1);
		client.flush().await.unwrap();
		assert_eq!(client.pending_requests(), 0);

		client.shutdown().await.unwrap();
	}
}
