// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust client SDK for the Beacon telemetry service.
//!
//! The SDK batches telemetry events and session signals into a durable
//! on-disk spool and delivers them to the ingestion endpoint from a
//! single background worker. Transient failures are retried with
//! exponential backoff; definite rejections are dropped and surfaced
//! through an observer hook. Everything hangs off an explicit client
//! context, no global state.
//!
//! # Example
//!
//! ```ignore
//! use beacon_sdk::{BeaconClient, Event};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BeaconClient::builder()
//!         .app_key("app_key_xxx")
//!         .device_id("device_42")
//!         .base_url("https://telemetry.example.com")
//!         .spool_dir("/var/lib/myapp/beacon")
//!         .build()?;
//!
//!     client.begin_session()?;
//!     client.record_event(
//!         Event::new("purchase")
//!             .with_segment("item", "book")
//!             .with_sum(19.99),
//!     )?;
//!     client.end_session()?;
//!
//!     client.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod backoff;
mod client;
mod crash;
mod error;
mod observer;
mod session;
mod transport;
mod worker;

pub use backoff::BackoffConfig;
pub use client::{BeaconClient, BeaconClientBuilder};
pub use crash::{CrashReporter, NoOpCrashReporter};
pub use error::{Result, SdkError};
pub use observer::{DeliveryObserver, NoOpObserver};
pub use session::{SessionConfig, SessionTracker};
pub use transport::{HttpTransport, SendOutcome, Transport};
pub use worker::{DeliveryWorker, WorkerCommand, WorkerConfig};

// Re-export core types for convenience
pub use beacon_core::{Event, SegmentValue, Segmentation, Session, SessionId};
pub use beacon_spool::{ByteStore, DirStore, MemoryStore, QueueConfig};
