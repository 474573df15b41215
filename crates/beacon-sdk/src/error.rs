// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the Beacon client SDK.

use thiserror::Error;

/// Errors surfaced to SDK callers.
///
/// Delivery-side failures (transient network errors, rejected batches,
/// overflow evictions) never appear here; the worker handles them
/// internally and surfaces drops through the
/// [`DeliveryObserver`](crate::DeliveryObserver).
#[derive(Debug, Error)]
pub enum SdkError {
	/// The client was misconfigured at build time.
	#[error("configuration error: {0}")]
	Config(String),

	/// Malformed event or session data, rejected before enqueue.
	#[error(transparent)]
	Core(#[from] beacon_core::CoreError),

	/// The durable spool rejected the append. The payload stays with
	/// the caller for a later retry.
	#[error(transparent)]
	Storage(#[from] beacon_spool::SpoolError),

	/// The client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
