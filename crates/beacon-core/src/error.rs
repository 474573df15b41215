// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for core validation and encoding.

use thiserror::Error;

/// Errors produced while validating or encoding telemetry records.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Input was malformed and is rejected before it reaches the queue.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// Serialization to the wire shape failed.
	#[error("serialization failed: {0}")]
	Serialize(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
