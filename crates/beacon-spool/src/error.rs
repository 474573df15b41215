// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the request spool.

use thiserror::Error;

/// Errors raised by the spool and its backing store.
#[derive(Debug, Error)]
pub enum SpoolError {
	/// The underlying byte store is unavailable (disk full, permission
	/// denied). The rejected payload stays with the caller.
	#[error("storage unavailable: {0}")]
	Storage(#[from] std::io::Error),

	/// A durable entry could not be decoded.
	#[error("corrupt spool entry {seq}: {reason}")]
	Corrupt { seq: u64, reason: String },

	/// Serializing an entry for persistence failed.
	#[error("serialization failed: {0}")]
	Serialize(#[from] serde_json::Error),
}

/// Result type alias for spool operations.
pub type Result<T> = std::result::Result<T, SpoolError>;
