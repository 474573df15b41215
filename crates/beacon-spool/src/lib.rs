// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable request spool for the Beacon telemetry SDK.
//!
//! Encoded requests are appended to an ordered, persistent queue and
//! drained by the delivery worker. Entries survive process restarts
//! until they are explicitly acknowledged. The queue itself is
//! storage-agnostic: durability comes from a [`ByteStore`]
//! collaborator, of which [`DirStore`] (one file per entry) and
//! [`MemoryStore`] (tests, ephemeral mode) are provided.

mod error;
mod queue;
mod store;

pub use error::{Result, SpoolError};
pub use queue::{Appended, PendingRequest, QueueConfig, SpoolQueue};
pub use store::{ByteStore, DirStore, MemoryStore};
