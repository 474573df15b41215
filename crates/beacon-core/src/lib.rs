// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Beacon telemetry SDK.
//!
//! This crate provides the shared vocabulary of the SDK: telemetry
//! events, session records, client identifiers, and the pure request
//! encoder that turns them into transport-ready bytes. It performs no
//! I/O; the delivery side lives in `beacon-sdk`.

pub mod encode;
pub mod error;
pub mod event;
pub mod session;

pub use encode::{encode, ClientIds, RequestBody, SdkMetadata};
pub use error::{CoreError, Result};
pub use event::{Event, SegmentValue, Segmentation};
pub use session::{Session, SessionId};
