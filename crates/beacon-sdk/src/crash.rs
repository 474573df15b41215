// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Optional native crash-reporter capability.
//!
//! Crash capture is delegated to an external reporting library when
//! one is present. The SDK treats it as opaque: it initializes the
//! binding once and forwards crash reports, nothing more. Without a
//! binding the no-op fallback keeps the surface uniform.

use std::path::Path;

/// Binding to a native crash-reporting library.
pub trait CrashReporter: Send + Sync {
	/// Initializes the reporter with its dump directory. Returns true
	/// when crash capture is available.
	fn initialize(&self, dump_dir: &Path) -> bool;

	/// Forwards a crash to the reporting library.
	fn report_crash(&self);
}

/// Fallback used when no native binding is configured. Never
/// available, reports nowhere.
pub struct NoOpCrashReporter;

impl CrashReporter for NoOpCrashReporter {
	fn initialize(&self, _dump_dir: &Path) -> bool {
		false
	}

	fn report_crash(&self) {}
}
