// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport collaborator abstracting the network call.

use std::time::Duration;

use tracing::debug;

/// Tri-state result of one transport call. The delivery worker depends
/// on nothing else about the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
	/// 2xx: the batch was accepted.
	Success,
	/// Definite client error (malformed request). Retrying cannot fix
	/// it; the worker drops the batch.
	ClientError { status: u16 },
	/// Network error, timeout, or server-side failure. Expected to
	/// succeed on retry.
	Transient { reason: String },
}

/// Sends one encoded batch body to the ingestion endpoint.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, body: &[u8], timeout: Duration) -> SendOutcome;
}

/// HTTP POST transport over `reqwest`.
pub struct HttpTransport {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpTransport {
	/// Creates a transport posting to `endpoint`.
	pub fn new(endpoint: impl Into<String>) -> crate::Result<Self> {
		let client = reqwest::Client::builder()
			.user_agent(user_agent())
			.build()
			.map_err(|e| crate::SdkError::Config(format!("failed to build HTTP client: {e}")))?;
		Ok(Self {
			client,
			endpoint: endpoint.into(),
		})
	}

	/// The ingestion endpoint URL.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

/// Standard SDK User-Agent, `beacon-rust/{version}`.
pub fn user_agent() -> String {
	format!("beacon-rust/{}", env!("CARGO_PKG_VERSION"))
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn send(&self, body: &[u8], timeout: Duration) -> SendOutcome {
		let result = self
			.client
			.post(&self.endpoint)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.timeout(timeout)
			.body(body.to_vec())
			.send()
			.await;

		let response = match result {
			Ok(response) => response,
			Err(e) => {
				return SendOutcome::Transient {
					reason: e.to_string(),
				}
			}
		};

		let status = response.status();
		debug!(status = status.as_u16(), "transport response");

		if status.is_success() {
			return SendOutcome::Success;
		}

		// 408 and 429 are server/throttling conditions worth retrying;
		// the rest of 4xx means the request itself is bad.
		match status.as_u16() {
			408 | 429 => SendOutcome::Transient {
				reason: format!("status {status}"),
			},
			400..=499 => SendOutcome::ClientError {
				status: status.as_u16(),
			},
			_ => SendOutcome::Transient {
				reason: format!("status {status}"),
			},
		}
	}
}
