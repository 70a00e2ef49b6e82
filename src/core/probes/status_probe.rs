// src/core/probes/status_probe.rs

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::core::error::ProbeError;
use crate::core::invoker::{Probe, ProbeResponse};
use crate::core::models::NormalizedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Liveness {
    Up,
    Down,
}

impl Liveness {
    /// 2xx and 3xx count as up; anything else means the site answers but is broken.
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() || status.is_redirection() {
            Liveness::Up
        } else {
            Liveness::Down
        }
    }
}

/// Payload of the `status` probe.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusReport {
    pub status: Liveness,
    pub is_up: bool,
    pub status_code: u16,
    pub response_time_ms: u64,
    /// Final URL after redirects.
    pub url: String,
}

impl StatusReport {
    fn new(status_code: StatusCode, response_time_ms: u64, url: String) -> Self {
        let status = Liveness::from_status(status_code);
        Self {
            status,
            is_up: status == Liveness::Up,
            status_code: status_code.as_u16(),
            response_time_ms,
            url,
        }
    }
}

/// Checks whether the target answers over HTTP and how quickly.
///
/// A target that responds with an error status is reported as `DOWN`; only a
/// transport failure makes the probe itself fail.
#[derive(Debug, Clone)]
pub struct StatusProbe {
    client: Client,
}

impl StatusProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for StatusProbe {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
        let url = input.as_str();
        info!(url, "Starting status probe.");

        let started = Instant::now();
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "HTTP request failed for status probe.");
            ProbeError::Http(e)
        })?;
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = StatusReport::new(response.status(), elapsed, response.url().to_string());
        info!(status = %response.status(), elapsed_ms = elapsed, "Status probe finished.");
        ProbeResponse::json(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn liveness_follows_status_class() {
        assert_eq!(Liveness::from_status(StatusCode::OK), Liveness::Up);
        assert_eq!(Liveness::from_status(StatusCode::MOVED_PERMANENTLY), Liveness::Up);
        assert_eq!(Liveness::from_status(StatusCode::NOT_FOUND), Liveness::Down);
        assert_eq!(Liveness::from_status(StatusCode::BAD_GATEWAY), Liveness::Down);
    }

    #[test]
    fn report_serializes_for_consumers() {
        let report = StatusReport::new(StatusCode::SERVICE_UNAVAILABLE, 84, "https://example.com/".into());
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "status": "DOWN",
                "is_up": false,
                "status_code": 503,
                "response_time_ms": 84,
                "url": "https://example.com/"
            })
        );
    }
}
