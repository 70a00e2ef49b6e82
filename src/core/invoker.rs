// src/core/invoker.rs

//! Calls a single probe in-process and turns whatever happens into a `ProbeOutcome`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::core::error::ProbeError;
use crate::core::models::{NormalizedInput, ProbeOutcome};

/// What a probe hands back: a status code plus a structured body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: Value,
}

impl ProbeResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    #[cfg(test)]
    pub fn with_status(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Serializes a typed payload into a `200` response.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, ProbeError> {
        Ok(Self::ok(serde_json::to_value(payload)?))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single diagnostic check.
///
/// Implementations perform their own network I/O and own their retry and timeout
/// semantics. They may fail or even panic; the invoker contains both.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError>;
}

/// Runs probes with an upper bound on how long any one invocation may take.
#[derive(Debug, Clone, Copy)]
pub struct ProbeInvoker {
    timeout: Duration,
}

impl ProbeInvoker {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invokes `probe` for `input`. Never fails: errors, panics, timeouts and
    /// non-2xx responses all come back as `ProbeOutcome::Failure`.
    pub async fn invoke(&self, probe: &dyn Probe, input: &NormalizedInput) -> ProbeOutcome {
        let kind = input.kind();
        debug!(probe = %kind, input = input.as_str(), "Invoking probe.");

        let call = AssertUnwindSafe(probe.probe(input)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Ok(response))) => outcome_from_response(response),
            Ok(Ok(Err(e))) => {
                warn!(probe = %kind, error = %e, "Probe failed.");
                ProbeOutcome::failure(e.to_string())
            }
            Ok(Err(panic)) => {
                let message = panic_message(&*panic);
                error!(probe = %kind, panic = %message, "Probe panicked!");
                ProbeOutcome::failure(format!("probe panicked: {message}"))
            }
            Err(_) => {
                warn!(probe = %kind, timeout = ?self.timeout, "Probe timed out.");
                ProbeOutcome::failure(format!("probe timed out after {:?}", self.timeout))
            }
        }
    }
}

impl Default for ProbeInvoker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

fn outcome_from_response(response: ProbeResponse) -> ProbeOutcome {
    if response.is_success() {
        return ProbeOutcome::Success(response.body);
    }
    let message = response
        .body
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("probe responded with status {}", response.status));
    ProbeOutcome::Failure(message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
