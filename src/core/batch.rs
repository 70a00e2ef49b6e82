// src/core/batch.rs

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::core::error::ValidationError;
use crate::core::fanout::FanoutExecutor;
use crate::core::invoker::ProbeInvoker;
use crate::core::models::{BatchReport, TargetReport};
use crate::core::registry::ProbeRegistry;

/// Hard upper bound on targets per batch.
pub const MAX_BATCH_SIZE: usize = 5;

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BatchPhase {
    Received,
    Validated,
    Executing,
    Completed,
    Rejected,
}

/// A batch request as submitted by a caller.
///
/// `domains` is accepted as an alias of `targets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchRequest {
    #[serde(default, alias = "domains")]
    pub targets: Vec<String>,
}

impl BatchRequest {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { targets: targets.into_iter().map(Into::into).collect() }
    }

    /// Parses a raw JSON body. Anything that does not carry a list of strings is
    /// treated as a request with no targets.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            debug!(error = %e, "Unparseable batch body, treating as empty.");
            Self::default()
        })
    }

    /// Enforces the batch bounds on the list as submitted and returns the targets
    /// unchanged. Whitespace-only entries are rejected rather than dropped.
    pub fn validate(&self) -> Result<Vec<String>, ValidationError> {
        match self.targets.len() {
            0 => return Err(ValidationError::NoTargets),
            count if count > MAX_BATCH_SIZE => return Err(ValidationError::TooManyTargets { count }),
            _ => {}
        }
        if let Some(index) = self.targets.iter().position(|target| target.trim().is_empty()) {
            return Err(ValidationError::BlankTarget { position: index + 1 });
        }
        Ok(self.targets.clone())
    }
}

/// Validates batch requests and fans every accepted target out concurrently.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    executor: FanoutExecutor,
}

impl BatchOrchestrator {
    pub fn new(registry: ProbeRegistry, invoker: ProbeInvoker) -> Self {
        Self { executor: FanoutExecutor::new(Arc::new(registry), invoker) }
    }

    /// Runs a batch. The only error is a rejected request; once validation passes
    /// every target gets a structurally complete report, in input order.
    pub async fn run_batch(&self, request: &BatchRequest) -> Result<BatchReport, ValidationError> {
        debug!(phase = %BatchPhase::Received, submitted = request.targets.len(), "Batch received.");

        let targets = request.validate().inspect_err(|e| {
            warn!(phase = %BatchPhase::Rejected, error = %e, "Batch rejected.");
        })?;
        info!(phase = %BatchPhase::Validated, targets = targets.len(), "Batch validated.");

        info!(phase = %BatchPhase::Executing, "Executing batch.");
        let handles = targets.iter().cloned().map(|target| {
            let executor = self.executor.clone();
            tokio::spawn(async move { executor.run(&target).await })
        });
        let joined = join_all(handles).await;

        let results = targets
            .into_iter()
            .zip(joined)
            .map(|(target, joined)| {
                joined.unwrap_or_else(|e| {
                    error!(target = %target, error = %e, "Target pipeline did not complete.");
                    TargetReport::degraded(target, self.executor.kinds(), e.to_string())
                })
            })
            .collect::<Vec<_>>();

        info!(phase = %BatchPhase::Completed, targets = results.len(), "Batch completed.");
        Ok(BatchReport { results })
    }

    pub async fn run_targets<I, S>(&self, targets: I) -> Result<BatchReport, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_batch(&BatchRequest::new(targets)).await
    }

    pub async fn run_json(&self, raw: &str) -> Result<BatchReport, ValidationError> {
        self.run_batch(&BatchRequest::from_json(raw)).await
    }
}
