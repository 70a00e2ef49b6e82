// src/core/fanout.rs

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::core::invoker::ProbeInvoker;
use crate::core::models::{ProbeKind, ProbeOutcome, TargetReport};
use crate::core::normalizer::normalize;
use crate::core::registry::ProbeRegistry;

/// Runs every registered probe against one target concurrently.
#[derive(Debug, Clone)]
pub struct FanoutExecutor {
    registry: Arc<ProbeRegistry>,
    invoker: ProbeInvoker,
}

impl FanoutExecutor {
    pub fn new(registry: Arc<ProbeRegistry>, invoker: ProbeInvoker) -> Self {
        Self { registry, invoker }
    }

    pub fn kinds(&self) -> Vec<ProbeKind> {
        self.registry.kinds().collect()
    }

    /// Probes `target` with every registered probe and joins all of them.
    ///
    /// The returned report holds one entry per registered kind, in registry order,
    /// whatever the individual probes did. Each probe runs as its own task; if a
    /// task dies outside the invoker its slot records an internal error.
    pub async fn run(&self, target: &str) -> TargetReport {
        if self.registry.is_empty() {
            warn!(target, "Registry is empty, the report will have no entries.");
        }
        info!(target, probes = self.registry.len(), "Starting probe fan-out.");

        let (kinds, handles): (Vec<_>, Vec<_>) = self
            .registry
            .iter()
            .map(|entry| {
                let input = normalize(target, entry.kind);
                let probe = Arc::clone(&entry.probe);
                let invoker = self.invoker;
                let handle =
                    tokio::spawn(async move { invoker.invoke(probe.as_ref(), &input).await });
                (entry.kind, handle)
            })
            .unzip();

        let mut report = TargetReport::new(target);
        for (kind, joined) in kinds.into_iter().zip(join_all(handles).await) {
            let outcome = joined.unwrap_or_else(|e| {
                error!(target, probe = %kind, error = %e, "Probe task did not complete.");
                ProbeOutcome::internal_error(e)
            });
            report.record(kind, outcome);
        }

        info!(target, failed = report.failed_count(), "Probe fan-out finished.");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProbeError;
    use crate::core::invoker::{Probe, ProbeResponse};
    use crate::core::models::NormalizedInput;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes its input back after an optional delay.
    struct Echo(Duration);

    #[async_trait]
    impl Probe for Echo {
        async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
            tokio::time::sleep(self.0).await;
            Ok(ProbeResponse::ok(json!({ "input": input.as_str() })))
        }
    }

    struct Failing;

    #[async_trait]
    impl Probe for Failing {
        async fn probe(&self, _input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
            Err(ProbeError::Connection("operation timed out".into()))
        }
    }

    /// Remembers the order in which probes completed.
    struct Recording {
        name: &'static str,
        delay: Duration,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Probe for Recording {
        async fn probe(&self, _input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
            tokio::time::sleep(self.delay).await;
            self.log.lock().unwrap().push(self.name);
            Ok(ProbeResponse::ok(json!({ "name": self.name })))
        }
    }

    fn executor(registry: ProbeRegistry) -> FanoutExecutor {
        FanoutExecutor::new(Arc::new(registry), ProbeInvoker::default())
    }

    #[tokio::test]
    async fn each_probe_gets_its_normalized_input() {
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Ssl, Echo(Duration::ZERO))
            .register(ProbeKind::Dns, Echo(Duration::ZERO))
            .register(ProbeKind::Status, Echo(Duration::ZERO));

        let report = executor(registry).run("https://example.com").await;

        assert_eq!(report.domain, "https://example.com");
        let input_of = |kind| report.get(kind).and_then(ProbeOutcome::payload).unwrap()["input"].clone();
        assert_eq!(input_of(ProbeKind::Ssl), "https://example.com");
        assert_eq!(input_of(ProbeKind::Dns), "example.com");
        assert_eq!(input_of(ProbeKind::Status), "https://example.com");
    }

    #[tokio::test]
    async fn one_failing_probe_does_not_affect_the_others() {
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Ssl, Failing)
            .register(ProbeKind::Dns, Echo(Duration::from_millis(20)))
            .register(ProbeKind::Status, Echo(Duration::from_millis(10)));

        let report = executor(registry).run("slow.com").await;

        assert_eq!(
            report.get(ProbeKind::Ssl).and_then(ProbeOutcome::error_message),
            Some("TCP Connection Error: operation timed out")
        );
        assert!(report.get(ProbeKind::Dns).unwrap().is_success());
        assert!(report.get(ProbeKind::Status).unwrap().is_success());
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn every_kind_is_present_when_all_fail() {
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Ssl, Failing)
            .register(ProbeKind::Dns, Failing)
            .register(ProbeKind::Status, Failing);

        let report = executor(registry).run("down.example").await;

        let kinds: Vec<_> = report.kinds().collect();
        assert_eq!(kinds, ProbeKind::DEFAULTS.to_vec());
        assert_eq!(report.failed_count(), 3);
    }

    #[tokio::test]
    async fn report_order_follows_registry_not_completion() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Ssl, Recording { name: "ssl", delay: Duration::from_millis(60), log: log.clone() })
            .register(ProbeKind::Dns, Recording { name: "dns", delay: Duration::from_millis(30), log: log.clone() })
            .register(ProbeKind::Status, Recording { name: "status", delay: Duration::ZERO, log: log.clone() });

        let report = executor(registry).run("example.com").await;

        assert_eq!(*log.lock().unwrap(), vec!["status", "dns", "ssl"]);
        let kinds: Vec<_> = report.kinds().collect();
        assert_eq!(kinds, vec![ProbeKind::Ssl, ProbeKind::Dns, ProbeKind::Status]);
    }

    #[tokio::test]
    async fn empty_registry_gives_an_empty_report() {
        let report = executor(ProbeRegistry::new()).run("example.com").await;

        assert_eq!(report.kinds().count(), 0);
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn probes_run_concurrently() {
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Ssl, Echo(Duration::from_millis(200)))
            .register(ProbeKind::Dns, Echo(Duration::from_millis(200)))
            .register(ProbeKind::Status, Echo(Duration::from_millis(200)));

        let started = std::time::Instant::now();
        let report = executor(registry).run("example.com").await;

        assert_eq!(report.failed_count(), 0);
        assert!(started.elapsed() < Duration::from_millis(550));
    }
}
