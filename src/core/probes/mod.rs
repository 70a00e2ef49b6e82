// src/core/probes/mod.rs

//! The concrete probe units and the wiring that registers them by kind.

pub mod dns_probe;
pub mod fingerprint_probe;
pub mod headers_probe;
pub mod ssl_probe;
pub mod status_probe;
pub mod wordpress_probe;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error};

use crate::core::error::ProbeError;
use crate::core::invoker::Probe;
use crate::core::models::ProbeKind;
use crate::core::registry::ProbeRegistry;

use self::dns_probe::DnsProbe;
use self::fingerprint_probe::FingerprintProbe;
use self::headers_probe::HeadersProbe;
use self::ssl_probe::SslProbe;
use self::status_probe::StatusProbe;
use self::wordpress_probe::WordPressProbe;

/// Settings the built-in probes need from the outside.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub user_agent: String,
    /// Timeout each HTTP-based probe applies to its own requests.
    pub request_timeout: Duration,
}

/// Builds a registry holding the built-in probe for each of `kinds`, in order.
///
/// The HTTP-based probes share one pooled client.
pub fn build_registry(kinds: &[ProbeKind], settings: &ProbeSettings) -> Result<ProbeRegistry, ProbeError> {
    let client = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to build HTTP client.");
            ProbeError::Http(e)
        })?;

    let registry = kinds.iter().fold(ProbeRegistry::new(), |registry, &kind| {
        debug!(probe = %kind, "Registering probe.");
        let probe: Arc<dyn Probe> = match kind {
            ProbeKind::Ssl => Arc::new(SslProbe),
            ProbeKind::Dns => Arc::new(DnsProbe::new()),
            ProbeKind::Status => Arc::new(StatusProbe::new(client.clone())),
            ProbeKind::Headers => Arc::new(HeadersProbe::new(client.clone())),
            ProbeKind::Tech => Arc::new(FingerprintProbe::new(client.clone())),
            ProbeKind::Wordpress => Arc::new(WordPressProbe::new(client.clone())),
        };
        registry.register_shared(kind, probe)
    });
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProbeSettings {
        ProbeSettings { user_agent: "hostscope-test".into(), request_timeout: Duration::from_secs(5) }
    }

    #[tokio::test]
    async fn registry_follows_requested_kinds() {
        let kinds = [ProbeKind::Tech, ProbeKind::Ssl, ProbeKind::Dns, ProbeKind::Ssl];
        let registry = build_registry(&kinds, &settings()).unwrap();
        let registered: Vec<_> = registry.kinds().collect();
        assert_eq!(registered, vec![ProbeKind::Tech, ProbeKind::Ssl, ProbeKind::Dns]);
    }

    #[tokio::test]
    async fn defaults_cover_the_wire_contract() {
        let registry = build_registry(&ProbeKind::DEFAULTS, &settings()).unwrap();
        let names: Vec<_> = registry.kinds().map(ProbeKind::name).collect();
        assert_eq!(names, vec!["ssl", "dns", "status"]);
    }
}
