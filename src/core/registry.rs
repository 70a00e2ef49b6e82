// src/core/registry.rs

use std::fmt;
use std::sync::Arc;

use crate::core::invoker::Probe;
use crate::core::models::ProbeKind;

/// A probe registered under the kind name it reports as.
#[derive(Clone)]
pub struct RegisteredProbe {
    pub kind: ProbeKind,
    pub probe: Arc<dyn Probe>,
}

impl fmt::Debug for RegisteredProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProbe").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// The ordered set of probes run against every target.
///
/// Each kind appears at most once. Registration order is the order entries appear
/// in every `TargetReport`.
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    entries: Vec<RegisteredProbe>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `probe` under `kind`. Registering a kind twice replaces the earlier
    /// probe but keeps its original position.
    #[cfg(test)]
    pub fn register(self, kind: ProbeKind, probe: impl Probe + 'static) -> Self {
        self.register_shared(kind, Arc::new(probe))
    }

    /// Same as `register`, for probes that are already shared.
    pub fn register_shared(mut self, kind: ProbeKind, probe: Arc<dyn Probe>) -> Self {
        match self.entries.iter_mut().find(|entry| entry.kind == kind) {
            Some(entry) => entry.probe = probe,
            None => self.entries.push(RegisteredProbe { kind, probe }),
        }
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        self.entries.iter().map(|entry| entry.kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegisteredProbe> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProbeError;
    use crate::core::invoker::ProbeResponse;
    use crate::core::models::NormalizedInput;
    use async_trait::async_trait;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait]
    impl Probe for Named {
        async fn probe(&self, _input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
            Ok(ProbeResponse::ok(json!({ "name": self.0 })))
        }
    }

    #[test]
    fn keeps_registration_order() {
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Status, Named("status"))
            .register(ProbeKind::Ssl, Named("ssl"))
            .register(ProbeKind::Dns, Named("dns"));
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, vec![ProbeKind::Status, ProbeKind::Ssl, ProbeKind::Dns]);
    }

    #[tokio::test]
    async fn re_registering_replaces_in_place() {
        let registry = ProbeRegistry::new()
            .register(ProbeKind::Ssl, Named("first"))
            .register(ProbeKind::Dns, Named("dns"))
            .register(ProbeKind::Ssl, Named("second"));
        assert_eq!(registry.len(), 2);

        let entry = registry.iter().next().unwrap();
        assert_eq!(entry.kind, ProbeKind::Ssl);
        let input = NormalizedInput::new(ProbeKind::Ssl, "https://example.com");
        let response = entry.probe.probe(&input).await.unwrap();
        assert_eq!(response.body["name"], "second");
    }
}
