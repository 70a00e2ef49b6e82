// src/core/models.rs

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use url::Url;

// --- Probe Kinds ---

/// The probe kinds known to the orchestrator.
///
/// The lowercase names (`ssl`, `dns`, ...) are the keys of every target entry in a
/// batch report, so renaming a variant is a wire-breaking change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProbeKind {
    Ssl,
    Dns,
    Status,
    Headers,
    Tech,
    Wordpress,
}

/// The shape of input a probe kind consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// A full URL with an HTTP scheme, e.g. `https://example.com`.
    Url,
    /// A bare hostname with any scheme removed, e.g. `example.com`.
    Host,
}

impl ProbeKind {
    /// The probes run when nothing else is configured.
    pub const DEFAULTS: [ProbeKind; 3] = [ProbeKind::Ssl, ProbeKind::Dns, ProbeKind::Status];

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Fixed mapping from probe kind to the input shape it expects.
    pub const fn input_shape(self) -> InputShape {
        match self {
            ProbeKind::Dns => InputShape::Host,
            ProbeKind::Ssl
            | ProbeKind::Status
            | ProbeKind::Headers
            | ProbeKind::Tech
            | ProbeKind::Wordpress => InputShape::Url,
        }
    }
}

// --- Normalized Input ---

/// A target rewritten into the shape one probe kind expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    kind: ProbeKind,
    value: String,
}

impl NormalizedInput {
    pub fn new(kind: ProbeKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The hostname carried by this input, if one can be extracted.
    ///
    /// URL inputs are parsed and their host returned; host inputs are returned
    /// with any trailing path or port removed.
    pub fn host(&self) -> Option<String> {
        match self.kind.input_shape() {
            InputShape::Url => Url::parse(&self.value)
                .ok()
                .and_then(|url| url.host_str().map(String::from)),
            InputShape::Host => self
                .value
                .split(['/', ':', '?', '#'])
                .next()
                .filter(|host| !host.is_empty())
                .map(String::from),
        }
    }

    /// The port written explicitly in a URL input. Default ports and host inputs
    /// yield `None`.
    pub fn port(&self) -> Option<u16> {
        match self.kind.input_shape() {
            InputShape::Url => Url::parse(&self.value).ok().and_then(|url| url.port()),
            InputShape::Host => None,
        }
    }
}

// --- Probe Outcomes ---

/// The result of invoking one probe for one target.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The probe's payload, relayed without inspection.
    Success(Value),
    Failure(String),
}

impl ProbeOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        ProbeOutcome::Failure(message.into())
    }

    /// A failure raised outside of a probe's own isolation boundary.
    pub fn internal_error(message: impl std::fmt::Display) -> Self {
        ProbeOutcome::Failure(format!("internal error: {message}"))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    #[cfg(test)]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ProbeOutcome::Success(payload) => Some(payload),
            ProbeOutcome::Failure(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Success(_) => None,
            ProbeOutcome::Failure(message) => Some(message),
        }
    }
}

/// Successes serialize as the bare payload, failures as `{"error": "<message>"}`.
impl Serialize for ProbeOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProbeOutcome::Success(payload) => payload.serialize(serializer),
            ProbeOutcome::Failure(message) => json!({ "error": message }).serialize(serializer),
        }
    }
}

// --- Reports ---

/// Every probe outcome for a single target.
///
/// Entries keep the registry order of their probe kinds. A `TargetReport` built by
/// the fan-out executor holds exactly one entry per registered kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub domain: String,
    /// Set only when the whole per-target pipeline failed.
    pub error: Option<String>,
    outcomes: Vec<(ProbeKind, ProbeOutcome)>,
}

impl TargetReport {
    pub fn new(domain: impl Into<String>) -> Self {
        Self { domain: domain.into(), error: None, outcomes: Vec::new() }
    }

    /// A report for a target whose pipeline failed as a whole. Every kind is
    /// still present, each carrying the internal error.
    pub fn degraded(
        domain: impl Into<String>,
        kinds: impl IntoIterator<Item = ProbeKind>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let outcomes = kinds
            .into_iter()
            .map(|kind| (kind, ProbeOutcome::internal_error(&message)))
            .collect();
        Self { domain: domain.into(), error: Some(message), outcomes }
    }

    /// Records the outcome for `kind`, replacing an earlier one for the same kind.
    pub fn record(&mut self, kind: ProbeKind, outcome: ProbeOutcome) {
        match self.outcomes.iter_mut().find(|(existing, _)| *existing == kind) {
            Some(slot) => slot.1 = outcome,
            None => self.outcomes.push((kind, outcome)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, kind: ProbeKind) -> Option<&ProbeOutcome> {
        self.outcomes
            .iter()
            .find(|(existing, _)| *existing == kind)
            .map(|(_, outcome)| outcome)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        self.outcomes.iter().map(|(kind, _)| *kind)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (ProbeKind, &ProbeOutcome)> {
        self.outcomes.iter().map(|(kind, outcome)| (*kind, outcome))
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| !outcome.is_success()).count()
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Flattened into `{"domain": ..., ["error": ...,] "<kind>": <outcome>, ...}`.
impl Serialize for TargetReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.error.is_some()) + self.outcomes.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("domain", &self.domain)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        for (kind, outcome) in &self.outcomes {
            map.serialize_entry(kind.name(), outcome)?;
        }
        map.end()
    }
}

/// Per-target reports in the caller's input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<TargetReport>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetReport> {
        self.results.iter()
    }
}

// --- Probe Payload Building Blocks ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// A machine-readable observation a probe attaches to its payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisFinding {
    pub severity: Severity,
    pub code: String,
}

impl AnalysisFinding {
    pub fn new(severity: Severity, code: &str) -> Self {
        Self { severity, code: code.to_string() }
    }
}

/// The state of one auxiliary lookup inside a probe (a DNS record, an HTTP header).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum RecordLookup<T> {
    Found(T),
    Missing,
    Failed(String),
}

impl<T> RecordLookup<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, RecordLookup::Missing)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecordLookup::Failed(_))
    }

    #[cfg(test)]
    pub fn found(&self) -> Option<&T> {
        match self {
            RecordLookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn probe_kind_names_are_stable() {
        assert_eq!(ProbeKind::Ssl.name(), "ssl");
        assert_eq!(ProbeKind::Dns.name(), "dns");
        assert_eq!(ProbeKind::Status.name(), "status");
        assert_eq!(ProbeKind::from_str("HEADERS").unwrap(), ProbeKind::Headers);
        assert!(ProbeKind::from_str("whois").is_err());
    }

    #[test]
    fn host_is_extracted_from_both_shapes() {
        let url = NormalizedInput::new(ProbeKind::Ssl, "https://example.com:8443/path");
        assert_eq!(url.host().as_deref(), Some("example.com"));

        let host = NormalizedInput::new(ProbeKind::Dns, "example.com/index.html");
        assert_eq!(host.host().as_deref(), Some("example.com"));

        let broken = NormalizedInput::new(ProbeKind::Status, "https://");
        assert_eq!(broken.host(), None);
    }

    #[test]
    fn only_explicit_ports_are_reported() {
        assert_eq!(NormalizedInput::new(ProbeKind::Ssl, "https://example.com:8443/a").port(), Some(8443));
        assert_eq!(NormalizedInput::new(ProbeKind::Ssl, "https://example.com").port(), None);
        assert_eq!(NormalizedInput::new(ProbeKind::Ssl, "http://example.com").port(), None);
        assert_eq!(NormalizedInput::new(ProbeKind::Dns, "example.com:53").port(), None);
    }

    #[test]
    fn failure_serializes_as_error_object() {
        let outcome = ProbeOutcome::failure("connection reset");
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({ "error": "connection reset" }));
    }

    #[test]
    fn target_report_serializes_flat_in_record_order() {
        let mut report = TargetReport::new("example.com");
        report.record(ProbeKind::Ssl, ProbeOutcome::Success(json!({ "valid": true })));
        report.record(ProbeKind::Dns, ProbeOutcome::failure("NXDOMAIN"));
        report.record(ProbeKind::Status, ProbeOutcome::Success(json!({ "status": "UP" })));

        let encoded = serde_json::to_string(&report).unwrap();
        assert_eq!(
            encoded,
            r#"{"domain":"example.com","ssl":{"valid":true},"dns":{"error":"NXDOMAIN"},"status":{"status":"UP"}}"#
        );
    }

    #[test]
    fn record_replaces_existing_slot() {
        let mut report = TargetReport::new("example.com");
        report.record(ProbeKind::Ssl, ProbeOutcome::failure("first"));
        report.record(ProbeKind::Ssl, ProbeOutcome::Success(json!({})));
        assert_eq!(report.kinds().count(), 1);
        assert!(report.get(ProbeKind::Ssl).unwrap().is_success());
    }

    #[test]
    fn degraded_report_fills_every_kind() {
        let report = TargetReport::degraded("broken.com", ProbeKind::DEFAULTS, "task aborted");
        assert!(report.is_degraded());
        assert_eq!(report.failed_count(), 3);
        assert_eq!(
            report.get(ProbeKind::Dns).and_then(ProbeOutcome::error_message),
            Some("internal error: task aborted")
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["error"], "task aborted");
        assert_eq!(value["status"]["error"], "internal error: task aborted");
    }

    #[test]
    fn record_lookup_serializes_tagged() {
        let found: RecordLookup<Vec<String>> = RecordLookup::Found(vec!["0 issue \"letsencrypt.org\"".into()]);
        assert_eq!(
            serde_json::to_value(&found).unwrap(),
            json!({ "state": "found", "value": ["0 issue \"letsencrypt.org\""] })
        );
        let missing: RecordLookup<String> = RecordLookup::Missing;
        assert_eq!(serde_json::to_value(&missing).unwrap(), json!({ "state": "missing" }));
    }
}
