// src/core/probes/dns_probe.rs

use async_trait::async_trait;
use futures::future::join_all;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::ProbeError;
use crate::core::invoker::{Probe, ProbeResponse};
use crate::core::models::{AnalysisFinding, NormalizedInput, RecordLookup, Severity};

/// A list of common DKIM selectors to check for when a specific one is not known.
const COMMON_DKIM_SELECTORS: &[&str] = &["google", "selector1", "selector2", "default", "dkim"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpfData {
    pub record: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DmarcData {
    pub record: String,
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DkimRecord {
    pub selector: String,
    pub record: String,
}

/// Payload of the `dns` probe.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DnsReport {
    pub addresses: RecordLookup<Vec<String>>,
    pub mx: RecordLookup<Vec<MxRecord>>,
    pub ns: RecordLookup<Vec<String>>,
    pub txt: RecordLookup<Vec<String>>,
    pub spf: RecordLookup<SpfData>,
    pub dmarc: RecordLookup<DmarcData>,
    pub dkim: RecordLookup<Vec<DkimRecord>>,
    pub caa: RecordLookup<Vec<String>>,
    pub analysis: Vec<AnalysisFinding>,
}

impl DnsReport {
    /// True when every lookup failed outright, which points at the resolver rather
    /// than at the domain's configuration.
    fn all_failed(&self) -> bool {
        self.addresses.is_failed()
            && self.mx.is_failed()
            && self.ns.is_failed()
            && self.txt.is_failed()
            && self.caa.is_failed()
    }
}

/// Resolves the common record types for a host and checks its mail-auth setup.
#[derive(Clone)]
pub struct DnsProbe {
    resolver: TokioAsyncResolver,
}

impl DnsProbe {
    pub fn new() -> Self {
        Self::with_resolver(TokioAsyncResolver::tokio(
            ResolverConfig::default(),
            ResolverOpts::default(),
        ))
    }

    pub fn with_resolver(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

impl Default for DnsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for DnsProbe {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
        let host = input
            .host()
            .ok_or_else(|| ProbeError::InvalidTarget(input.as_str().to_string()))?;
        // Mail-auth records live on the registrable domain, not on `www.`.
        let root = host.strip_prefix("www.").unwrap_or(&host);
        info!(target = %host, root = %root, "Starting DNS probe.");

        let resolver = &self.resolver;
        let (addresses, mx, ns, txt, caa, dmarc, dkim) = tokio::join!(
            lookup_addresses(resolver, &host),
            lookup_mx(resolver, root),
            lookup_ns(resolver, root),
            lookup_txt(resolver, root),
            lookup_caa(resolver, root),
            lookup_dmarc(resolver, root),
            lookup_dkim(resolver, root),
        );
        debug!("All DNS lookups completed, starting analysis.");
        let addresses = addresses?;

        let spf = spf_from_txt(&txt);
        let mut report = DnsReport { addresses, mx, ns, txt, spf, dmarc, dkim, caa, analysis: Vec::new() };
        if report.all_failed() {
            if let RecordLookup::Failed(reason) = &report.addresses {
                return Err(ProbeError::Dns(reason.clone()));
            }
        }

        report.analysis = analyze_dns_report(&report);
        info!(findings = report.analysis.len(), "DNS probe finished.");
        ProbeResponse::json(&report)
    }
}

/// Maps a resolver answer onto a `RecordLookup`, treating "no records" as missing.
fn classify<T>(target: &str, result: Result<Vec<T>, ResolveError>) -> RecordLookup<Vec<T>> {
    match result {
        Ok(records) if records.is_empty() => RecordLookup::Missing,
        Ok(records) => RecordLookup::Found(records),
        Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
            debug!(target, "No records found.");
            RecordLookup::Missing
        }
        Err(e) => {
            warn!(target, error = %e, "DNS lookup failed.");
            RecordLookup::Failed(e.to_string())
        }
    }
}

/// The response code of a "no records" answer, if that is what `error` is.
fn no_records_code(error: &ResolveError) -> Option<ResponseCode> {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(*response_code),
        _ => None,
    }
}

/// An NXDOMAIN answer for the host itself means there is nothing to inspect.
fn ensure_exists(host: &str, code: Option<ResponseCode>) -> Result<(), ProbeError> {
    match code {
        Some(ResponseCode::NXDomain) => {
            warn!(target = host, "Domain does not exist.");
            Err(ProbeError::Dns(format!("{host} does not exist (NXDOMAIN)")))
        }
        _ => Ok(()),
    }
}

async fn lookup_addresses(
    resolver: &TokioAsyncResolver,
    host: &str,
) -> Result<RecordLookup<Vec<String>>, ProbeError> {
    debug!(target = host, "Looking up A/AAAA records.");
    let result = resolver
        .lookup_ip(host)
        .await
        .map(|lookup| lookup.iter().map(|ip| ip.to_string()).collect());
    if let Err(e) = &result {
        ensure_exists(host, no_records_code(e))?;
    }
    Ok(classify(host, result))
}

async fn lookup_mx(resolver: &TokioAsyncResolver, target: &str) -> RecordLookup<Vec<MxRecord>> {
    debug!(target, "Looking up MX records.");
    let result = resolver.mx_lookup(target).await.map(|lookup| {
        let mut records: Vec<MxRecord> = lookup
            .iter()
            .map(|mx| MxRecord { preference: mx.preference(), exchange: mx.exchange().to_string() })
            .collect();
        records.sort_by_key(|mx| mx.preference);
        records
    });
    classify(target, result)
}

async fn lookup_ns(resolver: &TokioAsyncResolver, target: &str) -> RecordLookup<Vec<String>> {
    debug!(target, "Looking up NS records.");
    let result = resolver
        .ns_lookup(target)
        .await
        .map(|lookup| lookup.iter().map(|ns| ns.to_string()).collect());
    classify(target, result)
}

async fn lookup_txt(resolver: &TokioAsyncResolver, target: &str) -> RecordLookup<Vec<String>> {
    debug!(target, "Looking up TXT records.");
    let result = resolver
        .txt_lookup(target)
        .await
        .map(|lookup| lookup.iter().map(|txt| txt.to_string()).collect());
    classify(target, result)
}

async fn lookup_caa(resolver: &TokioAsyncResolver, target: &str) -> RecordLookup<Vec<String>> {
    debug!(target, "Looking up CAA records.");
    let result = resolver
        .lookup(target, RecordType::CAA)
        .await
        .map(|lookup| lookup.iter().map(|rdata| rdata.to_string()).collect());
    classify(target, result)
}

/// DMARC records are stored in a TXT record at the `_dmarc` subdomain.
async fn lookup_dmarc(resolver: &TokioAsyncResolver, target: &str) -> RecordLookup<DmarcData> {
    let dmarc_target = format!("_dmarc.{target}");
    debug!(target = %dmarc_target, "Looking up DMARC record.");
    let result = resolver
        .txt_lookup(dmarc_target.as_str())
        .await
        .map(|lookup| lookup.iter().map(|txt| txt.to_string()).collect::<Vec<_>>());

    match classify(&dmarc_target, result) {
        RecordLookup::Found(records) => records
            .into_iter()
            .find(|record| record.starts_with("v=DMARC1"))
            .map(|record| RecordLookup::Found(parse_dmarc(record)))
            .unwrap_or(RecordLookup::Missing),
        RecordLookup::Missing => RecordLookup::Missing,
        RecordLookup::Failed(reason) => RecordLookup::Failed(reason),
    }
}

/// DKIM records live at `selector._domainkey.domain`; all common selectors are
/// tried concurrently.
async fn lookup_dkim(resolver: &TokioAsyncResolver, target: &str) -> RecordLookup<Vec<DkimRecord>> {
    debug!(target, "Looking up DKIM records for common selectors.");
    let lookups = COMMON_DKIM_SELECTORS.iter().map(|selector| async move {
        let dkim_target = format!("{selector}._domainkey.{target}");
        match resolver.txt_lookup(dkim_target.as_str()).await {
            Ok(lookup) => lookup
                .iter()
                .map(|txt| txt.to_string())
                .filter(|record| record.starts_with("v=DKIM1"))
                .map(|record| DkimRecord { selector: selector.to_string(), record })
                .collect(),
            Err(e) => {
                // Most selectors do not exist, so this is expected.
                debug!(selector, error = %e, "DKIM lookup for this selector failed.");
                Vec::new()
            }
        }
    });
    let found: Vec<DkimRecord> = join_all(lookups).await.into_iter().flatten().collect();

    if found.is_empty() {
        RecordLookup::Missing
    } else {
        info!(count = found.len(), "Found DKIM records.");
        RecordLookup::Found(found)
    }
}

/// SPF lives among the ordinary TXT records and starts with `v=spf1`.
fn spf_from_txt(txt: &RecordLookup<Vec<String>>) -> RecordLookup<SpfData> {
    match txt {
        RecordLookup::Found(records) => records
            .iter()
            .find(|record| record.starts_with("v=spf1"))
            .map(|record| RecordLookup::Found(SpfData { record: record.clone() }))
            .unwrap_or(RecordLookup::Missing),
        RecordLookup::Missing => RecordLookup::Missing,
        RecordLookup::Failed(reason) => RecordLookup::Failed(reason.clone()),
    }
}

fn parse_dmarc(record: String) -> DmarcData {
    let policy = record
        .split(';')
        .map(str::trim)
        .find_map(|tag| tag.strip_prefix("p="))
        .map(|policy| policy.trim().to_string());
    DmarcData { record, policy }
}

fn analyze_dns_report(report: &DnsReport) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();

    match &report.dmarc {
        RecordLookup::Found(dmarc) if dmarc.policy.as_deref() == Some("none") => {
            debug!("DMARC analysis: Found policy 'none', adding Warning.");
            analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_DMARC_POLICY_NONE"));
        }
        RecordLookup::Missing => {
            analyses.push(AnalysisFinding::new(Severity::Critical, "DNS_DMARC_MISSING"));
        }
        _ => {}
    }

    match &report.spf {
        RecordLookup::Found(spf) if spf.record.ends_with("~all") => {
            analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_SOFTFAIL"));
        }
        RecordLookup::Found(spf) if spf.record.ends_with("?all") => {
            analyses.push(AnalysisFinding::new(Severity::Info, "DNS_SPF_POLICY_NEUTRAL"));
        }
        RecordLookup::Missing => {
            analyses.push(AnalysisFinding::new(Severity::Warning, "DNS_SPF_MISSING"));
        }
        _ => {}
    }

    if report.dkim.is_missing() {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_DKIM_MISSING"));
    }
    if report.caa.is_missing() {
        analyses.push(AnalysisFinding::new(Severity::Info, "DNS_CAA_MISSING"));
    }

    analyses
}
