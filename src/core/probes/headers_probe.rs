// src/core/probes/headers_probe.rs

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::error::ProbeError;
use crate::core::invoker::{Probe, ProbeResponse};
use crate::core::models::{AnalysisFinding, NormalizedInput, RecordLookup, Severity};

/// Payload of the `headers` probe.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeadersReport {
    pub hsts: RecordLookup<String>,
    pub csp: RecordLookup<String>,
    pub x_frame_options: RecordLookup<String>,
    pub x_content_type_options: RecordLookup<String>,
    pub analysis: Vec<AnalysisFinding>,
}

impl HeadersReport {
    fn from_headers(headers: &HeaderMap) -> Self {
        let mut report = Self {
            hsts: check_header(headers, "strict-transport-security"),
            csp: check_header(headers, "content-security-policy"),
            x_frame_options: check_header(headers, "x-frame-options"),
            x_content_type_options: check_header(headers, "x-content-type-options"),
            analysis: Vec::new(),
        };
        report.analysis = analyze_headers_report(&report);
        report
    }
}

/// Fetches the target and checks its security-related response headers.
#[derive(Debug, Clone)]
pub struct HeadersProbe {
    client: Client,
}

impl HeadersProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for HeadersProbe {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
        let url = input.as_str();
        info!(url, "Starting headers probe.");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "HTTP request failed for headers probe.");
            ProbeError::Http(e)
        })?;
        info!(status = %response.status(), "Received HTTP response for headers probe.");

        let report = HeadersReport::from_headers(response.headers());
        info!(findings = report.analysis.len(), "Headers probe finished.");
        ProbeResponse::json(&report)
    }
}

/// Non-UTF-8 values still count as present.
fn check_header(headers: &HeaderMap, name: &str) -> RecordLookup<String> {
    match headers.get(name).map(|value| value.to_str()) {
        Some(Ok(value)) => {
            debug!(header_name = name, value, "Header found.");
            RecordLookup::Found(value.to_string())
        }
        Some(Err(_)) => {
            warn!(header_name = name, "Header found but contained invalid UTF-8.");
            RecordLookup::Found("[Invalid UTF-8]".to_string())
        }
        None => RecordLookup::Missing,
    }
}

fn analyze_headers_report(report: &HeadersReport) -> Vec<AnalysisFinding> {
    let checks = [
        (&report.hsts, Severity::Warning, "HEADERS_HSTS_MISSING"),
        (&report.csp, Severity::Warning, "HEADERS_CSP_MISSING"),
        (&report.x_frame_options, Severity::Warning, "HEADERS_X_FRAME_OPTIONS_MISSING"),
        (&report.x_content_type_options, Severity::Info, "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING"),
    ];
    checks
        .into_iter()
        .filter(|(lookup, _, _)| lookup.is_missing())
        .map(|(_, severity, code)| AnalysisFinding::new(severity, code))
        .collect()
}
