// src/core/probes/ssl_probe.rs

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use serde::Serialize;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

use crate::core::error::ProbeError;
use crate::core::invoker::{Probe, ProbeResponse};
use crate::core::models::{AnalysisFinding, NormalizedInput, Severity};

const TLS_PORT: u16 = 443;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);
const EXPIRY_WARNING_DAYS: i64 = 30;

/// Details extracted from the leaf certificate.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Payload of the `ssl` probe. Certificate fields sit at the top level and are
/// absent when the peer sent no certificate.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SslReport {
    pub valid: bool,
    #[serde(flatten)]
    pub certificate: Option<CertificateInfo>,
    pub days_until_expiry: Option<i64>,
    pub analysis: Vec<AnalysisFinding>,
}

/// Completes a TLS handshake with the target (port 443 unless the URL names
/// another) and inspects the peer certificate.
#[derive(Debug, Default)]
pub struct SslProbe;

#[async_trait]
impl Probe for SslProbe {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
        let host = input
            .host()
            .ok_or_else(|| ProbeError::InvalidTarget(input.as_str().to_string()))?;
        let port = input.port().unwrap_or(TLS_PORT);
        info!(target = %host, port, "Starting SSL/TLS probe.");

        // native-tls is blocking; keep it off the async workers.
        debug!("Spawning blocking task for TLS connection.");
        let certificate = spawn_blocking(move || fetch_certificate(&host, port))
            .await
            .map_err(|e| {
                error!(panic = %e, "Blocking SSL probe task panicked!");
                ProbeError::Internal(e.to_string())
            })??;

        let report = build_report(certificate, Utc::now());
        info!(valid = report.valid, findings = report.analysis.len(), "SSL/TLS probe finished.");
        ProbeResponse::json(&report)
    }
}

fn fetch_certificate(host: &str, port: u16) -> Result<Option<CertificateInfo>, ProbeError> {
    debug!(target = host, port, "Performing TLS connection and handshake.");

    let connector = TlsConnector::new().map_err(|e| {
        error!(error = %e, "Failed to create TlsConnector");
        ProbeError::Tls(e.to_string())
    })?;

    let address = (host, port)
        .to_socket_addrs()
        .map_err(|e| ProbeError::Connection(e.to_string()))?
        .next()
        .ok_or_else(|| ProbeError::Connection(format!("{host} did not resolve to any address")))?;

    debug!(target = host, %address, "Connecting TCP stream.");
    let stream = TcpStream::connect_timeout(&address, SOCKET_TIMEOUT).map_err(|e| {
        error!(error = %e, "TCP connection failed");
        ProbeError::Connection(e.to_string())
    })?;
    stream
        .set_read_timeout(Some(SOCKET_TIMEOUT))
        .and_then(|_| stream.set_write_timeout(Some(SOCKET_TIMEOUT)))
        .map_err(|e| ProbeError::Connection(e.to_string()))?;

    let stream = connector.connect(host, stream).map_err(|e| {
        error!(error = %e, "TLS handshake failed");
        ProbeError::Tls(e.to_string())
    })?;

    let Some(cert) = stream
        .peer_certificate()
        .map_err(|e| ProbeError::Certificate(format!("could not get peer certificate: {e}")))?
    else {
        debug!("TLS connection successful, but no peer certificate provided.");
        return Ok(None);
    };

    let der = cert
        .to_der()
        .map_err(|e| ProbeError::Certificate(format!("could not convert to DER: {e}")))?;
    let (_, x509) = parse_x509_certificate(&der)
        .map_err(|e| ProbeError::Certificate(format!("X.509 parse error: {e}")))?;

    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");
    let validity = x509.validity();
    Ok(Some(CertificateInfo {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        not_before: asn1_time_to_chrono_utc(&validity.not_before),
        not_after: asn1_time_to_chrono_utc(&validity.not_after),
    }))
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn build_report(certificate: Option<CertificateInfo>, now: DateTime<Utc>) -> SslReport {
    let valid = certificate
        .as_ref()
        .is_some_and(|cert| now > cert.not_before && now < cert.not_after);
    let days_until_expiry = certificate
        .as_ref()
        .map(|cert| cert.not_after.signed_duration_since(now).num_days());

    let mut report = SslReport { valid, certificate, days_until_expiry, analysis: Vec::new() };
    report.analysis = analyze_ssl_report(&report);
    report
}

fn analyze_ssl_report(report: &SslReport) -> Vec<AnalysisFinding> {
    let mut analyses = Vec::new();

    if report.certificate.is_none() {
        analyses.push(AnalysisFinding::new(Severity::Warning, "SSL_NO_CERTIFICATE_FOUND"));
        return analyses;
    }
    if !report.valid {
        analyses.push(AnalysisFinding::new(Severity::Critical, "SSL_EXPIRED"));
    }
    if let Some(days_left) = report.days_until_expiry {
        if (0..=EXPIRY_WARNING_DAYS).contains(&days_left) {
            debug!(days_left, "Certificate is expiring soon.");
            analyses.push(AnalysisFinding::new(Severity::Warning, "SSL_EXPIRING_SOON"));
        }
    }
    analyses
}
