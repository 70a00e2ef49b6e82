// src/core/probes/wordpress_probe.rs

use std::cmp::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::error::ProbeError;
use crate::core::invoker::{Probe, ProbeResponse};
use crate::core::models::NormalizedInput;
use crate::core::probes::fingerprint_probe::wordpress_details;

/// Newest WordPress release the version check compares against.
pub const LATEST_WORDPRESS_VERSION: &str = "6.4.2";

const LARGE_PAGE_BYTES: usize = 5 * 1024 * 1024;
/// Budget for the follow-up requests to `readme.html` and `wp-config.php`.
const SIDE_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

static RE_README_VERSION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"<br\s*/?>\s*Version ([0-9.]+)").ok());
static RE_PHP_VERSION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"PHP/([0-9.]+)").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteErrorKind {
    Server,
    WhiteScreen,
    Database,
    Fatal,
}

/// A visible symptom of a broken site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteError {
    #[serde(rename = "type")]
    pub kind: SiteErrorKind,
    pub message: String,
}

impl SiteError {
    fn new(kind: SiteErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// Payload reported under the `wordpress` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordPressReport {
    pub is_wordpress: bool,
    pub version: Option<String>,
    pub needs_update: bool,
    pub latest_version: &'static str,
    pub theme: Option<String>,
    pub plugins: Vec<String>,
    pub plugin_count: usize,
    pub php_version: Option<String>,
    pub errors: Vec<SiteError>,
    pub security_issues: Vec<String>,
    pub performance_hints: Vec<String>,
}

impl WordPressReport {
    fn set_version(&mut self, version: Option<String>) {
        self.needs_update = version
            .as_deref()
            .is_some_and(|version| is_outdated(version, LATEST_WORDPRESS_VERSION));
        self.version = version;
    }
}

/// Compares dotted version strings numerically; missing segments count as zero.
fn is_outdated(version: &str, latest: &str) -> bool {
    let segments = |v: &str| -> Vec<u64> { v.split('.').map(|part| part.parse().unwrap_or(0)).collect() };
    let (current, latest) = (segments(version), segments(latest));
    let len = current.len().max(latest.len());
    let at = |parts: &[u64], i: usize| parts.get(i).copied().unwrap_or(0);

    (0..len)
        .map(|i| at(current.as_slice(), i).cmp(&at(latest.as_slice(), i)))
        .find(|ordering| *ordering != Ordering::Equal)
        == Some(Ordering::Less)
}

fn first_capture(regex: &Option<Regex>, text: &str) -> Option<String> {
    regex
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn site_errors(status: StatusCode, body: &str) -> Vec<SiteError> {
    let mut errors = Vec::new();
    if status.is_server_error() {
        errors.push(SiteError::new(
            SiteErrorKind::Server,
            format!("Server returned status code {}", status.as_u16()),
        ));
    }
    if status == StatusCode::OK && body.trim().is_empty() {
        errors.push(SiteError::new(SiteErrorKind::WhiteScreen, "White screen of death (empty response)"));
    }
    if body.contains("Error establishing database connection") {
        errors.push(SiteError::new(SiteErrorKind::Database, "Error establishing database connection"));
    }
    if body.contains("Fatal error") {
        errors.push(SiteError::new(SiteErrorKind::Fatal, "PHP fatal error detected in output"));
    }
    errors
}

fn performance_hints(headers: &HeaderMap, body: &str) -> Vec<String> {
    let mut hints = Vec::new();
    if body.len() > LARGE_PAGE_BYTES {
        hints.push("Page size is very large (>5MB)".to_string());
    }
    if !headers.contains_key("cache-control") && !headers.contains_key("expires") {
        hints.push("No caching headers detected".to_string());
    }
    hints
}

/// Everything that can be read off the landing page alone.
fn inspect_page(status: StatusCode, headers: &HeaderMap, body: &str) -> WordPressReport {
    let is_wordpress = body.contains("/wp-content/")
        || body.contains("wp-includes")
        || body.contains(r#"generator" content="WordPress"#);
    let details = wordpress_details(body);
    let php_version = headers
        .get("x-powered-by")
        .and_then(|value| value.to_str().ok())
        .and_then(|powered_by| first_capture(&RE_PHP_VERSION, powered_by));

    let mut report = WordPressReport {
        is_wordpress,
        version: None,
        needs_update: false,
        latest_version: LATEST_WORDPRESS_VERSION,
        theme: details.theme,
        plugin_count: details.plugins.len(),
        plugins: details.plugins,
        php_version,
        errors: site_errors(status, body),
        security_issues: Vec::new(),
        performance_hints: performance_hints(headers, body),
    };
    report.set_version(details.version);
    report
}

fn readme_version(body: &str) -> Option<String> {
    first_capture(&RE_README_VERSION, body)
}

/// A readable `wp-config.php` serves its PHP source instead of executing it.
fn config_exposed(status: StatusCode, body: &str) -> bool {
    status == StatusCode::OK && body.contains("define(")
}

fn site_url(base: &str, path: &str) -> String {
    format!("{}/{path}", base.trim_end_matches('/'))
}

/// Health and hygiene checks for WordPress sites: error pages, core version,
/// PHP version, an exposed `wp-config.php` and basic performance hints.
///
/// Error statuses are part of the report; only a transport failure on the
/// landing page is an error.
#[derive(Debug, Clone)]
pub struct WordPressProbe {
    client: Client,
}

impl WordPressProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Best-effort fetch; failures are logged and yield `None`.
    async fn fetch_side(&self, url: &str) -> Option<(StatusCode, String)> {
        let response = match self.client.get(url).timeout(SIDE_REQUEST_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "Side request failed.");
                return None;
            }
        };
        let status = response.status();
        response.text().await.ok().map(|body| (status, body))
    }
}

#[async_trait]
impl Probe for WordPressProbe {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
        let url = input.as_str();
        info!(url, "Starting WordPress check.");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "HTTP request failed for WordPress check.");
            ProbeError::Http(e)
        })?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        let mut report = inspect_page(status, &headers, &body);
        if report.is_wordpress {
            if report.version.is_none() {
                debug!("No generator tag, trying readme.html.");
                let version = self
                    .fetch_side(&site_url(url, "readme.html"))
                    .await
                    .and_then(|(_, readme)| readme_version(&readme));
                report.set_version(version);
            }
            if let Some((status, config)) = self.fetch_side(&site_url(url, "wp-config.php")).await {
                if config_exposed(status, &config) {
                    warn!(url, "wp-config.php is publicly readable.");
                    report
                        .security_issues
                        .push("wp-config.php is publicly accessible and readable".to_string());
                }
            }
        }

        info!(
            is_wordpress = report.is_wordpress,
            errors = report.errors.len(),
            "WordPress check finished."
        );
        ProbeResponse::json(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    const OUTDATED_SITE: &str = r#"<html><head>
<meta name="generator" content="WordPress 6.2.1">
<link rel="stylesheet" href="/wp-content/themes/twentytwentythree/style.css">
<script src="/wp-content/plugins/akismet/a.js"></script>
<script src="/wp-content/plugins/jetpack/b.js"></script>
</head><body>Hello</body></html>"#;

    #[test]
    fn outdated_site_is_flagged() {
        let mut headers = HeaderMap::new();
        headers.insert("x-powered-by", HeaderValue::from_static("PHP/7.4.33"));

        let report = inspect_page(StatusCode::OK, &headers, OUTDATED_SITE);

        assert!(report.is_wordpress);
        assert_eq!(report.version.as_deref(), Some("6.2.1"));
        assert!(report.needs_update);
        assert_eq!(report.theme.as_deref(), Some("twentytwentythree"));
        assert_eq!(report.plugin_count, 2);
        assert_eq!(report.php_version.as_deref(), Some("7.4.33"));
        assert!(report.errors.is_empty());
        assert_eq!(report.performance_hints, vec!["No caching headers detected"]);
    }

    #[test]
    fn broken_site_reports_its_symptoms() {
        let mut headers = HeaderMap::new();
        headers.insert("cache-control", HeaderValue::from_static("no-cache"));
        let body = "<h1>Error establishing database connection</h1>";

        let report = inspect_page(StatusCode::INTERNAL_SERVER_ERROR, &headers, body);

        let kinds: Vec<_> = report.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SiteErrorKind::Server, SiteErrorKind::Database]);
        assert_eq!(report.errors[0].message, "Server returned status code 500");
        assert!(report.performance_hints.is_empty());
        assert!(!report.is_wordpress);
    }

    #[test]
    fn empty_ok_page_is_a_white_screen() {
        let report = inspect_page(StatusCode::OK, &HeaderMap::new(), "  \n");
        assert_eq!(report.errors[0].kind, SiteErrorKind::WhiteScreen);

        let fatal = inspect_page(StatusCode::OK, &HeaderMap::new(), "<b>Fatal error</b>: Uncaught Error");
        assert_eq!(fatal.errors[0].kind, SiteErrorKind::Fatal);
    }

    #[test]
    fn versions_compare_numerically() {
        assert!(is_outdated("6.4.1", "6.4.2"));
        assert!(is_outdated("6.4", "6.4.2"));
        assert!(!is_outdated("6.4.10", "6.4.2"));
        assert!(!is_outdated("6.4.2", "6.4.2"));
        assert!(!is_outdated("6.5", "6.4.2"));
    }

    #[test]
    fn readme_reveals_the_version() {
        let readme = "<h1 id=\"logo\">\n<br /> Version 6.3.2\n</h1>";
        assert_eq!(readme_version(readme).as_deref(), Some("6.3.2"));
        assert_eq!(readme_version("<html>nothing</html>"), None);
    }

    #[test]
    fn readable_config_is_an_exposure() {
        assert!(config_exposed(StatusCode::OK, "<?php define('DB_NAME', 'wp');"));
        assert!(!config_exposed(StatusCode::OK, ""));
        assert!(!config_exposed(StatusCode::FORBIDDEN, "define("));
    }

    #[test]
    fn side_urls_are_joined_onto_the_target() {
        assert_eq!(site_url("https://example.com/", "readme.html"), "https://example.com/readme.html");
        assert_eq!(site_url("https://example.com/blog", "wp-config.php"), "https://example.com/blog/wp-config.php");
    }

    #[test]
    fn payload_uses_snake_case_error_types() {
        let report = inspect_page(StatusCode::OK, &HeaderMap::new(), "");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["errors"][0]["type"], json!("white_screen"));
        assert_eq!(value["latest_version"], json!(LATEST_WORDPRESS_VERSION));
        assert_eq!(value["needs_update"], json!(false));
    }
}
