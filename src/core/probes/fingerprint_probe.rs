// src/core/probes/fingerprint_probe.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::error::ProbeError;
use crate::core::invoker::{Probe, ProbeResponse};
use crate::core::models::NormalizedInput;

/// Where a signature is looked for.
#[derive(Debug, Clone, Copy)]
enum Source {
    Header(&'static str),
    MetaTag(&'static str),
    Body,
    ScriptSrc,
    LinkHref,
    Cookie,
}

/// One way of recognizing a technology. A first capture group, when present,
/// is taken as the version.
struct Signature {
    tech: &'static str,
    category: &'static str,
    source: Source,
    pattern: &'static str,
}

const SIGNATURES: &[Signature] = &[
    Signature { tech: "Nginx", category: "Web Server", source: Source::Header("server"), pattern: r"nginx(?:/([\d.]+))?" },
    Signature { tech: "Nginx", category: "Web Server", source: Source::Body, pattern: r"<hr><center>nginx</center>" },
    Signature { tech: "Apache", category: "Web Server", source: Source::Header("server"), pattern: r"Apache(?:/([\d.]+))?" },
    Signature { tech: "LiteSpeed", category: "Web Server", source: Source::Header("server"), pattern: r"LiteSpeed" },
    Signature { tech: "Cloudflare", category: "CDN / WAF", source: Source::Header("server"), pattern: r"cloudflare" },
    Signature { tech: "WordPress", category: "CMS", source: Source::MetaTag("generator"), pattern: r"WordPress ?([\d.]+)?" },
    Signature { tech: "WordPress", category: "CMS", source: Source::Body, pattern: r"/wp-content/|/wp-includes/" },
    Signature { tech: "Joomla", category: "CMS", source: Source::MetaTag("generator"), pattern: r"Joomla!" },
    Signature { tech: "Drupal", category: "CMS", source: Source::Header("x-generator"), pattern: r"Drupal ?([\d.]+)?" },
    Signature { tech: "Shopify", category: "E-commerce", source: Source::Header("x-shopid"), pattern: r".+" },
    Signature { tech: "Magento", category: "E-commerce", source: Source::Cookie, pattern: r"(?i)mage-|magento" },
    Signature { tech: "PHP", category: "Language", source: Source::Header("x-powered-by"), pattern: r"PHP/([\d.]+)" },
    Signature { tech: "PHP", category: "Language", source: Source::Cookie, pattern: r"PHPSESSID" },
    Signature { tech: "ASP.NET", category: "Framework", source: Source::Header("x-aspnet-version"), pattern: r"([\d.]+)" },
    Signature { tech: "Java", category: "Language", source: Source::Cookie, pattern: r"JSESSIONID" },
    Signature { tech: "Django", category: "Framework", source: Source::Cookie, pattern: r"csrftoken" },
    Signature { tech: "Ruby on Rails", category: "Framework", source: Source::Cookie, pattern: r"_rails_session|_session_id" },
    Signature { tech: "Next.js", category: "JS Framework", source: Source::Header("x-powered-by"), pattern: r"Next\.js ?([\d.]+)?" },
    Signature { tech: "Next.js", category: "JS Framework", source: Source::ScriptSrc, pattern: r"/_next/static/" },
    Signature { tech: "Nuxt.js", category: "JS Framework", source: Source::Body, pattern: r"__NUXT__" },
    Signature { tech: "Angular", category: "JS Framework", source: Source::Body, pattern: r#"ng-version="([\d.]+)""# },
    Signature { tech: "Svelte", category: "JS Framework", source: Source::Body, pattern: r#"class=["'][^"']*svelte-"# },
    Signature { tech: "Gatsby", category: "JS Framework", source: Source::Body, pattern: r#"id=["']___gatsby["']"# },
    Signature { tech: "Astro", category: "JS Framework", source: Source::MetaTag("generator"), pattern: r"Astro v([\d.]+)" },
    Signature { tech: "React", category: "JS Library", source: Source::Body, pattern: r"react-dom|data-reactroot" },
    Signature { tech: "Vue.js", category: "JS Library", source: Source::Body, pattern: r"data-v-app|__VUE_" },
    Signature { tech: "jQuery", category: "JS Library", source: Source::ScriptSrc, pattern: r"jquery[-.]?([\d.]+\d)?(?:\.min|\.slim)?\.js" },
    Signature { tech: "Bootstrap", category: "UI Framework", source: Source::LinkHref, pattern: r"bootstrap(?:@([\d.]+\d))?.*\.css" },
    Signature { tech: "Google Analytics", category: "Analytics", source: Source::ScriptSrc, pattern: r"google-analytics\.com/|googletagmanager\.com/" },
];

/// Signatures paired with their compiled pattern. Patterns that fail to compile
/// are logged and skipped.
static COMPILED: Lazy<Vec<(&'static Signature, Regex)>> = Lazy::new(|| {
    SIGNATURES
        .iter()
        .filter_map(|signature| match Regex::new(signature.pattern) {
            Ok(regex) => Some((signature, regex)),
            Err(e) => {
                warn!(tech = signature.tech, error = %e, "Skipping invalid fingerprint pattern.");
                None
            }
        })
        .collect()
});

static RE_WP_VERSION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"WordPress ([\d.]+)").ok());
static RE_WP_THEME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/wp-content/themes/([A-Za-z0-9_-]+)/").ok());
static RE_WP_PLUGIN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/wp-content/plugins/([A-Za-z0-9_-]+)/").ok());

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
}

/// Extra detail collected when the site runs WordPress.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct WordPressDetails {
    pub version: Option<String>,
    pub theme: Option<String>,
    pub plugins: Vec<String>,
}

/// Payload of the `tech` probe.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TechReport {
    pub technologies: Vec<Technology>,
    pub wordpress: Option<WordPressDetails>,
}

/// The fetched page the signatures are matched against.
struct Page<'a> {
    headers: &'a HeaderMap,
    cookies: String,
    body: &'a str,
    document: Html,
}

impl<'a> Page<'a> {
    fn new(headers: &'a HeaderMap, body: &'a str) -> Self {
        let cookies = headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        Self { headers, cookies, body, document: Html::parse_document(body) }
    }

    /// `None` if the signature did not match; `Some(version)` otherwise.
    fn check(&self, source: Source, regex: &Regex) -> Option<Option<String>> {
        match source {
            Source::Header(name) => {
                capture(self.headers.get(name).and_then(|value| value.to_str().ok()), regex)
            }
            Source::MetaTag(name) => {
                let selector = Selector::parse(&format!("meta[name='{name}']")).ok()?;
                let content = self
                    .document
                    .select(&selector)
                    .next()
                    .and_then(|el| el.value().attr("content"));
                capture(content, regex)
            }
            Source::Body => capture(Some(self.body), regex),
            Source::ScriptSrc => self.check_attribute("script[src]", "src", regex),
            Source::LinkHref => self.check_attribute("link[href]", "href", regex),
            Source::Cookie => capture(Some(&self.cookies), regex),
        }
    }

    /// First element matching `selector` whose `attr` matches.
    fn check_attribute(&self, selector: &str, attr: &str, regex: &Regex) -> Option<Option<String>> {
        let selector = Selector::parse(selector).ok()?;
        self.document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|value| capture(Some(value), regex))
    }
}

fn capture(text: Option<&str>, regex: &Regex) -> Option<Option<String>> {
    let caps = regex.captures(text?)?;
    Some(caps.get(1).map(|m| m.as_str().to_string()).filter(|v| !v.is_empty()))
}

/// Applies every signature to the page and returns the detected technologies,
/// sorted by name. A versioned match wins over an unversioned one.
fn detect_technologies(headers: &HeaderMap, body: &str) -> Vec<Technology> {
    let page = Page::new(headers, body);
    let mut found: BTreeMap<&'static str, Technology> = BTreeMap::new();

    debug!(total_rules = COMPILED.len(), "Applying fingerprint signatures.");
    for (signature, regex) in COMPILED.iter() {
        let Some(version) = page.check(signature.source, regex) else {
            continue;
        };
        debug!(tech = signature.tech, version = ?version, "Signature matched.");
        let entry = found.entry(signature.tech).or_insert_with(|| Technology {
            name: signature.tech.to_string(),
            category: signature.category.to_string(),
            version: None,
        });
        if entry.version.is_none() {
            entry.version = version;
        }
    }
    found.into_values().collect()
}

pub(crate) fn wordpress_details(body: &str) -> WordPressDetails {
    let first_capture = |regex: &Option<Regex>| {
        regex
            .as_ref()
            .and_then(|re| re.captures(body))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };
    let plugins: BTreeSet<String> = RE_WP_PLUGIN
        .as_ref()
        .map(|re| re.captures_iter(body).filter_map(|caps| caps.get(1)).map(|m| m.as_str().to_string()).collect())
        .unwrap_or_default();

    WordPressDetails {
        version: first_capture(&RE_WP_VERSION),
        theme: first_capture(&RE_WP_THEME),
        plugins: plugins.into_iter().collect(),
    }
}

fn build_report(headers: &HeaderMap, body: &str) -> TechReport {
    let technologies = detect_technologies(headers, body);
    let wordpress = technologies
        .iter()
        .any(|tech| tech.name == "WordPress")
        .then(|| wordpress_details(body));
    TechReport { technologies, wordpress }
}

/// Identifies the software stack behind the target from its headers, cookies
/// and markup.
#[derive(Debug, Clone)]
pub struct FingerprintProbe {
    client: Client,
}

impl FingerprintProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for FingerprintProbe {
    async fn probe(&self, input: &NormalizedInput) -> Result<ProbeResponse, ProbeError> {
        let url = input.as_str();
        info!(url, "Starting fingerprint probe.");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "HTTP request failed for fingerprint probe.");
            ProbeError::Http(e)
        })?;
        info!(status = %response.status(), "Received HTTP response.");

        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(bytes = body.len(), "Read response body.");

        let report = build_report(&headers, &body);
        info!(count = report.technologies.len(), "Fingerprint probe finished.");
        ProbeResponse::json(&report)
    }
}
