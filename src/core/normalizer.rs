// src/core/normalizer.rs

//! Rewrites a user-supplied target into the input each probe kind expects.
//!
//! No validation happens here beyond the non-empty precondition: a malformed host
//! is left for the probe to reject.

use crate::core::models::{InputShape, NormalizedInput, ProbeKind};

const HTTP_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Returns the remainder of `target` after a leading HTTP scheme, if it has one.
fn strip_scheme(target: &str) -> Option<&str> {
    HTTP_SCHEMES.iter().find_map(|scheme| {
        target
            .get(..scheme.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .map(|_| &target[scheme.len()..])
    })
}

/// Normalizes `target` for `kind`.
///
/// Surrounding whitespace is dropped. URL-shaped kinds get `https://` prepended
/// unless a scheme is already present; host-shaped kinds get any scheme removed.
pub fn normalize(target: &str, kind: ProbeKind) -> NormalizedInput {
    let target = target.trim();
    debug_assert!(!target.is_empty(), "targets are validated before normalization");

    let value = match kind.input_shape() {
        InputShape::Url => match strip_scheme(target) {
            Some(_) => target.to_string(),
            None => format!("https://{target}"),
        },
        InputShape::Host => strip_scheme(target).unwrap_or(target).to_string(),
    };
    NormalizedInput::new(kind, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_kinds_gain_a_scheme() {
        let input = normalize("example.com", ProbeKind::Ssl);
        assert_eq!(input.as_str(), "https://example.com");
        assert_eq!(input.kind(), ProbeKind::Ssl);
    }

    #[test]
    fn url_kinds_never_double_prefix() {
        for target in ["https://example.com", "http://example.com", "HTTPS://Example.com/a"] {
            let once = normalize(target, ProbeKind::Status);
            assert_eq!(once.as_str(), target);
            let twice = normalize(once.as_str(), ProbeKind::Status);
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn scheme_like_hostnames_still_get_prefixed() {
        assert_eq!(normalize("httpbin.org", ProbeKind::Status).as_str(), "https://httpbin.org");
    }

    #[test]
    fn host_kinds_strip_the_scheme() {
        assert_eq!(normalize("https://example.com", ProbeKind::Dns).as_str(), "example.com");
        assert_eq!(normalize("http://example.com", ProbeKind::Dns).as_str(), "example.com");
    }

    #[test]
    fn host_kinds_pass_bare_domains_through() {
        assert_eq!(normalize("example.com", ProbeKind::Dns).as_str(), "example.com");
        assert_eq!(normalize("www.example.com", ProbeKind::Dns).as_str(), "www.example.com");
    }

    #[test]
    fn surrounding_whitespace_is_dropped() {
        assert_eq!(normalize("  example.com\t", ProbeKind::Ssl).as_str(), "https://example.com");
        assert_eq!(normalize(" https://example.com ", ProbeKind::Dns).as_str(), "example.com");
    }

    #[test]
    fn inputs_differ_per_kind_for_the_same_target() {
        let target = "example.com";
        let ssl = normalize(target, ProbeKind::Ssl);
        let dns = normalize(target, ProbeKind::Dns);
        assert_ne!(ssl.as_str(), dns.as_str());
        assert_eq!(target, "example.com");
    }
}
