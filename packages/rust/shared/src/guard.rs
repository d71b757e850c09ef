//! Configuration guard — validates an [`AppConfig`] before any
//! network-capable component is constructed.
//!
//! This is the system's SSRF defense: endpoint URLs must be HTTPS on an
//! allow-listed domain, and literal-IP endpoints in private ranges are
//! rejected. Loopback is exempt so local development and tests work.

use std::collections::HashSet;
use std::net::IpAddr;

use url::Url;

use crate::config::{AppConfig, SourceConfig};
use crate::error::{Result, SourceDockError};

/// Bounds on per-source rate-limit and document-cap values.
const MAX_REQUESTS_PER_MINUTE: u32 = 6_000;
const MAX_BURST: u32 = 100;
const MAX_DOCS_PER_CALL: usize = 500;

/// Validate the full application config. Returns the first problem found.
///
/// Must run before limiters, breakers, or adapters are built; nothing is
/// silently corrected here (a `None` config becoming the default happens in
/// the client constructor, not in the guard).
pub fn validate(config: &AppConfig) -> Result<()> {
    validate_allowed_domains(&config.allowed_domains)?;

    let mut seen = HashSet::new();
    for source in &config.sources {
        if !seen.insert(source.name.as_str()) {
            return Err(SourceDockError::config(format!(
                "duplicate source name: {}",
                source.name
            )));
        }
        validate_source(source, &config.allowed_domains)?;
    }

    Ok(())
}

/// The allow-list must be non-empty and contain bare hostnames only.
fn validate_allowed_domains(domains: &[String]) -> Result<()> {
    if domains.is_empty() {
        return Err(SourceDockError::config(
            "allowed_domains must not be empty",
        ));
    }

    for domain in domains {
        if domain.contains('*') {
            return Err(SourceDockError::config(format!(
                "allowed_domains entry may not contain wildcards: {domain}"
            )));
        }
        if domain.contains("://") {
            return Err(SourceDockError::config(format!(
                "allowed_domains entry must be a bare hostname, not a URL: {domain}"
            )));
        }
        if domain.trim().is_empty() {
            return Err(SourceDockError::config("allowed_domains entry is blank"));
        }
    }

    Ok(())
}

/// Validate one source: name, endpoint URLs, and numeric bounds.
fn validate_source(source: &SourceConfig, allowed_domains: &[String]) -> Result<()> {
    if source.name.trim().is_empty() {
        return Err(SourceDockError::config("source name must not be empty"));
    }

    for (label, endpoint) in &source.endpoints {
        validate_endpoint(&source.name, label, endpoint, allowed_domains)?;
    }

    if source.requests_per_minute == 0 || source.requests_per_minute > MAX_REQUESTS_PER_MINUTE {
        return Err(SourceDockError::config(format!(
            "source {}: requests_per_minute must be 1..={MAX_REQUESTS_PER_MINUTE}",
            source.name
        )));
    }
    if source.burst == 0 || source.burst > MAX_BURST {
        return Err(SourceDockError::config(format!(
            "source {}: burst must be 1..={MAX_BURST}",
            source.name
        )));
    }
    if source.max_docs_per_call == 0 || source.max_docs_per_call > MAX_DOCS_PER_CALL {
        return Err(SourceDockError::config(format!(
            "source {}: max_docs_per_call must be 1..={MAX_DOCS_PER_CALL}",
            source.name
        )));
    }

    Ok(())
}

/// Validate a single endpoint URL against the scheme, allow-list, and
/// private-range rules.
fn validate_endpoint(
    source: &str,
    label: &str,
    endpoint: &str,
    allowed_domains: &[String],
) -> Result<()> {
    let url = Url::parse(endpoint).map_err(|e| {
        SourceDockError::config(format!(
            "source {source}: endpoint {label} is not a valid URL: {e}"
        ))
    })?;

    let host = url.host_str().ok_or_else(|| {
        SourceDockError::config(format!("source {source}: endpoint {label} has no host"))
    })?;

    if is_loopback_host(host) {
        // Loopback is exempt from the HTTPS and allow-list rules.
        return Ok(());
    }

    if url.scheme() != "https" {
        return Err(SourceDockError::config(format!(
            "source {source}: endpoint {label} must use https (got {})",
            url.scheme()
        )));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(SourceDockError::config(format!(
                "source {source}: endpoint {label} resolves to a private range: {ip}"
            )));
        }
    }

    if !allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(host)) {
        return Err(SourceDockError::config(format!(
            "source {source}: endpoint host {host} is not in allowed_domains"
        )));
    }

    Ok(())
}

/// Loopback hostnames and addresses exempt from the HTTPS/allow-list rules.
fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" || host == "[::1]" {
        return true;
    }
    matches!(host.parse::<IpAddr>(), Ok(ip) if ip.is_loopback())
}

/// Check if an IP is in a private/reserved range.
///
/// Covers 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16, and 169.254.0.0/16,
/// plus broadcast/unspecified addresses. Loopback is handled separately.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_link_local() || v4.is_broadcast() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;

    fn config_with_endpoint(endpoint: &str) -> AppConfig {
        let mut source = SourceConfig::new("src", Protocol::Forum);
        source
            .endpoints
            .insert("search".into(), endpoint.into());
        AppConfig {
            allowed_domains: vec!["forum.example.com".into()],
            sources: vec![source],
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_config_passes() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn empty_allow_list_rejected() {
        let config = AppConfig {
            allowed_domains: vec![],
            ..AppConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn wildcard_domain_rejected() {
        let config = AppConfig {
            allowed_domains: vec!["*".into()],
            ..AppConfig::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("wildcard"));
    }

    #[test]
    fn scheme_in_domain_rejected() {
        let config = AppConfig {
            allowed_domains: vec!["https://docs.example.com".into()],
            ..AppConfig::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("bare hostname"));
    }

    #[test]
    fn https_allow_listed_endpoint_passes() {
        let config = config_with_endpoint("https://forum.example.com/search");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn http_endpoint_rejected() {
        let config = config_with_endpoint("http://forum.example.com/search");
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("https"));
    }

    #[test]
    fn loopback_http_endpoint_allowed() {
        assert!(validate(&config_with_endpoint("http://127.0.0.1:8080/search")).is_ok());
        assert!(validate(&config_with_endpoint("http://localhost:3000/search")).is_ok());
    }

    #[test]
    fn private_range_endpoints_rejected() {
        for ep in [
            "https://10.0.0.1/search",
            "https://172.16.5.5/search",
            "https://192.168.1.1/search",
            "https://169.254.0.10/search",
        ] {
            let err = validate(&config_with_endpoint(ep)).unwrap_err();
            assert!(
                err.to_string().contains("private range"),
                "{ep} should be rejected"
            );
        }
    }

    #[test]
    fn host_outside_allow_list_rejected() {
        let config = config_with_endpoint("https://evil.example.net/search");
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("allowed_domains"));
    }

    #[test]
    fn rate_limit_bounds_enforced() {
        let mut config = config_with_endpoint("https://forum.example.com/search");
        config.sources[0].requests_per_minute = 0;
        assert!(validate(&config).is_err());

        let mut config = config_with_endpoint("https://forum.example.com/search");
        config.sources[0].burst = 10_000;
        assert!(validate(&config).is_err());

        let mut config = config_with_endpoint("https://forum.example.com/search");
        config.sources[0].max_docs_per_call = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn duplicate_source_names_rejected() {
        let config = AppConfig {
            allowed_domains: vec!["docs.example.com".into()],
            sources: vec![
                SourceConfig::new("dup", Protocol::File),
                SourceConfig::new("dup", Protocol::Wiki),
            ],
            ..AppConfig::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
