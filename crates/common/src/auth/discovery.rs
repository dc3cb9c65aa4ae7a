//! OpenID Connect discovery: locating and vetting the token endpoint
//!
//! The authority publishes `/.well-known/openid-configuration`. Before its
//! `token_endpoint` is used the document is checked against a
//! [`DiscoveryPolicy`]: HTTPS everywhere except loopback, and an `issuer`
//! that matches the authority we asked.

use url::{Host, Url};

use super::types::{DiscoveryDocument, DiscoveryPolicy};

const WELL_KNOWN_PATH: &str = ".well-known/openid-configuration";

/// Parse the authority and check it against the policy.
///
/// # Errors
/// Returns a human-readable reason when the authority is not a valid absolute
/// URL or violates the HTTPS requirement.
pub fn parse_authority(authority: &str, policy: &DiscoveryPolicy) -> Result<Url, String> {
    let url = Url::parse(authority.trim()).map_err(|e| format!("Malformed authority URL: {e}"))?;
    ensure_scheme(&url, policy)?;
    Ok(url)
}

/// Build the discovery URL for an authority, ignoring trailing slashes.
#[must_use]
pub fn discovery_url(authority: &Url) -> String {
    format!("{}/{WELL_KNOWN_PATH}", authority.as_str().trim_end_matches('/'))
}

/// Validate a fetched discovery document and return its token endpoint.
///
/// # Errors
/// Returns a human-readable reason when the issuer does not match, the token
/// endpoint is missing or malformed, or it violates the HTTPS requirement.
pub fn token_endpoint(
    document: &DiscoveryDocument,
    authority: &Url,
    policy: &DiscoveryPolicy,
) -> Result<Url, String> {
    if policy.validate_issuer_name {
        let issuer = document.issuer.as_deref().unwrap_or_default();
        if normalize(issuer) != normalize(authority.as_str()) {
            return Err(format!("Issuer name does not match authority: {issuer}"));
        }
    }

    let raw = document
        .token_endpoint
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "Discovery document does not contain a token_endpoint".to_string())?;

    let endpoint =
        Url::parse(raw).map_err(|e| format!("Malformed token_endpoint URL '{raw}': {e}"))?;
    ensure_scheme(&endpoint, policy)?;
    Ok(endpoint)
}

fn ensure_scheme(url: &Url, policy: &DiscoveryPolicy) -> Result<(), String> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if !policy.require_https || is_loopback(url) => Ok(()),
        "http" => Err(format!("HTTPS required: {url}")),
        other => Err(format!("Unsupported URL scheme '{other}': {url}")),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn normalize(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}
