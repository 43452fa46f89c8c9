//! Allowlist matching
//!
//! A hostname is covered by an allowlist entry when it equals the entry or is
//! a subdomain of it. The empty hostname is never covered, so URLs that fail
//! to parse stay eligible for blocking.

use crate::domain::normalize_domains;
use crate::url::hostname;

/// Check `hostname` against already normalized allowlist domains.
pub fn hostname_matches_allowlist<S: AsRef<str>>(hostname: &str, whitelist: &[S]) -> bool {
    if hostname.is_empty() {
        return false;
    }

    whitelist.iter().any(|domain| {
        let domain = domain.as_ref();
        !domain.is_empty() && (hostname == domain || is_subdomain_of(hostname, domain))
    })
}

#[inline]
fn is_subdomain_of(hostname: &str, domain: &str) -> bool {
    hostname.len() > domain.len()
        && hostname.ends_with(domain)
        && hostname.as_bytes()[hostname.len() - domain.len() - 1] == b'.'
}

/// A normalized, deduplicated allowlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    domains: Vec<String>,
}

impl Allowlist {
    /// Build from raw user entries; entries are normalized and deduplicated.
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: normalize_domains(raw),
        }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }

    /// Does the allowlist cover `hostname` (exact or subdomain match)?
    pub fn matches(&self, hostname: &str) -> bool {
        hostname_matches_allowlist(hostname, &self.domains)
    }

    /// Does the allowlist cover the host of `url`? Malformed URLs never match.
    pub fn matches_url(&self, url: &str) -> bool {
        self.matches(&hostname(url))
    }
}
