//! Domain normalization for user-entered allowlist entries
//!
//! # Examples
//!
//! ```
//! use ax_core::domain::normalize_domain;
//!
//! assert_eq!(normalize_domain("HTTPS://Example.com/path"), "example.com");
//! assert_eq!(normalize_domain("   "), "");
//! ```

use std::collections::HashSet;

/// Canonicalize a raw domain or URL into a comparable domain.
///
/// Returns an empty string when nothing is left; callers treat that as "no
/// domain". Normalizing an already normalized value returns it unchanged.
pub fn normalize_domain(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    let host = match without_scheme.find('/') {
        Some(pos) => &without_scheme[..pos],
        None => without_scheme,
    };

    host.trim().to_string()
}

/// Normalize a batch of raw domains, dropping empties and duplicates.
///
/// The result keeps first-occurrence order so that anything derived from it
/// (rule ids in particular) is stable for a given input.
pub fn normalize_domains<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut domains = Vec::new();

    for value in raw {
        let domain = normalize_domain(value.as_ref());
        if domain.is_empty() {
            continue;
        }
        if seen.insert(domain.clone()) {
            domains.push(domain);
        }
    }

    domains
}
