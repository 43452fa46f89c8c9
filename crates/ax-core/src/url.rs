//! URL host extraction
//!
//! These functions work directly on string slices. `hostname` follows what a
//! browser reports as `URL.hostname`: lowercase, without port or userinfo,
//! and empty for anything it cannot parse.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    // Find ':'
    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if !is_valid_scheme(&bytes[..colon_pos]) {
        return None;
    }

    // Check for "://"
    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

fn is_valid_scheme(scheme: &[u8]) -> bool {
    match scheme.first() {
        Some(first) if first.is_ascii_alphabetic() => scheme
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.'),
        _ => false,
    }
}

/// Schemes whose authority a browser also ends at `\`.
fn is_special_scheme(scheme: &[u8]) -> bool {
    ["http", "https", "ws", "wss", "ftp", "file"]
        .iter()
        .any(|special| scheme.eq_ignore_ascii_case(special.as_bytes()))
}

// =============================================================================
// Host Position
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Authority ends at the first '/', '?' or '#', or '\' for special schemes
    let backslash_ends = is_special_scheme(&bytes[..scheme_end - 3]);
    let mut authority_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'/' || b == b'?' || b == b'#' || (b == b'\\' && backslash_ends) {
            authority_end = i;
            break;
        }
    }

    // Skip userinfo
    let mut host_start = scheme_end;
    for i in (scheme_end..authority_end).rev() {
        if bytes[i] == b'@' {
            host_start = i + 1;
            break;
        }
    }

    // IPv6 literals keep their brackets
    if bytes.get(host_start) == Some(&b'[') {
        let close = bytes[host_start..authority_end].iter().position(|&b| b == b']')?;
        return Some((host_start, host_start + close + 1));
    }

    // Drop the port
    let mut host_end = authority_end;
    for (i, &b) in bytes.iter().enumerate().take(authority_end).skip(host_start) {
        if b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

/// Lowercased hostname of `url`, or an empty string when the URL is malformed
/// or has no host.
pub fn hostname(url: &str) -> String {
    match extract_host(url.trim()) {
        Some(host) if is_valid_host(host) => host.to_ascii_lowercase(),
        _ => String::new(),
    }
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && !host
            .bytes()
            .any(|b| b.is_ascii_whitespace() || b == b'<' || b == b'>' || b == b'\\' || b == b'%')
}
