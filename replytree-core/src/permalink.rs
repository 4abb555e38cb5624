use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{Result, ReplytreeError};

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@?[0-9A-Za-z_.]{1,64}$").expect("valid regex"));

/// Reduce a post permalink to scheme, host and path.
///
/// Anything that does not parse as an absolute URL with a host is returned
/// unchanged so it can still serve as an identifier.
pub fn normalize_permalink(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return raw.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return raw.to_string();
    };

    match parsed.port() {
        Some(port) => format!("{}://{host}:{port}{}", parsed.scheme(), parsed.path()),
        None => format!("{}://{host}{}", parsed.scheme(), parsed.path()),
    }
}

/// Lowercased host of `raw` with a leading `www.` removed.
pub fn bare_host(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(
        host.strip_prefix("www.")
            .map(ToString::to_string)
            .unwrap_or(host),
    )
}

pub fn same_handle(left: &str, right: &str) -> bool {
    strip_at(left).eq_ignore_ascii_case(strip_at(right))
}

pub fn parse_handle(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if !HANDLE_RE.is_match(trimmed) {
        return Err(ReplytreeError::InvalidHandle(input.to_string()));
    }

    Ok(format!("@{}", strip_at(trimmed)))
}

/// Case-folded handle without the `@` prefix, for use as a storage key.
pub fn handle_key(handle: &str) -> String {
    strip_at(handle).to_ascii_lowercase()
}

fn strip_at(handle: &str) -> &str {
    let handle = handle.trim();
    handle.strip_prefix('@').unwrap_or(handle)
}
