//! Base-path normalization and URL joining.
//!
//! A site served from a sub-directory gets every emitted URL prefixed with
//! its base path. Normalization happens exactly once, at config load; the
//! rest of the pipeline only ever concatenates the normalized value.

/// Normalizes a configured base path.
///
/// The empty string stays empty (never `/`), a bare `/` collapses to the
/// empty string, and every non-empty result has exactly one leading and no
/// trailing slash, so joining it with a `/`-prefixed path never produces
/// `//`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Joins a normalized base path with a site-absolute path.
///
/// `path` must start with `/`; with an empty base the path comes back
/// unchanged.
pub fn join(base: &str, path: &str) -> String {
    debug_assert!(path.starts_with('/'));
    format!("{base}{path}")
}

/// Strips the trailing slash from a configured site origin so it can be
/// concatenated with base-path-prefixed paths.
pub fn site_origin(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
