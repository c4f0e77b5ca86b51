//! Routing module
//!
//! Maps request URLs onto build output:
//! - URL pathname extraction (query, fragment and origin dropped)
//! - Public prefix matching across output roots, first match wins
//! - Traversal and null-byte defense
//! - Directory index lookup

mod resolver;

pub use resolver::{resolve, IndexPolicy, ResolvedArtifact};

/// Pathname part of a request target or public path.
///
/// Fragment and query are dropped. Absolute (`http://host/x`) and
/// protocol-relative (`//host/x`) URLs are reduced to their path; a URL with
/// no path yields `""`.
pub fn url_pathname(url: &str) -> &str {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let url = url.split_once('?').map_or(url, |(before, _)| before);

    let authority = match url.find("://") {
        Some(idx) if is_scheme(&url[..idx]) => Some(&url[idx + 3..]),
        _ => url.strip_prefix("//"),
    };

    match authority {
        Some(rest) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => url,
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
