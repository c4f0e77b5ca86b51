//! HTTP cache validation module
//!
//! Provides `ETag`/`Last-Modified` generation and conditional request
//! evaluation (`If-Match`, `If-Unmodified-Since`, `If-None-Match`,
//! `If-Modified-Since`, `If-Range`).
//!
//! Entity tags always compare weakly: `W/"x"` matches `"x"` in both
//! directions.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, Utc};
use hyper::header::{
    HeaderMap, HeaderName, CACHE_CONTROL, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    IF_UNMODIFIED_SINCE,
};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Generate a weak `ETag` from file metadata
///
/// # Returns
/// `W/"<size hex>-<mtime millis hex>"`, e.g. `W/"1388-18b2c4a5e10"`
pub fn generate_etag(size: u64, mtime: SystemTime) -> String {
    let millis = mtime
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("W/\"{size:x}-{millis:x}\"")
}

/// Format a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date (IMF-fixdate, RFC 850 or asctime)
///
/// Returns `None` for anything unparsable; callers ignore such headers.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn etag_matches(token: &str, etag: &str) -> bool {
    token == etag
        || token.strip_prefix("W/") == Some(etag)
        || etag.strip_prefix("W/") == Some(token)
}

fn tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Conditional request headers of one request
pub struct Conditional<'a> {
    headers: &'a HeaderMap,
}

impl<'a> Conditional<'a> {
    pub const fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }

    fn header(&self, name: &HeaderName) -> Option<&'a str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    /// Any of `If-Match`, `If-Unmodified-Since`, `If-None-Match`, `If-Modified-Since`
    pub fn is_conditional(&self) -> bool {
        [&IF_MATCH, &IF_UNMODIFIED_SINCE, &IF_NONE_MATCH, &IF_MODIFIED_SINCE]
            .into_iter()
            .any(|name| self.header(name).is_some())
    }

    /// Whether the request must be answered with 412.
    ///
    /// `If-Match` wins over `If-Unmodified-Since`; an unparsable
    /// `If-Unmodified-Since` is ignored.
    pub fn is_precondition_failure(&self, etag: Option<&str>, last_modified: Option<&str>) -> bool {
        if let Some(if_match) = self.header(&IF_MATCH) {
            let Some(etag) = etag else {
                return true;
            };
            return if_match != "*" && !tokens(if_match).any(|t| etag_matches(t, etag));
        }

        let Some(since) = self.header(&IF_UNMODIFIED_SINCE).and_then(parse_http_date) else {
            return false;
        };
        last_modified
            .and_then(parse_http_date)
            .is_none_or(|modified| modified > since)
    }

    /// Whether the client's cached copy is still current (answer 304).
    pub fn is_fresh(&self, etag: Option<&str>, last_modified: Option<&str>) -> bool {
        // End-to-end reload
        if self
            .header(&CACHE_CONTROL)
            .is_some_and(|cc| tokens(cc).any(|t| t == "no-cache"))
        {
            return false;
        }

        let none_match = self.header(&IF_NONE_MATCH);
        let modified_since = self.header(&IF_MODIFIED_SINCE);

        if none_match.is_none() && modified_since.is_none() {
            return false;
        }

        if let Some(none_match) = none_match {
            if none_match == "*" {
                return true;
            }
            return etag.is_some_and(|etag| tokens(none_match).any(|t| etag_matches(t, etag)));
        }

        let since = modified_since.and_then(parse_http_date);
        let modified = last_modified.and_then(parse_http_date);
        matches!((modified, since), (Some(modified), Some(since)) if modified <= since)
    }

    /// Whether a `Range` request may be honored given `If-Range`.
    pub fn is_range_fresh(&self, etag: Option<&str>, last_modified: Option<&str>) -> bool {
        let Some(if_range) = self.header(&IF_RANGE) else {
            return true;
        };

        if if_range.contains('"') {
            return etag.is_none_or(|etag| if_range.contains(etag));
        }

        let Some(modified) = last_modified.and_then(parse_http_date) else {
            return true;
        };
        parse_http_date(if_range).is_none_or(|since| modified <= since)
    }
}
