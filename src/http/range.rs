//! HTTP Range request negotiation module
//!
//! Range header parsing for resumable downloads (RFC 7233). Overlapping and
//! adjacent ranges are combined; anything that still leaves more than one
//! range is served as a full response, since multipart bodies are not
//! produced.

use crate::logger;

/// Inclusive byte range within an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// `Content-Range` value for this range, e.g. `bytes 0-99/1000`
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// Why a `Range` header was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredRange {
    Malformed,
    MultipleRanges,
}

/// Range negotiation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole artifact
    Full,
    /// Serve one window with 206
    Single(ByteRange),
    /// Answer 416
    Unsatisfiable,
    /// Header present but unusable; serve the whole artifact
    Ignored(IgnoredRange),
}

impl RangeOutcome {
    /// Byte window to read for this outcome
    pub fn window(&self, size: u64) -> ByteWindow {
        match self {
            Self::Single(range) => ByteWindow {
                offset: range.start,
                len: range.end - range.start + 1,
            },
            _ => ByteWindow { offset: 0, len: size },
        }
    }
}

/// Read window handed to the streaming layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    pub offset: u64,
    pub len: u64,
}

impl ByteWindow {
    /// Inclusive `[start, end]` read bounds; never ends before it starts
    pub fn bounds(&self) -> (u64, u64) {
        let start = self.offset;
        let end = (start + self.len).saturating_sub(1).max(start);
        (start, end)
    }
}

/// Whether a `Range` value uses the `bytes` unit (leading spaces allowed,
/// case-insensitive)
pub fn is_bytes_range(value: &str) -> bool {
    value
        .trim_start_matches(' ')
        .get(..5)
        .is_some_and(|unit| unit.eq_ignore_ascii_case("bytes"))
}

/// Negotiate a `Range` header against an artifact of `size` bytes.
///
/// `fresh` is the `If-Range` verdict; a stale validator downgrades the
/// request to a full response.
pub fn negotiate(range_header: Option<&str>, size: u64, fresh: bool) -> RangeOutcome {
    let Some(header) = range_header.filter(|h| is_bytes_range(h)) else {
        return RangeOutcome::Full;
    };
    if !fresh {
        return RangeOutcome::Full;
    }

    match parse_ranges(header, size) {
        ParsedRanges::Malformed => {
            logger::log_malformed_range();
            RangeOutcome::Ignored(IgnoredRange::Malformed)
        }
        ParsedRanges::Unsatisfiable => {
            logger::log_unsatisfiable_range();
            RangeOutcome::Unsatisfiable
        }
        ParsedRanges::Ranges(ranges) => match ranges.as_slice() {
            [single] => RangeOutcome::Single(*single),
            _ => {
                logger::log_multiple_ranges();
                RangeOutcome::Ignored(IgnoredRange::MultipleRanges)
            }
        },
    }
}

#[derive(Debug)]
enum ParsedRanges {
    Malformed,
    Unsatisfiable,
    Ranges(Vec<ByteRange>),
}

/// Parse `bytes=a-b,c-,-d` into combined ranges.
///
/// Parts that are not numbers or that fall outside the artifact are
/// skipped; if none survive the header is unsatisfiable.
fn parse_ranges(header: &str, size: u64) -> ParsedRanges {
    let Some((_, spec)) = header.split_once('=') else {
        return ParsedRanges::Malformed;
    };

    let mut ranges: Vec<ByteRange> = spec
        .split(',')
        .filter_map(|part| parse_part(part, size))
        .collect();

    if ranges.is_empty() {
        return ParsedRanges::Unsatisfiable;
    }

    ranges.sort_by_key(|r| r.start);
    let mut combined: Vec<ByteRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match combined.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => combined.push(range),
        }
    }

    ParsedRanges::Ranges(combined)
}

fn parse_part(part: &str, size: u64) -> Option<ByteRange> {
    let (start_str, end_str) = part.split_once('-')?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());
    let last = size.checked_sub(1)?;

    let (start, end) = if start_str.is_empty() {
        // Suffix range: "-500" means the last 500 bytes
        let suffix: u64 = end_str.parse().ok()?;
        (size.checked_sub(suffix)?, last)
    } else {
        let start: u64 = start_str.parse().ok()?;
        let end = if end_str.is_empty() {
            last
        } else {
            end_str.parse::<u64>().ok()?.min(last)
        };
        (start, end)
    };

    (start <= end).then_some(ByteRange { start, end })
}
