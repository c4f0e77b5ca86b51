//! Artifact resolution
//!
//! Turns a request URL into a file inside one of the build's output roots.

use std::path::PathBuf;
use std::time::SystemTime;

use percent_encoding::percent_decode_str;

use super::url_pathname;
use crate::build::OutputRoot;
use crate::error::ServeError;
use crate::fs::OutputFileSystem;
use crate::logger;

/// What to serve when a request names a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexPolicy {
    Disabled,
    File(String),
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self::File("index.html".to_string())
    }
}

/// A file found for a request; stat'ed fresh on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: SystemTime,
}

/// Resolve `url` against `roots` in order.
///
/// `Ok(None)` means nothing matched (or the URL does not decode) and the
/// request should pass through. Null bytes and parent-directory traversal are
/// rejected before any filesystem access.
pub fn resolve(
    fs: &dyn OutputFileSystem,
    roots: &[OutputRoot],
    url: &str,
    index: &IndexPolicy,
) -> Result<Option<ResolvedArtifact>, ServeError> {
    let Ok(pathname) = percent_decode_str(url_pathname(url)).decode_utf8() else {
        return Ok(None);
    };

    if pathname.contains('\0') {
        logger::log_null_byte_path(&pathname);
        return Err(ServeError::NullByte);
    }

    for root in roots {
        let Some(relative) = pathname.strip_prefix(root.public_prefix.as_str()) else {
            continue;
        };

        let Some(segments) = normalize(relative) else {
            logger::log_malicious_path(&pathname);
            return Err(ServeError::Traversal(pathname.into_owned()));
        };

        let mut candidate = root.output_path.clone();
        candidate.extend(&segments);

        let Ok(stat) = fs.stat(&candidate) else {
            continue;
        };

        if stat.is_file() {
            return Ok(Some(ResolvedArtifact {
                path: candidate,
                size: stat.size,
                mtime: stat.mtime,
            }));
        }

        if stat.is_dir() {
            if let IndexPolicy::File(name) = index {
                candidate.push(name);
                match fs.stat(&candidate) {
                    Ok(stat) if stat.is_file() => {
                        return Ok(Some(ResolvedArtifact {
                            path: candidate,
                            size: stat.size,
                            mtime: stat.mtime,
                        }));
                    }
                    _ => continue,
                }
            }
        }
    }

    Ok(None)
}

/// Lexically normalize a root-relative path, splitting on `/` and `\`.
///
/// Returns `None` if the path climbs above the root.
fn normalize(relative: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments)
}
