//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.
//! Unknown extensions get no Content-Type at all.

use std::path::Path;

/// Look up the media type for a file name or bare extension
///
/// # Examples
/// ```
/// use devserve::http::mime::lookup;
/// assert_eq!(lookup("bundle.js"), Some("text/javascript"));
/// assert_eq!(lookup("MP4"), Some("video/mp4"));
/// assert_eq!(lookup("archive.xyz"), None);
/// ```
pub fn lookup(name: &str) -> Option<&'static str> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(name)
        .to_ascii_lowercase();

    Some(match extension.as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "text/xml",

        // JavaScript/WASM
        "js" | "mjs" | "cjs" => "text/javascript",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",

        _ => return None,
    })
}

/// Full `Content-Type` header value for a file, with `charset=utf-8`
/// appended to textual and JSON types
pub fn content_type(name: &str) -> Option<String> {
    let mime = lookup(name)?;
    if mime.starts_with("text/") || mime == "application/json" || mime == "application/manifest+json" {
        Some(format!("{mime}; charset=utf-8"))
    } else {
        Some(mime.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type("index.html").as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(content_type("main.css").as_deref(), Some("text/css; charset=utf-8"));
        assert_eq!(
            content_type("/dist/bundle.js").as_deref(),
            Some("text/javascript; charset=utf-8")
        );
        assert_eq!(content_type("data.json").as_deref(), Some("application/json; charset=utf-8"));
        assert_eq!(
            content_type("site.webmanifest").as_deref(),
            Some("application/manifest+json; charset=utf-8")
        );
        assert_eq!(content_type("logo.png").as_deref(), Some("image/png"));
        assert_eq!(content_type("icon.svg").as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(lookup("PHOTO.JPG"), Some("image/jpeg"));
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(lookup("file.xyz"), None);
        assert_eq!(content_type("noext"), None);
        assert_eq!(content_type("/dist/%foo%"), None);
    }
}
