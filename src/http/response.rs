//! HTTP response building module
//!
//! Body constructors, the shared error page and header helpers used by the
//! request pipeline.

use std::io;

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use hyper::{Response, StatusCode};

/// Body type of every response the middleware produces
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed_unsync()
}

pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync()
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn error_document(status: StatusCode) -> String {
    let reason = status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), ToString::to_string);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Error</title>\n</head>\n<body>\n<pre>{}</pre>\n</body>\n</html>",
        escape_html(&reason)
    )
}

/// Build the minimal HTML error page
///
/// Nothing but the status phrase is exposed. Only `extra_headers` (e.g.
/// `Content-Range` for 416) survive alongside the page's own headers.
pub fn build_error_response(status: StatusCode, extra_headers: HeaderMap) -> Response<ResponseBody> {
    let document = error_document(status);

    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.extend(extra_headers);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static("default-src 'none'"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(document.len()));
    *response.body_mut() = full_body(document);
    response
}

/// Drop the content headers a 304 must not carry
pub fn strip_content_headers(headers: &mut HeaderMap) {
    for name in [CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE] {
        headers.remove(name);
    }
}

/// Build 404 Not Found response for requests nothing handled
pub fn build_404_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/plain")
        .body(full_body("404 Not Found"))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body("404 Not Found"))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
