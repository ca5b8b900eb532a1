//! Request-line parsing. Headers and bodies are never interpreted.

use http::Method;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    /// Target with query string and fragment removed.
    pub path: String,
    pub version: String,
}

impl RequestLine {
    /// Stand-in for a client that connected and sent nothing.
    pub fn implicit() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            version: "HTTP/1.1".to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BadRequest {
    #[error("request line is not valid UTF-8")]
    NotUtf8,
    #[error("malformed request line")]
    Malformed,
    #[error("invalid method `{0}`")]
    Method(String),
}

/// Parse the first line of `buf`. `Ok(None)` when the client sent nothing.
pub fn parse(buf: &[u8]) -> Result<Option<RequestLine>, BadRequest> {
    let end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let line = std::str::from_utf8(&buf[..end])
        .map_err(|_| BadRequest::NotUtf8)?
        .trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut parts = line.split_ascii_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(BadRequest::Malformed);
    };
    if !version.starts_with("HTTP/") {
        return Err(BadRequest::Malformed);
    }
    let method =
        Method::from_bytes(method.as_bytes()).map_err(|_| BadRequest::Method(method.to_string()))?;

    Ok(Some(RequestLine {
        method,
        path: normalize_target(target)?,
        version: version.to_string(),
    }))
}

/// Origin-form and absolute-form targets reduce to a bare path.
fn normalize_target(target: &str) -> Result<String, BadRequest> {
    let without_authority = match target.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => target,
    };
    let path = without_authority
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if !path.starts_with('/') {
        return Err(BadRequest::Malformed);
    }
    Ok(path.to_string())
}
