//! Raw HTTP/1.1 response serialization. One response per connection.

use http::StatusCode;
use serde::Serialize;
use sysmon_shared::response::ErrorBody;
use tracing::error;

use crate::platform::Platform;

pub const SERVER_NAME: &str = concat!("sysmon/", env!("CARGO_PKG_VERSION"));

const SERIALIZATION_FAILURE: &str =
    "{\n  \"error\": 500,\n  \"message\": \"Internal Server Error\"\n}";

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
    headers: Vec<(&'static str, String)>,
}

impl Response {
    /// Pretty-printed JSON body.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_string_pretty(body) {
            Ok(body) => Self {
                status,
                body,
                headers: Vec::new(),
            },
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: SERIALIZATION_FAILURE.to_string(),
                    headers: Vec::new(),
                }
            }
        }
    }

    pub fn error(status: StatusCode, platform: Platform) -> Self {
        let body = ErrorBody {
            error: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Error").to_string(),
            platform: platform.name().to_string(),
        };
        Self::json(status, &body)
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Status line, headers and (unless answering HEAD) the body.
    pub fn to_bytes(&self, include_body: bool) -> Vec<u8> {
        let reason = self.status.canonical_reason().unwrap_or("");
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), reason);
        out.push_str("Content-Type: application/json\r\n");
        out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        out.push_str("Access-Control-Allow-Origin: *\r\n");
        out.push_str(&format!("Server: {SERVER_NAME}\r\n"));
        out.push_str("Cache-Control: no-cache\r\n");
        out.push_str("Connection: close\r\n");
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str("\r\n");
        if include_body {
            out.push_str(&self.body);
        }
        out.into_bytes()
    }
}
