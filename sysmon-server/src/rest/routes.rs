use http::{Method, StatusCode};
use sysmon_shared::response::{EndpointDoc, HelpDocument};
use tracing::debug;

use crate::platform::Platform;
use crate::report;
use crate::rest::request::{BadRequest, RequestLine};
use crate::rest::response::Response;
use crate::server::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Metrics,
    TopProcesses,
    Help,
}

/// `(path, description)` for every served route, as listed by `/help`.
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("/", "Point-in-time host metrics"),
    ("/metrics", "Alias of /"),
    ("/processes/top", "Heaviest processes by CPU, memory and disk I/O"),
    ("/help", "This document"),
];

impl Route {
    pub fn resolve(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match path {
            "/" | "/metrics" => Some(Route::Metrics),
            "/processes/top" => Some(Route::TopProcesses),
            "/help" => Some(Route::Help),
            _ => None,
        }
    }
}

pub fn help_document(platform: Platform) -> HelpDocument {
    HelpDocument {
        service: "sysmon".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: platform.name().to_string(),
        endpoints: ENDPOINTS
            .iter()
            .map(|(path, description)| EndpointDoc {
                method: "GET".to_string(),
                path: path.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }
}

/// Build the single response for a parsed request. Runs metric
/// collection inline, so call it off the async runtime.
pub fn dispatch(state: &AppState, request: &Result<Option<RequestLine>, BadRequest>) -> Response {
    let platform = state.collector.platform();
    let request = match request {
        Ok(Some(line)) => line.clone(),
        Ok(None) => RequestLine::implicit(),
        Err(e) => {
            debug!(error = %e, "rejecting request");
            return Response::error(StatusCode::BAD_REQUEST, platform);
        }
    };

    if request.method != Method::GET && request.method != Method::HEAD {
        return Response::error(StatusCode::METHOD_NOT_ALLOWED, platform)
            .with_header("Allow", "GET, HEAD");
    }

    match Route::resolve(&request.path) {
        Some(Route::Metrics) => {
            let snapshot = state.collector.snapshot();
            Response::json(StatusCode::OK, &report::metrics_report(&snapshot))
        }
        Some(Route::TopProcesses) => {
            let top = state.collector.top_processes(state.config.top_limit);
            Response::json(
                StatusCode::OK,
                &report::top_processes_report(&top, platform),
            )
        }
        Some(Route::Help) => Response::json(StatusCode::OK, &help_document(platform)),
        None => Response::error(StatusCode::NOT_FOUND, platform),
    }
}
