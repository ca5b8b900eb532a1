//! Minimal HTTP glue: read a request line, answer once, close.

pub mod request;
pub mod response;
pub mod routes;

use anyhow::{Context, Result};
use http::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::config::REQUEST_BUFFER_SIZE;
use crate::server::AppState;

/// Upper bound on draining a client after the response went out.
const LINGER: Duration = Duration::from_millis(100);

/// Serve exactly one response on `stream` and close it.
///
/// A client that stays silent past the read timeout is answered as if it
/// had sent `GET /`.
pub async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> Result<StatusCode> {
    let mut buf = vec![0u8; REQUEST_BUFFER_SIZE];
    let read = match timeout(state.config.read_timeout, stream.read(&mut buf)).await {
        Ok(read) => read.context("failed to read request")?,
        Err(_) => {
            debug!("client sent no request line before the read timeout");
            0
        }
    };

    let parsed = request::parse(&buf[..read]);
    let head_only = matches!(&parsed, Ok(Some(line)) if line.method == Method::HEAD);
    if let Ok(Some(line)) = &parsed {
        debug!(method = %line.method, path = %line.path, "request");
    }

    let response = tokio::task::spawn_blocking(move || routes::dispatch(&state, &parsed))
        .await
        .context("request handler panicked")?;

    stream
        .write_all(&response.to_bytes(!head_only))
        .await
        .context("failed to write response")?;
    let _ = stream.shutdown().await;

    // unread request bytes would turn the close into a reset
    let mut sink = [0u8; 512];
    let _ = timeout(LINGER, async {
        while let Ok(n) = stream.read(&mut sink).await {
            if n == 0 {
                break;
            }
        }
    })
    .await;

    Ok(response.status)
}
