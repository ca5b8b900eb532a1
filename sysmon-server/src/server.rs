use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collector::Collector;
use crate::config::ServerConfig;
use crate::platform::Platform;
use crate::rest::handle_connection;
use crate::util::shutdown::SHUTDOWN;

/// Pause after a failed accept so persistent errors (EMFILE) do not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Everything a request handler needs.
pub struct AppState {
    pub collector: Collector,
    pub config: ServerConfig,
}

pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.socket_addr();
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Accept and answer connections one at a time until `shutdown` fires.
///
/// Each connection is handled to completion before the next accept, so
/// cancellation takes effect between connections.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<()> {
    while let Some((stream, peer)) = accept_next(|| listener.accept(), &shutdown).await {
        info!(%peer, "client connected");
        match handle_connection(stream, state.clone()).await {
            Ok(status) => info!(%peer, status = status.as_u16(), "response sent"),
            Err(e) => warn!(%peer, "connection failed: {:#}", e),
        }
    }

    info!("Stopped accepting connections");
    Ok(())
}

/// Next accepted connection, retrying after errors. `None` once `shutdown` fires.
async fn accept_next<T, F, Fut>(mut accept: F, shutdown: &CancellationToken) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => return None,
            accepted = accept() => accepted,
        };

        match accepted {
            Ok(conn) => return Some(conn),
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => return None,
                    _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
                }
            }
        }
    }
}

/// Bind, log the banner and serve until Ctrl+C / SIGTERM.
pub async fn run(config: ServerConfig) -> Result<()> {
    config.validate()?;

    let platform = Platform::current();
    info!("Starting sysmon {} on {}", env!("CARGO_PKG_VERSION"), platform);
    if !platform.is_supported() {
        warn!(
            "Platform {} has no native metrics source; serving portable metrics only",
            platform
        );
    }

    let collector = Collector::for_platform(platform);
    info!(sources = ?collector.source_names(), "metric sources");

    let listener = bind(&config).await?;
    let local = listener.local_addr().context("listener has no local address")?;
    info!("Listening on http://{}", local);

    let state = Arc::new(AppState { collector, config });
    serve(listener, state, SHUTDOWN.clone()).await
}
