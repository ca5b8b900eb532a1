// === Core modules ===
pub mod collector;
pub mod platform;
pub mod report;

// === Serving ===
pub mod config;
pub mod rest;
pub mod server;

pub mod client;
pub mod util;

// === CLI entrypoint ===
pub mod cli;

/// Entrypoint used by `main.rs` to run the full CLI.
pub async fn run_cli() -> anyhow::Result<()> {
    cli::cli().await
}
