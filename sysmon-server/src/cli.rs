use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::time::Duration;

use crate::client;
use crate::collector::Collector;
use crate::config::{
    validate_top_limit, ServerConfig, DEFAULT_PORT, DEFAULT_READ_TIMEOUT_MS, DEFAULT_TOP_LIMIT,
};
use crate::platform::Platform;
use crate::report;
use crate::server;
use crate::util::logging::init_tracing;

#[derive(Parser)]
#[command(name = "sysmon")]
#[command(version, about = "Single-host metrics endpoint serving system statistics as JSON", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Server options used when no command is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the metrics endpoint (the default)
    Serve(ServeArgs),

    /// Show the detected platform and where each metric is read from
    Platform,

    /// Print the heaviest processes and exit
    Processes {
        /// Entries per ranking
        #[arg(long, default_value_t = DEFAULT_TOP_LIMIT)]
        top: usize,
    },

    /// Query a running endpoint
    Fetch(FetchArgs),

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "SYSMON_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "SYSMON_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// How long to wait for a request line before answering with metrics
    #[arg(long, env = "SYSMON_READ_TIMEOUT_MS", default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    pub read_timeout_ms: u64,

    /// Entries per ranking on /processes/top
    #[arg(long, env = "SYSMON_TOP", default_value_t = DEFAULT_TOP_LIMIT)]
    pub top: usize,
}

impl ServeArgs {
    pub fn into_config(self) -> Result<ServerConfig> {
        let config = ServerConfig {
            bind: self.bind,
            port: self.port,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            top_limit: self.top,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct FetchArgs {
    /// Host running the endpoint
    #[arg(default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Path to request, e.g. /processes/top
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Print the body exactly as received
    #[arg(long)]
    pub raw: bool,
}

pub fn render_platform(platform: Platform) -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let sources: String = platform
        .data_sources()
        .iter()
        .map(|(metric, source)| format!("  {metric:<14} {source}\n"))
        .collect();
    format!(
        "Platform:        {platform}\n\
         Linux support:   {linux}\n\
         macOS support:   {macos}\n\
         Native source:   {native}\n\
         \n\
         Data sources:\n\
         {sources}\n\
         Fallback: sysinfo, then \"Unknown\"\n",
        linux = yes_no(platform == Platform::Linux),
        macos = yes_no(platform == Platform::MacOs),
        native = yes_no(platform.is_supported()),
    )
}

async fn fetch(args: FetchArgs) -> Result<()> {
    let response = client::fetch(&args.host, args.port, &args.path).await?;
    if args.raw {
        print!("{}", response.body);
        return Ok(());
    }
    if response.status != 200 {
        eprintln!("{}:{} answered {}", args.host, args.port, response.status);
    }
    println!("{}", client::render_body(&args.path, &response.body));
    Ok(())
}

async fn processes(top: usize) -> Result<()> {
    validate_top_limit(top)?;
    let platform = Platform::current();
    let top = tokio::task::spawn_blocking(move || {
        Collector::for_platform(platform).top_processes(top)
    })
    .await
    .context("process collection panicked")?;
    let report = report::top_processes_report(&top, platform);
    print!("{}", client::render_top_processes(&report));
    Ok(())
}

pub async fn cli() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        None => server::run(cli.serve.into_config()?).await?,
        Some(Commands::Serve(args)) => server::run(args.into_config()?).await?,
        Some(Commands::Platform) => print!("{}", render_platform(Platform::current())),
        Some(Commands::Processes { top }) => processes(top).await?,
        Some(Commands::Fetch(args)) => fetch(args).await?,
        Some(Commands::Version) => {
            println!("sysmon version {}", env!("CARGO_PKG_VERSION"));
            println!("Platform: {}", Platform::current());
            println!("Default port: {}", DEFAULT_PORT);
        }
    }

    Ok(())
}
