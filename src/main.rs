//! handler - vaultfn custom handler executable
//!
//! Launched by the Azure Functions host, which forwards HTTP trigger
//! invocations to it.

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use vaultfn::cli::Cli;
use vaultfn::config;
use vaultfn::Result;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging; the config file may still turn on debug later
    let filter = init_logging(cli.debug || debug_from_env());

    // Execute the command
    if let Err(e) = run(cli, filter).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, filter: Option<FilterHandle>) -> Result<()> {
    info!("Starting vaultfn {}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(cli.config.as_deref()).await?;
    cli.apply_overrides(&mut config)?;

    if config.debug {
        if let Some(handle) = &filter {
            enable_debug(handle);
        }
    }

    cli.execute(config).await
}

fn debug_from_env() -> bool {
    std::env::var("DEBUG")
        .map(|value| value.to_lowercase() == "true" || value == "1")
        .unwrap_or(false)
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "vaultfn=debug"
    } else {
        "vaultfn=info"
    }
}

/// Install the subscriber. Returns a handle to the filter unless `RUST_LOG`
/// chose it, in which case the filter is left alone.
fn init_logging(debug: bool) -> Option<FilterHandle> {
    let json = std::env::var("LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_directive(debug)), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    // Logs go to stderr; stdout is reserved for `token` and `secret` output.
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    (!from_env).then_some(handle)
}

fn enable_debug(handle: &FilterHandle) {
    if let Err(e) = handle.reload(EnvFilter::new(default_directive(true))) {
        warn!("Failed to enable debug logging: {}", e);
    }
}
