#![warn(missing_docs)]

//! Launch a WebKitGTK `WebKitWebDriver` from the command line.
//!
//! # Examples
//!
//! ```bash
//! webkitgtk-service --port 4444 args
//! webkitgtk-service --config ./webkitgtk.json run
//! ```
//!
//! Where `webkitgtk.json` looks like:
//!
//! ```json
//! {
//!   "executablePath": "/usr/libexec/webkit2gtk-4.1/WebKitWebDriver",
//!   "port": 4444,
//!   "logOutput": "/tmp/webkitwebdriver.log",
//!   "serviceArgs": ["--replace-on-new-session"],
//!   "settings": { "startTimeout": 10000 }
//! }
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use log::info;
use tokio_util::sync::CancellationToken;
use webkitgtk_service::{CommandLine, WebKitGtkConfig, WebKitGtkService};

/// WebKitGTK WebDriver launcher
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a json service configuration
    ///
    /// Every key is optional, defaults are used when the file is omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port for the driver, overriding the configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// The subcommand to run
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the driver command line without starting it
    Args,

    /// Run the driver until `Ctrl-C` or until it exits
    Run,
}

async fn read_config(path: &Path) -> Result<WebKitGtkConfig> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("Failed to read config file: {:?}", path))?;

    serde_json::from_slice(&bytes)
        .wrap_err_with(|| format!("Failed to parse config file: {:?}", path))
}

fn spawn_shutdown_task(cancel_tok: &CancellationToken) {
    let token = cancel_tok.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await?;
        token.cancel();
        Ok::<_, eyre::Report>(())
    });
}

async fn run(mut service: WebKitGtkService) -> Result<()> {
    let cancel_tok = CancellationToken::new();
    spawn_shutdown_task(&cancel_tok);

    service.start().await?;
    info!("WebKitWebDriver listening on {}", service.service_url());

    let exited = tokio::select! {
        _ = cancel_tok.cancelled() => {
            info!("Received shutdown signal");
            None
        }
        status = service.wait() => Some(status?),
    };

    service.stop().await?;

    if let Some(status) = exited {
        eyre::ensure!(
            status.success(),
            "WebKitWebDriver exited with status: {}",
            status
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path).await?,
        None => WebKitGtkConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    let service = WebKitGtkService::new(config)?;

    match args.command {
        Command::Args => {
            let mut line = vec![service.process().path().display().to_string()];
            line.extend(service.command_line_args());
            println!("{}", line.join(" "));
            Ok(())
        }
        Command::Run => run(service).await,
    }
}
