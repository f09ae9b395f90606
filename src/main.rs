use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use time::UtcOffset;
use tracing::{debug, info};

use photo_report_rust::{logging, server, settings, workspace};

#[derive(Parser, Debug)]
#[command(
    name = "photo-report-rust",
    version,
    about = "Generate photo inspection reports as PDF"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Bind host (overrides settings)
        #[arg(long = "host")]
        host: Option<String>,

        /// Bind port (overrides settings and PORT)
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Render a JSON request file to a PDF without starting the server
    Render {
        /// Request JSON file
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Output PDF path
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // The local offset can only be read while the process is single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let cli = Cli::parse();
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?
        .block_on(run(cli, offset))
}

async fn run(cli: Cli, offset: UtcOffset) -> Result<()> {
    let mut settings = settings::load_settings(cli.read_settings.as_deref())?;
    settings.apply_env(|key| std::env::var(key).ok())?;
    logging::init(cli.verbose || settings.server.debug)?;
    workspace::prepare(&settings.paths)?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            info!("photo report server starting");
            info!("port: {}", settings.server.port);
            info!("debug: {}", settings.server.debug);
            workspace::log_startup(&settings.paths);
            debug!("filename timestamps use offset {}", offset);
            server::run_server(settings, offset).await
        }
        Command::Render { input, output } => {
            let report = tokio::task::spawn_blocking(move || {
                photo_report_rust::render_file(&input, &output, &settings)
                    .map(|report| (report, output))
            })
            .await
            .context("render task failed")??;
            let (report, output) = report;
            info!(
                "wrote {} ({} page(s), {} photo(s), {} skipped)",
                output.display(),
                report.pages,
                report.embedded,
                report.skipped
            );
            Ok(())
        }
    }
}
