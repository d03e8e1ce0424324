//! betwire-client binary.
//!
//! Usage:
//!   betwire-client --config /config.yaml
//!   CLI_ID=2 CLI_SERVER_ADDRESS=server:12345 betwire-client

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use betwire_client::{ingest, BetwireError, ClientBuilder, ClientConfig, Submission};

#[derive(Parser, Debug)]
#[command(name = "betwire-client")]
#[command(about = "Submit an agency's bets to the lottery server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "CLI_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Agency id
    #[arg(long, env = "CLI_ID")]
    id: Option<String>,

    /// Server address (host:port)
    #[arg(long, env = "CLI_SERVER_ADDRESS")]
    server_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Records per batch
    #[arg(long, env = "CLI_BATCH_MAXAMOUNT")]
    batch_max_amount: Option<usize>,

    /// CSV file with the agency's bets
    #[arg(long, env = "CLI_BETS_FILE")]
    bets_file: Option<PathBuf>,
}

impl Args {
    /// Apply command line and environment overrides on top of the file.
    fn apply(self, config: &mut ClientConfig) {
        if let Some(id) = self.id {
            config.id = id;
        }
        if let Some(address) = self.server_address {
            config.server.address = address;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(amount) = self.batch_max_amount {
            config.batch.max_amount = amount;
        }
        if let Some(path) = self.bets_file {
            config.bets_file = path;
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Flip the cancellation flag on SIGTERM or Ctrl-C.
fn spawn_shutdown_listener(cancel: watch::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = sigterm.recv() => {}
                        _ = tokio::signal::ctrl_c() => {}
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!(action = "signal", result = "success", "Shutdown requested");
        let _ = cancel.send(true);
    });
}

async fn run(args: Args) -> Result<(), BetwireError> {
    let path = args.config.clone();
    let config = ClientConfig::from_file_with(&path, |config| args.apply(config))?;

    init_logging(&config.log.level);
    info!(
        id = %config.id,
        server = %config.server.address,
        batch_max_amount = config.batch.max_amount,
        "Configuration loaded"
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    spawn_shutdown_listener(cancel_tx);

    let rows = ingest::read_rows_from_path(&config.bets_file)?;
    let (records, skipped) = ingest::records_from_rows(config.house_id()?, &rows);
    if skipped > 0 {
        warn!(skipped, "Some bet rows could not be parsed");
    }

    let client = ClientBuilder::from_config(&config).build()?;
    match client.run(&records, &cancel_rx).await? {
        Submission::Completed(report) => info!(
            action = "submission",
            result = "success",
            bets_sent = report.bets_sent,
            accepted = report.accepted,
            rejected = report.rejected,
            early_stop = report.early_stop,
            winners = report.winners.count(),
        ),
        Submission::Cancelled => info!(action = "submission", result = "cancelled"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let stage = e.stage().map_or("setup".to_string(), |s| s.to_string());
            error!(stage = %stage, "Client failed: {}", e);
            eprintln!("betwire-client: {} failed: {}", stage, e);
            ExitCode::FAILURE
        }
    }
}
