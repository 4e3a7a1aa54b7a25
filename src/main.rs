//! PAMSignal - SSH login alerting daemon
//!
//! Tails the auth log and notifies operators through Telegram, Slack and
//! webhooks whenever someone logs in over SSH.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pamsignal::config::AppConfig;
use pamsignal::monitoring::alert_message::format_test_alert;
use pamsignal::monitoring::{AuthLogWatcher, EventProcessor};
use pamsignal::notification::AlertDispatcher;
use pamsignal::shutdown::cancel_on_signal;
use pamsignal::utils::logging::init_logging;
use pamsignal::utils::{AppError, HostInfo};

/// PAMSignal CLI.
#[derive(Parser)]
#[command(name = "pamsignal")]
#[command(about = "Alerts operators on successful SSH logins")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "PAMSIGNAL_CONFIG",
        default_value = "/etc/pamsignal/pamsignal.toml"
    )]
    config: PathBuf,

    /// Also write daily-rotated log files to this directory
    #[arg(long, env = "PAMSIGNAL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Send one test alert to every configured channel and exit
    #[arg(long)]
    test_alert: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 2. Initialize logging
    let _guard = init_logging(cli.log_dir.as_deref());

    // 3. Run
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, error_code = e.error_code(), "PAMSignal failed");
            eprintln!("pamsignal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let config = AppConfig::load(&cli.config)?;
    info!(
        config = %cli.config.display(),
        log_path = %config.general.log_path.display(),
        provider = %config.general.provider,
        "Configuration loaded"
    );

    let host = HostInfo::detect();
    let dispatcher = AlertDispatcher::from_config(&config)?;

    if cli.test_alert {
        let message = format_test_alert(&config.general, &host);
        let report = dispatcher.dispatch(&message).await;
        return Ok(if report.success_count() > 0 {
            info!(succeeded = report.success_count(), "Test alert delivered");
            ExitCode::SUCCESS
        } else {
            error!(failed = ?report.failed_channels(), "Test alert was not delivered");
            ExitCode::FAILURE
        });
    }

    let mut watcher = AuthLogWatcher::new(&config.general.log_path);
    watcher.start_at_end()?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    info!(hostname = %host.hostname, "PAMSignal started");
    let processor = EventProcessor::new(watcher, dispatcher, config.general, host);
    tokio::spawn(processor.run(cancel))
        .await
        .map_err(|e| AppError::internal_error(format!("watch loop task failed: {e}")))?;
    info!("PAMSignal stopped");

    Ok(ExitCode::SUCCESS)
}
