use std::process::ExitCode;

use clap::Parser;
use mse_backfill::config::{Cli, Settings};
use mse_backfill::engine::types::SyncStatus;
use mse_backfill::{pipeline, telemetry};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(err.exit_code()));
        }
    };

    telemetry::init_tracing(&settings.log_filter);
    telemetry::init_metrics()?;

    let summary = match pipeline::run(&settings).await {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "run aborted");
            return Ok(ExitCode::from(err.exit_code()));
        }
    };

    for outcome in &summary.outcomes {
        match &outcome.status {
            SyncStatus::Written { location, fetched, total } => {
                info!(instrument = %outcome.instrument, fetched, total, "{location}")
            }
            SyncStatus::NoData => warn!(instrument = %outcome.instrument, "no new data"),
            SyncStatus::Failed(reason) => error!(instrument = %outcome.instrument, "{reason}"),
        }
    }

    if summary.all_failed() {
        error!("every instrument failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
