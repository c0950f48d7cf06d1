//! The whole run: catalog -> targets -> concurrent sync -> normalisation.
//!
//! `run` wires the real MSE client and CSV store; `run_with` takes any transport
//! and store so the flow can be exercised without a network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use metrics::histogram;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::engine::scheduler::Scheduler;
use crate::engine::sync::SyncEngine;
use crate::engine::target::plan_targets;
use crate::engine::types::{Instrument, SyncOutcome, SyncStatus};
use crate::error::AppError;
use crate::market_data::adapters::mse::MseClient;
use crate::market_data::adapters::{Throttled, Transport};
use crate::market_data::catalog;
use crate::market_data::fetcher::RangeFetcher;
use crate::market_data::normaliser::normalise_table;
use crate::persist::{CsvStore, PersistError, TableStore};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<SyncOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::Written { .. }))
    }

    pub fn no_data(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::NoData))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SyncStatus::Failed(_)))
    }

    /// True only when there was work to do and not a single instrument was written.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(SyncOutcome::is_failure)
    }

    fn count(&self, pred: impl Fn(&SyncStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

pub async fn run(settings: &Settings) -> Result<RunSummary, AppError> {
    let client = MseClient::new(settings)?;
    let transport = Arc::new(Throttled::new(client, settings.concurrency));
    let store = Arc::new(CsvStore::open(&settings.data_dir)?);
    run_with(transport, store, settings, Local::now().date_naive()).await
}

pub async fn run_with<T, S>(
    transport: Arc<T>,
    store: Arc<S>,
    settings: &Settings,
    today: NaiveDate,
) -> Result<RunSummary, AppError>
where
    T: Transport + 'static,
    S: TableStore + 'static,
{
    let mut instruments = explicit_instruments(&settings.symbols);
    if instruments.is_empty() {
        instruments = catalog::discover(transport.as_ref()).await?;
    }

    let targets = plan_targets(instruments, store.as_ref(), today, settings.lookback_days).await;

    let started = Instant::now();
    let engine = SyncEngine::new(RangeFetcher::new(Arc::clone(&transport)), Arc::clone(&store), today);
    let outcomes = Scheduler::new(engine).run(targets).await;
    let elapsed = started.elapsed();
    histogram!("mse_run_seconds").record(elapsed.as_secs_f64());

    if settings.normalise {
        normalise_written(store.as_ref(), &outcomes).await;
    }

    let summary = RunSummary { outcomes, elapsed };
    info!(
        written = summary.written(),
        no_data = summary.no_data(),
        failed = summary.failed(),
        "program elapsed time: {:.2}s",
        elapsed.as_secs_f64()
    );
    Ok(summary)
}

/// Codes given on the command line or in config, trimmed, blanks dropped.
pub fn explicit_instruments(symbols: &[String]) -> Vec<Instrument> {
    symbols
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(Instrument::new)
        .collect()
}

/// Rewrites each freshly written table in canonical form. Runs after every sync has
/// settled so rows from every window get the same treatment.
pub async fn normalise_written<S: TableStore + ?Sized>(store: &S, outcomes: &[SyncOutcome]) {
    for outcome in outcomes.iter().filter(|o| !o.is_failure()) {
        match normalise_one(store, &outcome.instrument).await {
            Ok(true) => info!(instrument = %outcome.instrument, "formatted price and date"),
            Ok(false) => warn!(instrument = %outcome.instrument, "table vanished before formatting"),
            Err(err) => error!(instrument = %outcome.instrument, error = %err, "formatting failed"),
        }
    }
}

async fn normalise_one<S: TableStore + ?Sized>(store: &S, instrument: &Instrument) -> Result<bool, PersistError> {
    let Some(mut table) = store.read(instrument).await? else {
        return Ok(false);
    };
    normalise_table(&mut table);
    store.write(instrument, &table).await?;
    Ok(true)
}
