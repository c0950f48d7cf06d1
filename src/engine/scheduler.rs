// Fan-out/fan-in across instruments. The request cap lives in the shared transport
// (see `Throttled`); the scheduler only spawns, waits, and restores input order.

use futures::future::join_all;
use tracing::{error, info};

use crate::engine::sync::SyncEngine;
use crate::engine::types::{SyncOutcome, SyncStatus, SyncTarget};
use crate::market_data::adapters::Transport;
use crate::persist::TableStore;

pub struct Scheduler<T, S> {
    engine: SyncEngine<T, S>,
}

impl<T, S> Scheduler<T, S>
where
    T: Transport + 'static,
    S: TableStore + 'static,
{
    pub fn new(engine: SyncEngine<T, S>) -> Self {
        Self { engine }
    }

    /// Runs every target to completion. The result has one entry per target, in
    /// target order; a failing instrument never cancels the others.
    pub async fn run(&self, targets: Vec<SyncTarget>) -> Vec<SyncOutcome> {
        info!(instruments = targets.len(), "starting sync");

        let (instruments, tasks): (Vec<_>, Vec<_>) = targets
            .into_iter()
            .map(|target| {
                let engine = self.engine.clone();
                let instrument = target.instrument.clone();
                (instrument, tokio::spawn(async move { engine.sync(&target).await }))
            })
            .unzip();

        let joined = join_all(tasks).await;

        instruments
            .into_iter()
            .zip(joined)
            .map(|(instrument, result)| {
                let status = match result {
                    Ok(Ok(status)) => status,
                    Ok(Err(err)) => {
                        error!(instrument = %instrument, error = %err, "sync failed");
                        SyncStatus::Failed(err.to_string())
                    }
                    Err(join_err) => {
                        error!(instrument = %instrument, error = %join_err, "sync task aborted");
                        SyncStatus::Failed(format!("sync task aborted: {join_err}"))
                    }
                };
                SyncOutcome { instrument, status }
            })
            .collect()
    }
}
