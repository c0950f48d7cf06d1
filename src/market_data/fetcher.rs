use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::engine::types::{DateWindow, Instrument, Table};
use crate::market_data::adapters::{Transport, TransportError};
use crate::market_data::html;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("source responded with status {0}")]
    Status(u16),
    #[error("no table found in response")]
    NoTable,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FetchError {
    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Status(_) => "status",
            FetchError::NoTable => "no_table",
            FetchError::Transport(_) => "transport",
        }
    }
}

/// Issues one request per window and returns the first table of the response.
pub struct RangeFetcher<T> {
    transport: Arc<T>,
}

impl<T> Clone for RangeFetcher<T> {
    fn clone(&self) -> Self {
        Self { transport: Arc::clone(&self.transport) }
    }
}

impl<T: Transport> RangeFetcher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Every failure is logged here and handed back as an `Err`; callers treat it as
    /// "no rows for this window" and carry on with the next one.
    #[instrument(level = "debug", skip_all, fields(instrument = %instrument, from = %window.from, to = %window.to))]
    pub async fn fetch(&self, instrument: &Instrument, window: &DateWindow) -> Result<Table, FetchError> {
        counter!("mse_windows_requested_total").increment(1);

        let result = self.try_fetch(instrument, window).await;
        match &result {
            Ok(table) => {
                counter!("mse_rows_fetched_total").increment(table.len() as u64);
                info!(rows = table.len(), "collected window for {} ({})", instrument, window);
            }
            Err(err) => {
                counter!("mse_window_failures_total", "reason" => err.reason()).increment(1);
                warn!(error = %err, "no rows for {} ({})", instrument, window);
            }
        }
        result
    }

    async fn try_fetch(&self, instrument: &Instrument, window: &DateWindow) -> Result<Table, FetchError> {
        let response = self.transport.history(instrument, window).await?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }
        html::first_table(&response.body).ok_or(FetchError::NoTable)
    }
}
