// Per-instrument backfill: windows -> sequential fetches -> merge -> single write.

use std::sync::Arc;

use chrono::NaiveDate;
use metrics::counter;
use tracing::{error, info, instrument, warn};

use crate::engine::types::{Instrument, SyncStatus, SyncTarget, Table};
use crate::engine::window::windows;
use crate::market_data::adapters::Transport;
use crate::market_data::fetcher::RangeFetcher;
use crate::persist::{PersistError, TableStore};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to write table for {instrument}: {source}")]
    Write {
        instrument: Instrument,
        #[source]
        source: PersistError,
    },
}

/// Holds no per-instrument state, so one engine can serve every task concurrently.
pub struct SyncEngine<T, S> {
    fetcher: RangeFetcher<T>,
    store: Arc<S>,
    today: NaiveDate,
}

impl<T, S> Clone for SyncEngine<T, S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            store: Arc::clone(&self.store),
            today: self.today,
        }
    }
}

impl<T: Transport, S: TableStore> SyncEngine<T, S> {
    pub fn new(fetcher: RangeFetcher<T>, store: Arc<S>, today: NaiveDate) -> Self {
        Self { fetcher, store, today }
    }

    #[instrument(skip_all, fields(instrument = %target.instrument, since = %target.last_synced))]
    pub async fn sync(&self, target: &SyncTarget) -> Result<SyncStatus, SyncError> {
        let instrument = &target.instrument;

        // Windows go one at a time, newest first, so the accumulated order is stable.
        let mut fresh = Table::default();
        for window in windows(target.last_synced, self.today) {
            if let Ok(table) = self.fetcher.fetch(instrument, &window).await {
                fresh.append(table);
            }
        }

        if fresh.is_empty() {
            warn!("no data found for {} since {}", instrument, target.last_synced);
            return Ok(SyncStatus::NoData);
        }

        let existing = match self.store.read(instrument).await {
            Ok(existing) => existing,
            Err(err) => {
                error!(error = %err, "could not read existing table, writing fresh rows only");
                None
            }
        };

        let fetched = fresh.len();
        let mut merged = fresh;
        if let Some(existing) = existing {
            merged.append(existing);
        }
        let total = merged.len();

        let location = self
            .store
            .write(instrument, &merged)
            .await
            .map_err(|source| SyncError::Write { instrument: instrument.clone(), source })?;

        counter!("mse_tables_written_total").increment(1);
        info!(fetched, total, %location, "saved {}", instrument);
        Ok(SyncStatus::Written { location, fetched, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{DateWindow, Row};
    use crate::market_data::adapters::{RawResponse, TransportError};
    use crate::persist::{MemoryStore, PersistResult};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::io;
    use std::sync::Mutex;

    /// Serves one single-row table per window, dated with the window's `to`,
    /// and fails windows whose `to` is listed in `failing`.
    #[derive(Default)]
    struct FakeSource {
        failing: Vec<NaiveDate>,
        seen: Mutex<Vec<DateWindow>>,
    }

    #[async_trait]
    impl Transport for FakeSource {
        async fn history(&self, _: &Instrument, window: &DateWindow) -> Result<RawResponse, TransportError> {
            self.seen.lock().unwrap().push(*window);
            if self.failing.contains(&window.to) {
                return Ok(RawResponse { status: 500, body: String::new() });
            }
            Ok(RawResponse::ok(format!(
                "<table><tr><th>Date</th><th>Max</th></tr><tr><td>{}</td><td>1</td></tr></table>",
                window.to.format("%m/%d/%Y")
            )))
        }

        async fn catalog(&self) -> Result<RawResponse, TransportError> {
            Err(TransportError::Other("unused".into()))
        }
    }

    /// Holds a file it cannot parse: every read fails, writes are kept.
    #[derive(Default)]
    struct UnreadableStore {
        written: Mutex<Option<Table>>,
    }

    #[async_trait]
    impl TableStore for UnreadableStore {
        async fn read(&self, _: &Instrument) -> PersistResult<Option<Table>> {
            Err(PersistError::Io {
                path: "ALK.csv".into(),
                source: io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8"),
            })
        }

        async fn write(&self, instrument: &Instrument, table: &Table) -> PersistResult<String> {
            *self.written.lock().unwrap() = Some(table.clone());
            Ok(format!("unreadable://{instrument}"))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn engine(source: FakeSource, store: MemoryStore) -> (SyncEngine<FakeSource, MemoryStore>, Arc<FakeSource>, Arc<MemoryStore>) {
        let source = Arc::new(source);
        let store = Arc::new(store);
        let engine = SyncEngine::new(RangeFetcher::new(Arc::clone(&source)), Arc::clone(&store), today());
        (engine, source, store)
    }

    fn dates(table: &Table) -> Vec<String> {
        table.rows().iter().map(|r| r.get("Date").unwrap().to_string()).collect()
    }

    #[tokio::test]
    async fn test_fresh_rows_go_before_existing_rows() {
        let mut existing = Table::default();
        existing.push(Row::from_pairs([("Date", "old-1"), ("Max", "1")]));
        existing.push(Row::from_pairs([("Date", "old-2"), ("Max", "1")]));
        let (engine, source, store) = engine(FakeSource::default(), MemoryStore::new().with_table("ALK", existing));

        let target = SyncTarget::new("ALK", today() - Duration::days(400));
        let status = engine.sync(&target).await.unwrap();

        assert_eq!(status, SyncStatus::Written { location: "memory://ALK".into(), fetched: 2, total: 4 });
        let saved = store.get(&"ALK".into()).unwrap();
        assert_eq!(dates(&saved), vec!["10/19/2026", "10/19/2025", "old-1", "old-2"]);
        assert_eq!(source.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_existing_table_is_replaced_by_fresh_rows() {
        let store = Arc::new(UnreadableStore::default());
        let engine = SyncEngine::new(RangeFetcher::new(Arc::new(FakeSource::default())), Arc::clone(&store), today());

        let status = engine.sync(&SyncTarget::new("ALK", today() - Duration::days(400))).await.unwrap();

        assert_eq!(status, SyncStatus::Written { location: "unreadable://ALK".into(), fetched: 2, total: 2 });
        let saved = store.written.lock().unwrap().clone().unwrap();
        assert_eq!(dates(&saved), vec!["10/19/2026", "10/19/2025"]);
    }

    #[tokio::test]
    async fn test_failed_window_is_skipped() {
        let newest_to = today();
        let source = FakeSource { failing: vec![newest_to], ..FakeSource::default() };
        let (engine, _, store) = engine(source, MemoryStore::new());

        let status = engine.sync(&SyncTarget::new("KMB", today() - Duration::days(400))).await.unwrap();

        assert!(matches!(status, SyncStatus::Written { fetched: 1, total: 1, .. }));
        assert_eq!(dates(&store.get(&"KMB".into()).unwrap()), vec!["10/19/2025"]);
    }

    #[tokio::test]
    async fn test_all_windows_failing_leaves_store_untouched() {
        let source = FakeSource { failing: vec![today()], ..FakeSource::default() };
        let mut existing = Table::default();
        existing.push(Row::from_pairs([("Date", "old")]));
        let (engine, _, store) = engine(source, MemoryStore::new().with_table("ALK", existing.clone()));

        let status = engine.sync(&SyncTarget::new("ALK", today() - Duration::days(10))).await.unwrap();

        assert_eq!(status, SyncStatus::NoData);
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.get(&"ALK".into()), Some(existing));
    }

    #[tokio::test]
    async fn test_up_to_date_target_does_nothing() {
        let (engine, source, store) = engine(FakeSource::default(), MemoryStore::new());

        let status = engine.sync(&SyncTarget::new("ALK", today())).await.unwrap();

        assert_eq!(status, SyncStatus::NoData);
        assert!(source.seen.lock().unwrap().is_empty());
        assert_eq!(store.write_count(), 0);
    }
}
