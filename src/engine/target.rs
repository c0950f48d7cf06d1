use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::engine::types::{Instrument, SyncTarget, Table};
use crate::market_data::normaliser::{CANONICAL_DATE_FORMAT, DATE_COLUMN, SOURCE_DATE_FORMAT};
use crate::persist::TableStore;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 3650;
/// A century back is further than the source has history for.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// `today - lookback_days`, with the lookback clamped to `0..=MAX_LOOKBACK_DAYS`.
pub fn default_last_synced(today: NaiveDate, lookback_days: i64) -> NaiveDate {
    let days = lookback_days.clamp(0, MAX_LOOKBACK_DAYS);
    today
        .checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Date of the second-newest row (row 0 is the newest), or of the only row.
/// Canonical `dd.mm.yyyy` is expected; raw `m/d/yyyy` is accepted for files that
/// were never normalised.
pub fn last_synced_date(table: &Table) -> Option<NaiveDate> {
    let rows = table.rows();
    let row = rows.get(1).or_else(|| rows.first())?;
    let text = row.get(DATE_COLUMN)?.trim();
    NaiveDate::parse_from_str(text, CANONICAL_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, SOURCE_DATE_FORMAT))
        .ok()
}

/// One `SyncTarget` per instrument, in input order.
pub async fn plan_targets<S: TableStore + ?Sized>(
    instruments: Vec<Instrument>,
    store: &S,
    today: NaiveDate,
    lookback_days: i64,
) -> Vec<SyncTarget> {
    let fallback = default_last_synced(today, lookback_days);
    let mut targets = Vec::with_capacity(instruments.len());

    for instrument in instruments {
        let last_synced = match store.read(&instrument).await {
            Ok(Some(table)) => last_synced_date(&table).unwrap_or_else(|| {
                warn!(instrument = %instrument, "existing table has no readable date, using default lookback");
                fallback
            }),
            Ok(None) => fallback,
            Err(err) => {
                warn!(instrument = %instrument, error = %err, "could not read existing table, using default lookback");
                fallback
            }
        };
        debug!(instrument = %instrument, %last_synced, "planned");
        targets.push(SyncTarget { instrument, last_synced });
    }
    targets
}
