// Splits a backfill interval into request-sized windows, newest first.

use chrono::{Duration, NaiveDate};

use crate::engine::types::DateWindow;

/// The source rejects ranges longer than a year.
pub const MAX_WINDOW_DAYS: i64 = 365;

/// Lazy window sequence over `[floor, today]`. Cloning restarts from the same point.
#[derive(Debug, Clone)]
pub struct Windows {
    floor: NaiveDate,
    until: NaiveDate,
}

/// Windows covering `[last_synced, today]`, newest first. Empty when `today <= last_synced`.
pub fn windows(last_synced: NaiveDate, today: NaiveDate) -> Windows {
    Windows { floor: last_synced, until: today }
}

impl Iterator for Windows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<DateWindow> {
        if self.until <= self.floor {
            return None;
        }

        let year = Duration::days(MAX_WINDOW_DAYS);
        // >= so an exact year left is still a full window
        let from = if self.until - self.floor >= year {
            self.until - year
        } else {
            self.floor
        };

        let window = DateWindow { from, to: self.until };
        self.until = from;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let days = (self.until - self.floor).num_days().max(0);
        let n = ((days + MAX_WINDOW_DAYS - 1) / MAX_WINDOW_DAYS) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows {}
