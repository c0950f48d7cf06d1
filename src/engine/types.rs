use std::fmt;

use chrono::NaiveDate;

/// Exchange code of a listed instrument, e.g. `ALK`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Codes double as file names, so they must be non-empty and path-free.
    pub fn is_valid_code(code: &str) -> bool {
        !code.is_empty() && !code.contains(['/', '\\']) && !code.contains("..")
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Instrument {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// What one run has to do for one instrument: backfill from `last_synced` up to today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub instrument: Instrument,
    pub last_synced: NaiveDate,
}

impl SyncTarget {
    pub fn new(instrument: impl Into<Instrument>, last_synced: NaiveDate) -> Self {
        Self { instrument: instrument.into(), last_synced }
    }
}

/// One bounded date-range request. Consecutive windows share their boundary date:
/// an older window's `to` is the newer window's `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// One trading-day record. Columns are whatever the source table carries, kept in
/// source order; values stay text until normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Row::new();
        for (column, value) in pairs {
            row.insert(column, value);
        }
        row
    }

    /// Sets `column` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.fields.iter_mut().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An ordered set of rows plus the union of their column names, newest row first.
/// This is both the fetched RowSet and the persisted per-instrument table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::default();
        for column in columns {
            table.add_column(column.into());
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        for column in row.columns() {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(row);
    }

    /// Appends every row of `other` after the rows already held. No row is dropped
    /// or reordered, duplicates included.
    pub fn append(&mut self, other: Table) {
        for column in other.columns {
            self.add_column(column);
        }
        self.rows.extend(other.rows);
    }

    /// Cell values of `row` lined up with `columns()`; absent cells are empty.
    pub fn record<'a>(&'a self, row: &'a Row) -> Vec<&'a str> {
        self.columns
            .iter()
            .map(|column| row.get(column).unwrap_or(""))
            .collect()
    }

    fn add_column(&mut self, column: String) {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }
}

/// Renames repeated column names so every one is distinct: the second `Price`
/// becomes `Price.1`, the third `Price.2`, skipping names already taken.
pub fn unique_columns(columns: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let mut name = column.clone();
        let mut n = 1;
        while out.contains(&name) {
            name = format!("{column}.{n}");
            n += 1;
        }
        out.push(name);
    }
    out
}

/// How a single instrument's sync ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Fresh rows were merged and written under `location`.
    Written { location: String, fetched: usize, total: usize },
    /// Every window came back empty; the store was not touched.
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub instrument: Instrument,
    pub status: SyncStatus,
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, SyncStatus::Written { .. })
    }

    pub fn location(&self) -> Option<&str> {
        match &self.status {
            SyncStatus::Written { location, .. } => Some(location),
            _ => None,
        }
    }
}
