//! One flat CSV file per instrument: `{dir}/{CODE}.csv`, header row first.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::engine::types::{unique_columns, Instrument, Row, Table};
use crate::persist::types::{PersistError, PersistResult};
use crate::persist::TableStore;

#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    /// Opens (and creates if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> PersistResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| PersistError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, instrument: &Instrument) -> PathBuf {
        self.dir.join(format!("{instrument}.csv"))
    }
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> PersistError + '_ {
    move |source| PersistError::Csv { path: path.to_path_buf(), source }
}

fn read_table(path: &Path) -> PersistResult<Option<Table>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err(path))?;
    let headers = unique_columns(
        reader
            .headers()
            .map_err(csv_err(path))?
            .iter()
            .map(str::to_string)
            .collect(),
    );

    let mut table = Table::with_columns(headers.iter().cloned());
    for record in reader.records() {
        let record = record.map_err(csv_err(path))?;
        let row = Row::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, column)| (column.clone(), record.get(i).unwrap_or("").to_string())),
        );
        table.push(row);
    }
    Ok(Some(table))
}

// Written to a sibling temp file and renamed, so a failed write leaves the old file intact.
fn write_table(path: &Path, table: &Table) -> PersistResult<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp).map_err(csv_err(&tmp))?;
        writer.write_record(table.columns()).map_err(csv_err(&tmp))?;
        for row in table.rows() {
            writer.write_record(table.record(row)).map_err(csv_err(&tmp))?;
        }
        writer.flush().map_err(|source| PersistError::Io { path: tmp.clone(), source })?;
    }
    fs::rename(&tmp, path).map_err(|source| PersistError::Io { path: path.to_path_buf(), source })
}

#[async_trait]
impl TableStore for CsvStore {
    async fn read(&self, instrument: &Instrument) -> PersistResult<Option<Table>> {
        let path = self.path_for(instrument);
        let table = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || read_table(&path)).await??
        };
        debug!(instrument = %instrument, path = %path.display(), rows = table.as_ref().map_or(0, Table::len), "read table");
        Ok(table)
    }

    async fn write(&self, instrument: &Instrument, table: &Table) -> PersistResult<String> {
        let path = self.path_for(instrument);
        {
            let path = path.clone();
            let table = table.clone();
            tokio::task::spawn_blocking(move || write_table(&path, &table)).await??;
        }
        debug!(instrument = %instrument, path = %path.display(), rows = table.len(), "wrote table");
        Ok(path.display().to_string())
    }
}
