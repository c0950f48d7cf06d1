use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::types::{Instrument, Table};
use crate::persist::types::PersistResult;
use crate::persist::TableStore;

/// Store kept entirely in memory. Handy for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Instrument, Table>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, instrument: impl Into<Instrument>, table: Table) -> Self {
        self.lock().insert(instrument.into(), table);
        self
    }

    pub fn get(&self, instrument: &Instrument) -> Option<Table> {
        self.lock().get(instrument).cloned()
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Instrument, Table>> {
        // a poisoned map is still a valid map
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn read(&self, instrument: &Instrument) -> PersistResult<Option<Table>> {
        Ok(self.get(instrument))
    }

    async fn write(&self, instrument: &Instrument, table: &Table) -> PersistResult<String> {
        self.lock().insert(instrument.clone(), table.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(format!("memory://{instrument}"))
    }
}
