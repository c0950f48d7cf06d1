pub mod types;
pub use types::*;
pub mod csv_store;
pub mod memory;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::engine::types::{Instrument, Table};

/// Per-instrument table storage. Each instrument owns its key exclusively for the
/// duration of a sync, so implementations take no cross-instrument locks.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn read(&self, instrument: &Instrument) -> PersistResult<Option<Table>>;

    /// Replaces the stored table and returns where it was written.
    async fn write(&self, instrument: &Instrument, table: &Table) -> PersistResult<String>;
}
