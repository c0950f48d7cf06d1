// Sync engine entrypoint
pub mod types;      // instruments, windows, rows/tables, outcomes
pub mod window;     // backfill interval -> year-sized request windows
pub mod target;     // where each instrument's backfill starts
pub mod sync;       // one instrument: fetch windows, merge, write
pub mod scheduler;  // all instruments, concurrently
