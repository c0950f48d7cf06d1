//! `mse-backfill` library crate.
//!
//! Incrementally syncs daily symbol history from the Macedonian Stock Exchange
//! into one CSV file per instrument. The binary is a thin wrapper around
//! [`pipeline::run`].

pub mod config;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod persist;
pub mod pipeline;
pub mod telemetry;
