use crate::market_data::adapters::TransportError;
use crate::market_data::catalog::CatalogError;
use crate::persist::PersistError;

/// Failures that stop a run before any instrument is synced.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("could not load configuration: {0}")]
    Settings(#[from] config::ConfigError),
    #[error("could not build HTTP client: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("could not prepare data directory: {0}")]
    Store(#[from] PersistError),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        2
    }
}
