// Shared trait + types for the transport collaborator

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::engine::types::{DateWindow, Instrument};

/// Status and body of one HTTP exchange. Table extraction happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("request limiter closed")]
    LimiterClosed,
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// One history request for `instrument` bounded by `window`.
    async fn history(&self, instrument: &Instrument, window: &DateWindow) -> Result<RawResponse, TransportError>;

    /// The page listing every known instrument code.
    async fn catalog(&self) -> Result<RawResponse, TransportError>;
}

/// Caps outstanding requests across every task sharing this transport. The cap lives
/// here, next to the connections, rather than in the scheduler.
pub struct Throttled<T> {
    inner: T,
    permits: Semaphore,
    limit: usize,
}

impl<T> Throttled<T> {
    pub fn new(inner: T, limit: usize) -> Self {
        let limit = limit.max(1);
        Self { inner, permits: Semaphore::new(limit), limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for Throttled<T> {
    async fn history(&self, instrument: &Instrument, window: &DateWindow) -> Result<RawResponse, TransportError> {
        let _permit = self.permits.acquire().await.map_err(|_| TransportError::LimiterClosed)?;
        self.inner.history(instrument, window).await
    }

    async fn catalog(&self) -> Result<RawResponse, TransportError> {
        let _permit = self.permits.acquire().await.map_err(|_| TransportError::LimiterClosed)?;
        self.inner.catalog().await
    }
}

pub mod mse;
