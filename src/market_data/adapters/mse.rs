// Macedonian Stock Exchange symbol-history endpoint.
// History:  POST {base_url}/{CODE}  form: FromDate, ToDate (mm/dd/yyyy), Code
// Catalog:  GET  {base_url}/{catalog_symbol}  -> page with a <select id="Code"> of all codes

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use tracing::trace;

use super::{RawResponse, Transport, TransportError};
use crate::config::Settings;
use crate::engine::types::{DateWindow, Instrument};

const REQUEST_DATE_FORMAT: &str = "%m/%d/%Y";

pub struct MseClient {
    client: reqwest::Client,
    base_url: String,
    catalog_symbol: String,
}

impl MseClient {
    pub fn new(settings: &Settings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .pool_max_idle_per_host(settings.concurrency)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            catalog_symbol: settings.catalog_symbol.clone(),
        })
    }

    pub fn symbol_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Form fields for one history request.
pub fn history_form(instrument: &Instrument, window: &DateWindow) -> [(&'static str, String); 3] {
    [
        ("FromDate", window.from.format(REQUEST_DATE_FORMAT).to_string()),
        ("ToDate", window.to.format(REQUEST_DATE_FORMAT).to_string()),
        ("Code", instrument.to_string()),
    ]
}

#[async_trait]
impl Transport for MseClient {
    async fn history(&self, instrument: &Instrument, window: &DateWindow) -> Result<RawResponse, TransportError> {
        let url = self.symbol_url(instrument.as_str());
        trace!(%url, %window, "POST history");
        let response = self
            .client
            .post(&url)
            .header(REFERER, url.as_str())
            .form(&history_form(instrument, window))
            .send()
            .await?;
        Self::read(response).await
    }

    async fn catalog(&self) -> Result<RawResponse, TransportError> {
        let url = self.symbol_url(&self.catalog_symbol);
        trace!(%url, "GET catalog");
        let response = self.client.get(&url).send().await?;
        Self::read(response).await
    }
}
