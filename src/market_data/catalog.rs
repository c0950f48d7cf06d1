// Instrument discovery from the `<select id="Code">` list on any symbol-history page.

use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::engine::types::Instrument;
use crate::market_data::adapters::{Transport, TransportError};
use crate::market_data::html::{elements, text_of};

const CODE_SELECT_ID: &str = "Code";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("catalog page responded with status {0}")]
    Status(u16),
    #[error("catalog page lists no instruments")]
    Empty,
}

/// Bonds and other non-equity listings start with `E` or carry digits.
pub fn is_equity_code(code: &str) -> bool {
    !code.starts_with('E') && !code.chars().any(|c| c.is_numeric())
}

/// Every option text of the code selector, trimmed, in page order.
pub fn parse_codes(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let Some(select) = elements(document.root_element(), "select")
        .find(|el| el.value().id() == Some(CODE_SELECT_ID))
    else {
        return Vec::new();
    };

    elements(select, "option")
        .map(|opt: ElementRef<'_>| text_of(opt))
        .filter(|code| !code.is_empty())
        .collect()
}

/// Fetches the catalog page and returns the equity codes it lists.
pub async fn discover<T: Transport + ?Sized>(transport: &T) -> Result<Vec<Instrument>, CatalogError> {
    let response = transport.catalog().await?;
    if !response.is_success() {
        return Err(CatalogError::Status(response.status));
    }

    let codes = parse_codes(&response.body);
    let listed = codes.len();
    let instruments: Vec<Instrument> = codes
        .into_iter()
        .filter(|code| is_equity_code(code) && Instrument::is_valid_code(code))
        .map(Instrument::from)
        .collect();

    if instruments.is_empty() {
        return Err(CatalogError::Empty);
    }
    debug!(?instruments, "catalog codes");
    info!(listed, kept = instruments.len(), "discovered instruments");
    Ok(instruments)
}
