// Market data module entrypoint
pub mod adapters;    // transport trait + MSE client + request limiter
pub mod html;        // HTML table extraction
pub mod fetcher;     // one bounded date-range request -> Table
pub mod catalog;     // instrument code discovery
pub mod normaliser;  // canonical date/number text
