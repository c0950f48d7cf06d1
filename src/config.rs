//! Run configuration.
//!
//! Layers, lowest to highest priority: built-in defaults, optional TOML file,
//! `MSE_*` environment variables, command-line flags.

use std::path::PathBuf;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::engine::target::{DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS};
use crate::engine::types::Instrument;
use crate::error::AppError;

pub const DEFAULT_CONCURRENCY: usize = 21;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

#[derive(Debug, Parser)]
#[command(name = "mse-backfill", version, about = "Incrementally sync daily MSE symbol history into CSV files")]
pub struct Cli {
    /// Optional TOML config file
    #[arg(long, default_value = "mse-backfill.toml")]
    pub config: PathBuf,

    /// Directory holding one CSV per instrument
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Maximum simultaneous requests to the source
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// How far back to go for instruments with no local data
    #[arg(long)]
    pub lookback_days: Option<i64>,

    /// Sync exactly these codes instead of discovering them (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Leave fetched text as the source returned it
    #[arg(long)]
    pub skip_normalise: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub concurrency: usize,
    pub lookback_days: i64,
    pub base_url: String,
    pub catalog_symbol: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
    pub normalise: bool,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("All_Stock_Data"),
            concurrency: DEFAULT_CONCURRENCY,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            base_url: "https://www.mse.mk/en/stats/symbolhistory".into(),
            catalog_symbol: "ALK".into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            request_timeout_secs: 60,
            log_filter: "info".into(),
            normalise: true,
            symbols: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let d = Settings::default();

        let mut builder = Config::builder()
            .set_default("data_dir", d.data_dir.to_string_lossy().into_owned())?
            .set_default("concurrency", d.concurrency as i64)?
            .set_default("lookback_days", d.lookback_days)?
            .set_default("base_url", d.base_url)?
            .set_default("catalog_symbol", d.catalog_symbol)?
            .set_default("user_agent", d.user_agent)?
            .set_default("request_timeout_secs", d.request_timeout_secs as i64)?
            .set_default("log_filter", d.log_filter)?
            .set_default("normalise", d.normalise)?
            .add_source(File::from(cli.config.as_path()).required(false))
            .add_source(
                Environment::with_prefix("MSE")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            )
            .set_override_option("data_dir", cli.data_dir.as_ref().map(|p| p.to_string_lossy().into_owned()))?
            .set_override_option("concurrency", cli.concurrency.map(|c| c as i64))?
            .set_override_option("lookback_days", cli.lookback_days)?;

        if !cli.symbols.is_empty() {
            builder = builder.set_override("symbols", cli.symbols.clone())?;
        }
        if cli.skip_normalise {
            builder = builder.set_override("normalise", false)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 {
            return Err(AppError::Config("concurrency must be at least 1".into()));
        }
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(AppError::Config(format!(
                "lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            )));
        }
        if let Some(bad) = self
            .symbols
            .iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty() && !Instrument::is_valid_code(s))
        {
            return Err(AppError::Config(format!("invalid instrument code {bad:?}")));
        }
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("base_url must not be empty".into()));
        }
        Ok(())
    }
}
