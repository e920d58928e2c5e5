//! `picker-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP
//! server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use picker_api::server::Server;
use picker_core::config::Config;
use picker_core::google::GoogleSheetsStore;
use picker_core::observability::{init_logging, LogFormat};
use picker_core::sheet::{MemorySheet, SheetStore};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    let store: Arc<dyn SheetStore> = if config.sheet_id.is_some() {
        let store = GoogleSheetsStore::from_config(&config)?;
        tracing::info!("Using Google Sheets store");
        Arc::new(store)
    } else {
        if !config.debug {
            anyhow::bail!("PICKER_SHEET_ID is required when PICKER_DEBUG=false");
        }
        tracing::warn!("PICKER_SHEET_ID not set; using in-memory sheet (debug only)");
        Arc::new(MemorySheet::empty())
    };

    let server = Server::with_store(config, store);
    server.serve().await?;
    Ok(())
}
