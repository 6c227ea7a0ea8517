//! Subcommand implementations.

pub mod allocate;
pub mod classes;
pub mod config_cmd;
pub mod eligible;
pub mod init;
pub mod status;

use classbatch_config::AppConfig;
use classbatch_store::SqliteStore;
use std::path::Path;

/// Load and validate the configuration, honoring `--config`.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Open the configured database, running migrations.
pub async fn open_store(config: &AppConfig) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    tracing::debug!(url = %config.database.redacted_url(), "Opening class store");
    let store = SqliteStore::open(&config.database.url, config.database.max_connections)
        .await
        .map_err(|e| {
            format!(
                "Failed to open database {}: {e}",
                config.database.redacted_url()
            )
        })?;
    Ok(store)
}
