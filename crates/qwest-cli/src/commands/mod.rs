//! CLI subcommands.

pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod play;
pub mod sessions;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use qwest_manager::SessionManager;
use qwest_store::config::{load_config_from, QwestConfig};
use qwest_store::store::{BankRegistry, SessionStore};
use qwest_store::FileStore;

/// Load config, scan the bank directory, and wire a manager over the
/// filesystem store.
pub(crate) fn build_manager(config_path: Option<&Path>) -> Result<SessionManager> {
    let config = load_config_from(config_path)?;
    build_manager_with(&config)
}

pub(crate) fn build_manager_with(config: &QwestConfig) -> Result<SessionManager> {
    let mut registry = BankRegistry::new();
    if config.banks_dir.is_dir() {
        let banks = qwest_core::parser::load_bank_directory(&config.banks_dir)
            .with_context(|| format!("failed to load banks from {}", config.banks_dir.display()))?;
        for bank in banks {
            registry.register(bank);
        }
    } else {
        tracing::warn!(dir = %config.banks_dir.display(), "bank directory not found");
    }

    let filter = config.filter();
    let backend = Arc::new(FileStore::new(config.data_dir.clone()));
    let store = SessionStore::new(backend, registry, filter.clone());
    Ok(SessionManager::new(store, filter))
}
