//! Application configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qwest_core::profanity::{BlockEntry, MatchMode, ProfanityFilter};

/// A blocklist entry as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTermConfig {
    pub term: String,
    #[serde(default)]
    pub mode: MatchMode,
}

/// Top-level qwest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QwestConfig {
    /// Directory scanned for question bank TOML files.
    #[serde(default = "default_banks_dir")]
    pub banks_dir: PathBuf,
    /// Root directory of the filesystem store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Extra blocklist terms applied on top of the builtin list.
    #[serde(default)]
    pub blocklist: Vec<BlockTermConfig>,
    /// When true, only the configured blocklist is used.
    #[serde(default)]
    pub replace_builtin_blocklist: bool,
}

fn default_banks_dir() -> PathBuf {
    PathBuf::from("./banks")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./qwest-data")
}

impl Default for QwestConfig {
    fn default() -> Self {
        Self {
            banks_dir: default_banks_dir(),
            data_dir: default_data_dir(),
            blocklist: Vec::new(),
            replace_builtin_blocklist: false,
        }
    }
}

impl QwestConfig {
    /// Build the content filter this configuration describes.
    pub fn filter(&self) -> ProfanityFilter {
        let mut filter = if self.replace_builtin_blocklist {
            ProfanityFilter::permissive()
        } else {
            ProfanityFilter::default()
        };
        filter.extend(
            self.blocklist
                .iter()
                .map(|t| BlockEntry::new(t.term.clone(), t.mode)),
        );
        filter
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `qwest.toml` in the current directory
/// 2. `~/.config/qwest/config.toml`
pub fn load_config() -> Result<QwestConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QwestConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("qwest.toml");
        if local.exists() {
            Some(local)
        } else if let Some(dir) = config_dir() {
            let global = dir.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))
        }
        None => Ok(QwestConfig::default()),
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("qwest"))
}
