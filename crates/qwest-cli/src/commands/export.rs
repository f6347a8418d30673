//! The `qwest export` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

pub async fn execute(id: Uuid, output: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let manager = super::build_manager(config.as_deref())?;
    let blob = manager.export_session(id).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &blob)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported session {id} to {}", path.display());
        }
        None => {
            let text = String::from_utf8(blob).context("export blob is not valid UTF-8")?;
            println!("{text}");
        }
    }

    Ok(())
}
