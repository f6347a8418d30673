//! The `qwest import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub async fn execute(input: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let manager = super::build_manager(config.as_deref())?;
    let blob = std::fs::read(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let id = manager.import_session(&blob).await?;

    let sessions = manager.list_sessions().await?;
    match sessions.iter().find(|s| s.id == id) {
        Some(s) => println!(
            "Imported session {id} (profile '{}', state {}, score {})",
            s.profile, s.state, s.score
        ),
        None => println!("Imported session {id}"),
    }

    Ok(())
}
