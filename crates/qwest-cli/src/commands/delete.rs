//! The `qwest delete` command.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

pub async fn execute(id: Uuid, config: Option<PathBuf>) -> Result<()> {
    let manager = super::build_manager(config.as_deref())?;
    manager.delete_session(id).await?;
    println!("Deleted session {id}");
    Ok(())
}
