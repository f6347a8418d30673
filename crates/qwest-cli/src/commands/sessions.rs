//! The `qwest sessions` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};

pub async fn execute(format: String, config: Option<PathBuf>) -> Result<()> {
    let manager = super::build_manager(config.as_deref())?;
    let sessions = manager.list_sessions().await?;

    match format.as_str() {
        "json" => {
            let rows: Vec<serde_json::Value> = sessions
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id,
                        "profile": s.profile,
                        "bank": s.bank_ref.to_string(),
                        "state": s.state.to_string(),
                        "score": s.score,
                        "updated_at": s.updated_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        "table" => {
            if sessions.is_empty() {
                println!("No stored sessions.");
                return Ok(());
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec![
                "Id", "Profile", "Bank", "State", "Score", "Updated",
            ]);
            for s in &sessions {
                table.add_row(vec![
                    s.id.to_string(),
                    s.profile.clone(),
                    s.bank_ref.to_string(),
                    s.state.to_string(),
                    s.score.to_string(),
                    s.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }
            println!("{table}");
        }
        other => anyhow::bail!("unknown format: {other} (expected table or json)"),
    }

    Ok(())
}
