//! `wagate inbox <session_id>`: print a session's stored inbox.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use wagate_types::session::SessionId;

use crate::state::AppState;

pub async fn show_inbox(state: &AppState, session_id: &str, json: bool) -> Result<()> {
    let id = SessionId::parse(session_id)?;
    let entries = state.gateway.get_inbox(&id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!("  {} Inbox of '{}' is empty", style("i").blue().bold(), style(&id).cyan());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Time").fg(Color::Cyan),
            Cell::new("From").fg(Color::Cyan),
            Cell::new("Text").fg(Color::Cyan),
            Cell::new("Id").fg(Color::Cyan),
        ]);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&entry.source_id),
            Cell::new(&entry.text),
            Cell::new(&entry.message_id).fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
    println!("  {} message(s)", entries.len());
    Ok(())
}
