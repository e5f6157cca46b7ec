//! Session listing CLI command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// Longest preview shown in the table column.
const TABLE_PREVIEW_CHARS: usize = 60;

/// List stored sessions with their message count and latest message.
///
/// # Examples
///
/// ```bash
/// twin sessions
/// twin sessions --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let sessions = state.orchestrator.list_sessions().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "sessions": sessions }))?
        );
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No sessions stored in {}. Start one with: {}",
            style("i").blue().bold(),
            style(state.config.chat.memory_dir.display()).cyan(),
            style("twin serve").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Session").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Last message").fg(Color::White),
    ]);

    for session in &sessions {
        let preview = session
            .last_message
            .as_deref()
            .map(|m| shorten(m, TABLE_PREVIEW_CHARS))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(session.session_id.as_str()).fg(Color::Cyan),
            Cell::new(session.message_count),
            Cell::new(preview),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session(s)",
        style(sessions.len()).bold()
    );
    println!();

    Ok(())
}

/// Single-line preview of at most `max` characters.
fn shorten(text: &str, max: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
