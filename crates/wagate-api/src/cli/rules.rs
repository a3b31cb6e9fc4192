//! Auto-reply rule CLI subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use wagate_types::rule::AutoReplyRule;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum RulesCommand {
    /// List the current rules in match order.
    #[command(alias = "ls")]
    List,

    /// Replace all rules with the contents of a JSON file.
    Set {
        /// File holding `[{"keyword": "...", "reply": "..."}, ...]`.
        file: PathBuf,
    },

    /// Remove every rule.
    Clear,
}

pub async fn handle_rules_command(cmd: RulesCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        RulesCommand::List => {
            let rules = state.gateway.rules();
            print_rules(&rules, json)
        }
        RulesCommand::Set { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let rules: Vec<AutoReplyRule> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a valid rule list", file.display()))?;
            let saved = state.gateway.set_rules(rules).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(saved.as_ref())?);
            } else {
                println!();
                println!("  {} Saved {} rule(s)", style("ok").green(), saved.len());
                println!();
            }
            Ok(())
        }
        RulesCommand::Clear => {
            state.gateway.set_rules(Vec::new()).await?;
            if json {
                println!("[]");
            } else {
                println!();
                println!("  {} All rules removed", style("ok").green());
                println!();
            }
            Ok(())
        }
    }
}

fn print_rules(rules: &[AutoReplyRule], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!();
        println!("  {} No auto-reply rules configured", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Keyword").fg(Color::Cyan),
            Cell::new("Reply").fg(Color::Cyan),
        ]);
    for (index, rule) in rules.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&rule.keyword),
            Cell::new(&rule.reply),
        ]);
    }
    println!("{table}");
    Ok(())
}
