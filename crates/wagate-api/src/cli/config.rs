//! `wagate config`: print the effective configuration.

use std::path::Path;

use anyhow::Result;
use console::style;

use wagate_infra::config::{CONFIG_FILE, render_config};
use wagate_types::config::GatewayConfig;

pub fn show_config(data_dir: &Path, config: &GatewayConfig, json: bool) -> Result<()> {
    if json {
        let result = serde_json::json!({
            "data_dir": data_dir,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let path = data_dir.join(CONFIG_FILE);
    let source = if path.exists() { "file" } else { "defaults" };
    println!();
    println!(
        "  {} {} ({})",
        style("Config").bold(),
        style(path.display()).cyan(),
        style(source).dim()
    );
    println!();
    print!("{}", render_config(config)?);
    Ok(())
}
