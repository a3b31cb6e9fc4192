//! `wagate normalize <raw>`: canonicalize a phone number.

use anyhow::Result;
use console::style;

use wagate_types::address::NumberingPlan;

pub fn normalize(plan: &NumberingPlan, raw: &str, json: bool) -> Result<()> {
    let address = plan.normalize(raw)?;
    if json {
        let result = serde_json::json!({
            "input": raw,
            "address": address,
            "kind": address.kind(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", style(address).cyan());
    }
    Ok(())
}
