//! Filters command - print the filter panel derived from a case type.

use std::error::Error;
use std::path::{Path, PathBuf};

use casedash::{FilterKind, FilterMode};
use colored::Colorize;

use super::{open_dashboard, Inputs};

pub fn run(
    schema: PathBuf,
    reference: Option<PathBuf>,
    json_output: bool,
    config: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let inputs = Inputs {
        schema,
        cases: None,
        reference,
        config,
    };
    let (dashboard, _) = open_dashboard(&inputs)?;
    let state = dashboard.filters();

    if json_output {
        let output = serde_json::json!({
            "dimensions": state.dimensions(),
            "filters": state.filters(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for dimension in state.dimensions() {
        println!(
            "{} {} [{}]{}",
            "Dimension".yellow().bold(),
            dimension.label.white(),
            dimension.dim_type.label(),
            if dimension.allow_only_preferred_filter {
                " (preferred filter only)".dimmed().to_string()
            } else {
                String::new()
            }
        );
        for id in &dimension.filter_ids {
            let Some(filter) = state.filter(id) else {
                continue;
            };
            let marker = if *id == dimension.preferred_filter_id { "*" } else { " " };
            println!("  {} {:24} {}", marker.green(), filter.label, describe(&filter.kind));
        }
    }

    let local: Vec<_> = state
        .filters()
        .iter()
        .filter(|f| f.mode == FilterMode::Local)
        .map(|f| f.id.as_str())
        .collect();
    println!();
    println!("Local filters: {}", local.join(", ").white());
    Ok(())
}

fn describe(kind: &FilterKind) -> String {
    match kind {
        FilterKind::DateRange { min, max, .. } => format!("date range {min} .. {max}"),
        FilterKind::MultiSelect { options } => {
            let labels: Vec<_> = options.iter().take(5).map(|o| o.label.as_str()).collect();
            let more = options.len().saturating_sub(labels.len());
            if more > 0 {
                format!("one of {} (+{more} more)", labels.join(", "))
            } else {
                format!("one of {}", labels.join(", "))
            }
        }
        FilterKind::NumberRange { min, max } => format!(
            "number range {} .. {}",
            min.map_or("-inf".to_string(), |v| v.to_string()),
            max.map_or("+inf".to_string(), |v| v.to_string())
        ),
        FilterKind::TextContains => "text contains".to_string(),
        FilterKind::Selection => "selected cases".to_string(),
        FilterKind::Tree => "cases picked in the tree".to_string(),
    }
}
