//! Stratify command - group cases and print the legend.

use std::error::Error;

use casedash::StratificationMode;
use colored::Colorize;

use super::{apply_filters, open_dashboard, Inputs};

pub fn run(
    inputs: Inputs<'_>,
    column: Option<String>,
    selected: Option<Vec<String>>,
    filters: Vec<String>,
    json_output: bool,
) -> Result<(), Box<dyn Error>> {
    let (mut dashboard, _) = open_dashboard(&inputs)?;
    apply_filters(&mut dashboard, &filters)?;

    let mode = match selected {
        Some(ids) => {
            dashboard.set_selected(ids);
            StratificationMode::Selection
        }
        None => {
            let id = column.as_deref().unwrap_or_default();
            if dashboard.case_type().case_type_col(id).is_none() {
                return Err(format!("Unknown case type column '{id}'").into());
            }
            if !dashboard.stratifiable_columns().iter().any(|c| c.id == id) {
                eprintln!(
                    "{} column '{}' would not be offered for stratification",
                    "warning:".yellow().bold(),
                    id
                );
            }
            StratificationMode::Field
        }
    };

    let strat = dashboard
        .stratify(Some(mode), column.as_deref())
        .ok_or("Stratification could not be computed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&strat)?);
        return Ok(());
    }

    let total = strat.case_count();
    println!(
        "{} {} visible cases",
        "Stratified".cyan().bold(),
        total.to_string().white().bold()
    );
    for item in &strat.legend_items {
        let label = if item.row_value.is_missing {
            item.row_value.full.dimmed().to_string()
        } else {
            item.row_value.full.white().to_string()
        };
        println!(
            "  {:9} {:32} {:>6}",
            item.color,
            label,
            item.case_ids.len()
        );
    }
    Ok(())
}
