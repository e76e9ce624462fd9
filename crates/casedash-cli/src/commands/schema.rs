//! Schema command - list dimensions and columns and report schema issues.

use std::error::Error;
use std::path::{Path, PathBuf};

use casedash::input::load_case_type;
use colored::Colorize;

use super::load_config;

pub fn run(schema: PathBuf, json_output: bool, config: Option<&Path>) -> Result<(), Box<dyn Error>> {
    if !schema.exists() {
        return Err(format!("File not found: {}", schema.display()).into());
    }
    // Reject a broken configuration early, as the other commands do.
    load_config(config)?;

    let (case_type, source) = load_case_type(&schema)?;
    let issues = case_type.validate();

    if json_output {
        let output = serde_json::json!({
            "source": source,
            "case_type": case_type,
            "issues": issues,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Case type".cyan().bold(),
        case_type.name.white().bold(),
        case_type.id
    );
    println!();

    for case_type_dim in &case_type.case_type_dims {
        let Some(dim) = case_type.dim_of(case_type_dim) else {
            continue;
        };
        println!(
            "{} {} [{}]",
            "Dimension".yellow().bold(),
            dim.display_label().white(),
            dim.dim_type.label()
        );
        let preferred = case_type.preferred_column(case_type_dim).map(|c| c.id.as_str());
        for (case_type_col, col) in case_type.columns_of(case_type_dim) {
            let marker = if preferred == Some(case_type_col.id.as_str()) { "*" } else { " " };
            println!(
                "  {} {:24} {:16} rank {}",
                marker.green(),
                case_type_col.label,
                format!("{:?}", col.col_type),
                col.rank_in_dim
            );
        }
    }

    println!();
    if issues.is_empty() {
        println!("{}", "No schema issues found".green());
    } else {
        println!(
            "Found {} schema issues",
            issues.len().to_string().yellow().bold()
        );
        for issue in &issues {
            println!("  {} {}", "-".yellow(), issue);
        }
    }
    Ok(())
}
