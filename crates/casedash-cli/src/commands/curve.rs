//! Curve command - bin cases into an epi curve.

use std::error::Error;

use casedash::StratificationMode;
use colored::Colorize;

use super::{apply_filters, open_dashboard, Inputs};
use crate::cli::OutputFormat;

pub fn run(
    inputs: Inputs<'_>,
    dimension: Option<String>,
    stratify_by: Option<String>,
    filters: Vec<String>,
    format: OutputFormat,
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    let (mut dashboard, sources) = open_dashboard(&inputs)?;
    apply_filters(&mut dashboard, &filters)?;

    if verbose {
        if let Some(cases) = &sources.cases {
            println!(
                "{} {} cases from {} ({})",
                "Loaded".cyan().bold(),
                cases.row_count,
                cases.file,
                cases.hash
            );
        }
    }

    let strat = match stratify_by.as_deref() {
        Some(id) => Some(
            dashboard
                .stratify(Some(StratificationMode::Field), Some(id))
                .ok_or_else(|| format!("Unknown case type column '{id}'"))?,
        ),
        None => None,
    };
    let curve = dashboard.epi_curve(dimension.as_deref(), strat.as_ref())?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&curve)?);
        return Ok(());
    }

    let column_label = dashboard
        .case_type()
        .case_type_col(&curve.case_type_col_id)
        .map(|c| c.label.as_str())
        .unwrap_or(curve.case_type_col_id.as_str());
    println!(
        "{} {} by {:?}",
        "Epi curve".cyan().bold(),
        column_label.white(),
        curve.resolution
    );

    let labels = curve.labels();
    let totals = curve.interval_totals();
    let peak = totals.iter().copied().max().unwrap_or(0).max(1);
    let bar_width = 40;

    for (index, label) in labels.iter().enumerate() {
        let total = totals[index];
        let filled = (total as f64 / peak as f64 * bar_width as f64).round() as usize;
        print!("  {:12} {:>6} {}", label, total, "█".repeat(filled).cyan());
        if curve.series.len() > 1 {
            let parts: Vec<String> = curve
                .series
                .iter()
                .filter(|s| s.buckets[index].count > 0)
                .map(|s| {
                    format!(
                        "{}={}",
                        s.label.as_deref().unwrap_or("?"),
                        s.buckets[index].count
                    )
                })
                .collect();
            print!("  {}", parts.join(" ").dimmed());
        }
        println!();
    }

    println!();
    println!(
        "Total: {} cases in {} intervals",
        curve.total().to_string().white().bold(),
        labels.len()
    );
    if curve.undated_cases > 0 {
        println!(
            "{} {} cases have no usable date",
            "note:".yellow().bold(),
            curve.undated_cases
        );
    }
    Ok(())
}
