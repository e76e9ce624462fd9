//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// casedash: schema-driven analytics for epidemiological case data
#[derive(Parser)]
#[command(name = "casedash")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dashboard configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the dimensions and columns of a case type and report schema issues
    Schema {
        /// Path to the case type schema (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the filter panel derived from a case type
    Filters {
        /// Path to the case type schema (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Reference data (concept sets, region sets, organizations)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stratify cases and print the legend
    Stratify {
        /// Path to the case type schema (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Cases (JSON, CSV or TSV)
        #[arg(value_name = "CASES")]
        cases: PathBuf,

        /// Case type column to stratify by
        #[arg(short, long, required_unless_present = "selected")]
        column: Option<String>,

        /// Stratify by selection instead: comma-separated selected case ids
        #[arg(long, conflicts_with = "column", value_delimiter = ',')]
        selected: Option<Vec<String>>,

        /// Reference data (concept sets, region sets, organizations)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Filter values as ID=VALUE (ranges FROM..TO, lists comma separated)
        #[arg(short, long = "filter", value_name = "ID=VALUE")]
        filters: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bin cases into an epi curve
    Curve {
        /// Path to the case type schema (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Cases (JSON, CSV or TSV)
        #[arg(value_name = "CASES")]
        cases: PathBuf,

        /// Time dimension binding to plot (default: the first time dimension)
        #[arg(short, long)]
        dimension: Option<String>,

        /// Case type column to stratify the curve by
        #[arg(short, long)]
        stratify_by: Option<String>,

        /// Reference data (concept sets, region sets, organizations)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Filter values as ID=VALUE (ranges FROM..TO, lists comma separated)
        #[arg(short, long = "filter", value_name = "ID=VALUE")]
        filters: Vec<String>,

        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
