//! CLI command implementations.

pub mod curve;
pub mod filters;
pub mod schema;
pub mod stratify;

use std::error::Error;
use std::path::{Path, PathBuf};

use casedash::{Dashboard, DashboardConfig, DashboardContext, DashboardFiles, DashboardSources};
use colored::Colorize;

/// Files shared by the commands that open a dashboard.
pub struct Inputs<'a> {
    pub schema: PathBuf,
    pub cases: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub config: Option<&'a Path>,
}

/// Load the configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DashboardConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    })
}

/// Open a dashboard dated today.
pub fn open_dashboard(inputs: &Inputs<'_>) -> Result<(Dashboard, DashboardSources), Box<dyn Error>> {
    for path in [Some(&inputs.schema), inputs.cases.as_ref(), inputs.reference.as_ref()]
        .into_iter()
        .flatten()
    {
        if !path.exists() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }

    let config = load_config(inputs.config)?;
    let files = DashboardFiles {
        case_type: &inputs.schema,
        cases: inputs.cases.as_deref(),
        reference: inputs.reference.as_deref(),
    };
    let today = chrono::Local::now().date_naive();
    Ok(Dashboard::open(files, DashboardContext::new(config), today)?)
}

/// Apply `ID=VALUE` filter arguments.
pub fn apply_filters(dashboard: &mut Dashboard, filters: &[String]) -> Result<(), Box<dyn Error>> {
    for arg in filters {
        let (id, text) = arg
            .split_once('=')
            .ok_or_else(|| format!("Filter must be ID=VALUE, got '{arg}'"))?;
        // Non-preferred time columns have no filter; the dashboard ignores them.
        let value = match dashboard.filters().filter(id) {
            Some(filter) => Some(filter.kind.parse_value(text)?),
            None => None,
        };
        if !dashboard.set_filter(id, value)? {
            eprintln!(
                "{} filter '{}' is not the preferred filter of its dimension and was ignored",
                "warning:".yellow().bold(),
                id
            );
        }
    }
    Ok(())
}
