//! Dashboard configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// Default stratification palette.
pub const DEFAULT_PALETTE: [&str; 12] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#aec7e8", "#ffbb78",
];

/// Configuration supplied to the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Ordered stratification colours; assignment cycles when exhausted.
    pub palette: Vec<String>,
    /// Columns with more distinct values than this cannot be stratified.
    pub max_stratification_values: usize,
    /// Text shown for missing values.
    pub missing_value_symbol: String,
    /// Append ` (missing)` to the full text of missing values.
    pub annotate_missing_full: bool,
    /// Age after which loaded reference data is evicted.
    pub reference_data_max_age_secs: u64,
    /// Years before today covered by the default date filter window.
    pub date_filter_years_back: i32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            max_stratification_values: 12,
            missing_value_symbol: "-".to_string(),
            annotate_missing_full: true,
            reference_data_max_age_secs: 3600,
            date_filter_years_back: 20,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file; missing keys use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DashError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the palette.
    pub fn with_palette<S: Into<String>>(mut self, palette: impl IntoIterator<Item = S>) -> Self {
        self.palette = palette.into_iter().map(Into::into).collect();
        self
    }

    /// Set the stratification cardinality cap.
    pub fn with_max_stratification_values(mut self, max: usize) -> Self {
        self.max_stratification_values = max;
        self
    }

    /// Set the missing value symbol.
    pub fn with_missing_value_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.missing_value_symbol = symbol.into();
        self
    }

    /// Reference data eviction age.
    pub fn reference_data_max_age(&self) -> Duration {
        Duration::from_secs(self.reference_data_max_age_secs)
    }

    /// Palette colour for a legend position, cycling past the end.
    ///
    /// An empty palette falls back to the default one.
    pub fn color_at(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()];
        }
        &self.palette[index % self.palette.len()]
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            return Err(DashError::Config("palette must not be empty".into()));
        }
        if self.max_stratification_values == 0 {
            return Err(DashError::Config(
                "max_stratification_values must be at least 1".into(),
            ));
        }
        if self.date_filter_years_back <= 0 {
            return Err(DashError::Config(
                "date_filter_years_back must be positive".into(),
            ));
        }
        Ok(())
    }
}
