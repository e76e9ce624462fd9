//! The dashboard facade: one case type, its cases and the engines over them.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::abort::AbortSignal;
use crate::context::DashboardContext;
use crate::curve::{bin, curve_for_dimension, EpiCurve};
use crate::error::{CurveUnavailable, Result};
use crate::filter::{FilterState, FilterValue};
use crate::input::{load_case_type, load_reference_data, CaseLoader, SourceMetadata};
use crate::reference::{LoadOutcome, ReferenceLoader};
use crate::schema::{Case, CaseTypeCol, CompleteCaseType, DimType, SchemaIssue};
use crate::source::{CaseSource, Completion, LatestRequest};
use crate::stratify::{stratifiable_columns, stratify, Stratification, StratificationMode};

/// Where the dashboard's inputs came from.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSources {
    pub case_type: SourceMetadata,
    pub cases: Option<SourceMetadata>,
    pub reference: Option<SourceMetadata>,
}

/// Paths of the files a dashboard is opened from.
#[derive(Debug, Clone, Copy)]
pub struct DashboardFiles<'a> {
    pub case_type: &'a Path,
    pub cases: Option<&'a Path>,
    pub reference: Option<&'a Path>,
}

/// A case type with its loaded cases, filter panel and shared context.
#[derive(Debug)]
pub struct Dashboard {
    case_type: CompleteCaseType,
    context: DashboardContext,
    cases: Vec<Case>,
    filters: FilterState,
    selected_ids: Vec<String>,
    requests: LatestRequest,
    today: NaiveDate,
}

impl Dashboard {
    /// Create a dashboard without cases.
    pub fn new(case_type: CompleteCaseType, context: DashboardContext, today: NaiveDate) -> Self {
        let filters = FilterState::new(&case_type, context.reference(), context.config(), today);
        Self {
            case_type,
            context,
            cases: Vec::new(),
            filters,
            selected_ids: Vec::new(),
            requests: LatestRequest::new(),
            today,
        }
    }

    /// Open a dashboard from a schema file plus optional case and reference files.
    pub fn open(
        files: DashboardFiles<'_>,
        context: DashboardContext,
        today: NaiveDate,
    ) -> Result<(Self, DashboardSources)> {
        let (case_type, case_type_meta) = load_case_type(files.case_type)?;
        let mut dashboard = Self::new(case_type, context, today);

        let reference_meta = match files.reference {
            Some(path) => {
                let (reference, meta) = load_reference_data(path)?;
                dashboard.context.set_reference(reference);
                dashboard.rederive_filters();
                Some(meta)
            }
            None => None,
        };
        let cases_meta = match files.cases {
            Some(path) => {
                let (cases, meta) = CaseLoader::new().load(path)?;
                dashboard.set_cases(cases);
                Some(meta)
            }
            None => None,
        };

        Ok((
            dashboard,
            DashboardSources {
                case_type: case_type_meta,
                cases: cases_meta,
                reference: reference_meta,
            },
        ))
    }

    pub fn case_type(&self) -> &CompleteCaseType {
        &self.case_type
    }

    pub fn context(&self) -> &DashboardContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut DashboardContext {
        &mut self.context
    }

    /// Structural problems of the current case type.
    pub fn schema_issues(&self) -> Vec<SchemaIssue> {
        self.case_type.validate()
    }

    /// All loaded cases, before filtering.
    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn set_cases(&mut self, cases: Vec<Case>) {
        tracing::debug!(cases = cases.len(), "cases replaced");
        self.cases = cases;
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Set or clear a filter value; see [`FilterState::set_value`].
    pub fn set_filter(&mut self, id: &str, value: Option<FilterValue>) -> Result<bool> {
        self.filters.set_value(id, value)
    }

    /// Select cases; selection stratification groups by this set.
    pub fn set_selected(&mut self, case_ids: Vec<String>) {
        self.selected_ids = case_ids;
    }

    /// Restrict the visible cases to the current selection, or lift that restriction.
    pub fn filter_to_selection(&mut self, enabled: bool) -> Result<bool> {
        let ids = if enabled { self.selected_ids.clone() } else { Vec::new() };
        self.filters.set_selection(ids)
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.selected_ids
    }

    /// Cases passing every active filter.
    pub fn visible_cases(&self) -> Vec<&Case> {
        let resolver = self.context.resolver(&self.case_type);
        self.filters.apply_all(&self.cases, &resolver)
    }

    /// Load missing reference data and re-derive the filter panel.
    pub fn load_reference(
        &mut self,
        loader: &dyn ReferenceLoader,
        signal: &AbortSignal,
    ) -> Result<LoadOutcome> {
        let outcome = self.context.load_reference(&self.case_type, loader, signal)?;
        if matches!(outcome, LoadOutcome::Loaded { .. }) {
            self.rederive_filters();
        }
        Ok(outcome)
    }

    /// Re-derive filters against the current reference data, keeping the values
    /// of filters that still exist.
    fn rederive_filters(&mut self) {
        let previous: Vec<(String, FilterValue)> = self
            .filters
            .active_filters()
            .filter_map(|f| f.value.clone().map(|value| (f.id.clone(), value)))
            .collect();

        self.filters = FilterState::new(
            &self.case_type,
            self.context.reference(),
            self.context.config(),
            self.today,
        );
        for (id, value) in previous {
            if let Err(e) = self.filters.set_value(&id, Some(value)) {
                tracing::debug!(filter = %id, error = %e, "dropped filter value after re-derivation");
            }
        }
    }

    /// Fetch cases matching the remote filters from a data source.
    ///
    /// Returns `Ok(false)` when the response was superseded by a newer
    /// request and therefore not applied.
    pub fn refresh(&mut self, source: &dyn CaseSource) -> Result<bool> {
        let ticket = self.requests.begin();
        let remote = self.filters.remote_filters();
        let response = source.fetch_cases(&self.case_type.id, &remote, ticket.signal());
        match self.requests.complete(&ticket, response) {
            Completion::Applied(cases) => {
                self.set_cases(cases?);
                Ok(true)
            }
            Completion::Stale => Ok(false),
        }
    }

    /// Columns that may be offered for stratification over the visible cases.
    pub fn stratifiable_columns(&self) -> Vec<&CaseTypeCol> {
        let resolver = self.context.resolver(&self.case_type);
        stratifiable_columns(&self.case_type, &self.visible_cases(), &resolver)
    }

    /// Stratify the visible cases.
    ///
    /// Field mode needs a case type column id; an unknown id yields `None`.
    pub fn stratify(
        &self,
        mode: Option<StratificationMode>,
        case_type_col_id: Option<&str>,
    ) -> Option<Stratification> {
        let case_type_col = case_type_col_id.and_then(|id| self.case_type.case_type_col(id));
        let resolver = self.context.resolver(&self.case_type);
        stratify(
            mode,
            case_type_col,
            self.visible_cases(),
            &self.selected_ids,
            &resolver,
        )
    }

    /// Epi curve of the visible cases over a time dimension.
    ///
    /// Without a dimension id the first time dimension of the case type is used.
    pub fn epi_curve(
        &self,
        case_type_dim_id: Option<&str>,
        stratification: Option<&Stratification>,
    ) -> std::result::Result<EpiCurve, CurveUnavailable> {
        let case_type_dim = match case_type_dim_id {
            Some(id) => self.case_type.case_type_dim(id),
            None => self.case_type.case_type_dims_of_type(DimType::Time).next(),
        }
        .ok_or(CurveUnavailable::NoTimeColumn)?;
        curve_for_dimension(
            &self.case_type,
            case_type_dim,
            &self.visible_cases(),
            stratification,
        )
    }

    /// Epi curve of the visible cases over one fixed time column.
    pub fn epi_curve_for_column(
        &self,
        case_type_col_id: &str,
        stratification: Option<&Stratification>,
    ) -> std::result::Result<EpiCurve, CurveUnavailable> {
        let column = self
            .case_type
            .case_type_col(case_type_col_id)
            .ok_or_else(|| CurveUnavailable::NotATimeColumn(case_type_col_id.to_string()))?;
        bin(&self.case_type, self.visible_cases(), column, stratification)
    }

    /// Switch to another case type, dropping everything tied to the old one.
    pub fn switch_case_type(&mut self, case_type: CompleteCaseType) {
        self.context.reset();
        self.requests.cancel();
        self.filters = FilterState::new(
            &case_type,
            self.context.reference(),
            self.context.config(),
            self.today,
        );
        self.case_type = case_type;
        self.cases.clear();
        self.selected_ids.clear();
    }
}
