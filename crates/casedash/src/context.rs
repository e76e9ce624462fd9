//! Session-wide state shared by the engines.

use std::time::Instant;

use crate::abort::AbortSignal;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::highlight::HighlightBus;
use crate::reference::{LoadOutcome, ReferenceDataCache, ReferenceLoader, ReferenceRequest};
use crate::schema::{CompleteCaseType, ReferenceData, RowValueCache, RowValueResolver};

/// Owns the configuration, the reference-data cache and the highlight bus.
///
/// Created at session start and reset on logout or when the case type
/// changes. Engines take what they need from it explicitly.
#[derive(Debug)]
pub struct DashboardContext {
    config: DashboardConfig,
    reference: ReferenceDataCache,
    row_values: RowValueCache,
    highlights: HighlightBus,
}

impl DashboardContext {
    pub fn new(config: DashboardConfig) -> Self {
        let reference = ReferenceDataCache::new(config.reference_data_max_age());
        Self {
            config,
            reference,
            row_values: RowValueCache::new(),
            highlights: HighlightBus::new(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        self.reference.data()
    }

    pub fn highlights(&self) -> &HighlightBus {
        &self.highlights
    }

    /// Resolver over the current reference data.
    pub fn resolver<'a>(&'a self, case_type: &'a CompleteCaseType) -> RowValueResolver<'a> {
        RowValueResolver::new(case_type, self.reference.data(), &self.config)
    }

    /// Resolver plus the memo, borrowed together.
    pub fn resolver_with_cache<'a>(
        &'a mut self,
        case_type: &'a CompleteCaseType,
    ) -> (RowValueResolver<'a>, &'a mut RowValueCache) {
        (
            RowValueResolver::new(case_type, self.reference.data(), &self.config),
            &mut self.row_values,
        )
    }

    /// Load the reference data a case type needs.
    pub fn load_reference(
        &mut self,
        case_type: &CompleteCaseType,
        loader: &dyn ReferenceLoader,
        signal: &AbortSignal,
    ) -> Result<LoadOutcome> {
        let request = ReferenceRequest::for_case_type(case_type);
        if request.is_empty() {
            return Ok(LoadOutcome::Loaded {
                concept_sets: 0,
                region_sets: 0,
                organizations: false,
            });
        }
        self.reference.load(&request, loader, signal)
    }

    /// Install reference data that was loaded in one piece.
    pub fn set_reference(&mut self, data: ReferenceData) {
        self.reference.replace(data);
    }

    /// Drop reference data older than the configured age.
    pub fn evict_stale(&mut self, now: Instant) -> usize {
        self.reference.evict_stale(now)
    }

    /// Forget everything tied to the previous session or case type.
    ///
    /// The reference generation keeps increasing so stale memo entries can
    /// never be mistaken for current ones.
    pub fn reset(&mut self) {
        self.reference.clear();
        self.row_values.clear();
        self.highlights.clear();
        tracing::debug!(generation = self.reference.generation(), "dashboard context reset");
    }
}

impl Default for DashboardContext {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}
