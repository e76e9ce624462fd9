//! Reference-data cache with cancellable, all-or-nothing loads.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::abort::AbortSignal;
use crate::error::{DashError, Result};
use crate::schema::{ColType, CompleteCaseType, ConceptSet, Organization, ReferenceData, RegionSet};

/// Fetches reference data from wherever it lives.
pub trait ReferenceLoader {
    fn load_concept_set(&self, id: &str, signal: &AbortSignal) -> Result<ConceptSet>;

    fn load_region_set(&self, id: &str, signal: &AbortSignal) -> Result<RegionSet>;

    fn load_organizations(&self, signal: &AbortSignal) -> Result<Vec<Organization>>;
}

/// Loader serving reference data already held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceLoader {
    data: ReferenceData,
}

impl StaticReferenceLoader {
    pub fn new(data: ReferenceData) -> Self {
        Self { data }
    }
}

impl ReferenceLoader for StaticReferenceLoader {
    fn load_concept_set(&self, id: &str, _signal: &AbortSignal) -> Result<ConceptSet> {
        self.data
            .concept_set(id)
            .cloned()
            .ok_or_else(|| DashError::DataSource(format!("unknown concept set '{id}'")))
    }

    fn load_region_set(&self, id: &str, _signal: &AbortSignal) -> Result<RegionSet> {
        self.data
            .region_set(id)
            .cloned()
            .ok_or_else(|| DashError::DataSource(format!("unknown region set '{id}'")))
    }

    fn load_organizations(&self, _signal: &AbortSignal) -> Result<Vec<Organization>> {
        Ok(self.data.organizations().cloned().collect())
    }
}

/// Which portions of reference data to load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRequest {
    #[serde(default)]
    pub concept_set_ids: Vec<String>,
    #[serde(default)]
    pub region_set_ids: Vec<String>,
    #[serde(default)]
    pub organizations: bool,
}

impl ReferenceRequest {
    /// Everything the columns of a case type refer to.
    pub fn for_case_type(case_type: &CompleteCaseType) -> Self {
        let mut request = Self::default();
        for col in case_type.cols.values() {
            if let Some(id) = &col.concept_set_id {
                if !request.concept_set_ids.contains(id) {
                    request.concept_set_ids.push(id.clone());
                }
            }
            if let Some(id) = &col.region_set_id {
                if !request.region_set_ids.contains(id) {
                    request.region_set_ids.push(id.clone());
                }
            }
            if col.col_type == ColType::Organization {
                request.organizations = true;
            }
        }
        request
    }

    pub fn is_empty(&self) -> bool {
        self.concept_set_ids.is_empty() && self.region_set_ids.is_empty() && !self.organizations
    }
}

/// Result of a load that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched portions were committed.
    Loaded {
        concept_sets: usize,
        region_sets: usize,
        organizations: bool,
    },
    /// The signal was aborted; nothing was committed.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Portion {
    ConceptSet(String),
    RegionSet(String),
    Organizations,
}

#[derive(Default)]
struct Staging {
    concept_sets: Vec<ConceptSet>,
    region_sets: Vec<RegionSet>,
    organizations: Option<Vec<Organization>>,
}

/// Loaded reference data plus load times for eviction.
#[derive(Debug, Clone)]
pub struct ReferenceDataCache {
    data: ReferenceData,
    loaded_at: HashMap<Portion, Instant>,
    max_age: Duration,
}

impl ReferenceDataCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            data: ReferenceData::new(),
            loaded_at: HashMap::new(),
            max_age,
        }
    }

    /// Current reference data.
    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn generation(&self) -> u64 {
        self.data.generation()
    }

    /// Load the requested portions that are not cached yet.
    ///
    /// Everything is fetched before anything is committed. An abort observed
    /// at any point yields [`LoadOutcome::Cancelled`], including a loader that
    /// gives up with an error once the signal is aborted. Any other loader
    /// failure yields [`DashError::DataSource`]. In every case but success the
    /// cache is untouched.
    pub fn load(
        &mut self,
        request: &ReferenceRequest,
        loader: &dyn ReferenceLoader,
        signal: &AbortSignal,
    ) -> Result<LoadOutcome> {
        let mut staging = Staging::default();

        for id in &request.concept_set_ids {
            if self.data.concept_set(id).is_some() {
                continue;
            }
            if signal.is_aborted() {
                return Ok(self.cancelled());
            }
            match fetched(loader.load_concept_set(id, signal), signal)? {
                Some(concept_set) => staging.concept_sets.push(concept_set),
                None => return Ok(self.cancelled()),
            }
        }
        for id in &request.region_set_ids {
            if self.data.region_set(id).is_some() {
                continue;
            }
            if signal.is_aborted() {
                return Ok(self.cancelled());
            }
            match fetched(loader.load_region_set(id, signal), signal)? {
                Some(region_set) => staging.region_sets.push(region_set),
                None => return Ok(self.cancelled()),
            }
        }
        if request.organizations && !self.data.has_organizations() {
            if signal.is_aborted() {
                return Ok(self.cancelled());
            }
            match fetched(loader.load_organizations(signal), signal)? {
                Some(organizations) => staging.organizations = Some(organizations),
                None => return Ok(self.cancelled()),
            }
        }

        if signal.is_aborted() {
            return Ok(self.cancelled());
        }
        Ok(self.commit(staging))
    }

    fn cancelled(&self) -> LoadOutcome {
        tracing::debug!("reference data load cancelled");
        LoadOutcome::Cancelled
    }

    fn commit(&mut self, staging: Staging) -> LoadOutcome {
        let now = Instant::now();
        let outcome = LoadOutcome::Loaded {
            concept_sets: staging.concept_sets.len(),
            region_sets: staging.region_sets.len(),
            organizations: staging.organizations.is_some(),
        };

        for concept_set in staging.concept_sets {
            self.loaded_at
                .insert(Portion::ConceptSet(concept_set.id.clone()), now);
            self.data.insert_concept_set(concept_set);
        }
        for region_set in staging.region_sets {
            self.loaded_at
                .insert(Portion::RegionSet(region_set.id.clone()), now);
            self.data.insert_region_set(region_set);
        }
        if let Some(organizations) = staging.organizations {
            self.loaded_at.insert(Portion::Organizations, now);
            self.data.set_organizations(organizations);
        }

        tracing::debug!(
            outcome = ?outcome,
            generation = self.data.generation(),
            "reference data committed"
        );
        outcome
    }

    /// Replace the cache contents with data loaded elsewhere.
    pub fn replace(&mut self, data: ReferenceData) {
        self.clear();
        self.data.merge(data);

        let now = Instant::now();
        let portions: Vec<Portion> = self
            .data
            .concept_set_ids()
            .map(|id| Portion::ConceptSet(id.to_string()))
            .chain(
                self.data
                    .region_set_ids()
                    .map(|id| Portion::RegionSet(id.to_string())),
            )
            .chain(self.data.has_organizations().then_some(Portion::Organizations))
            .collect();
        self.loaded_at = portions.into_iter().map(|portion| (portion, now)).collect();
    }

    /// Drop portions loaded more than the configured age before `now`.
    ///
    /// Returns the number of evicted portions.
    pub fn evict_stale(&mut self, now: Instant) -> usize {
        let max_age = self.max_age;
        let stale: Vec<Portion> = self
            .loaded_at
            .iter()
            .filter(|(_, loaded)| now.saturating_duration_since(**loaded) > max_age)
            .map(|(portion, _)| portion.clone())
            .collect();

        for portion in &stale {
            self.loaded_at.remove(portion);
            match portion {
                Portion::ConceptSet(id) => {
                    self.data.remove_concept_set(id);
                }
                Portion::RegionSet(id) => {
                    self.data.remove_region_set(id);
                }
                Portion::Organizations => self.data.clear_organizations(),
            }
        }
        if !stale.is_empty() {
            tracing::debug!(evicted = stale.len(), "evicted stale reference data");
        }
        stale.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.data.clear();
        self.loaded_at.clear();
    }
}

/// `None` when the loader failed because the signal was aborted.
fn fetched<T>(result: Result<T>, signal: &AbortSignal) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(_) if signal.is_aborted() => Ok(None),
        Err(error) => Err(as_data_source(error)),
    }
}

fn as_data_source(error: DashError) -> DashError {
    match error {
        DashError::DataSource(_) => error,
        other => DashError::DataSource(other.to_string()),
    }
}
