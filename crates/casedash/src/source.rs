//! Boundary to the case data source.
//!
//! Remote filters are evaluated by a [`CaseSource`]. Only the newest request's
//! response is applied ([`LatestRequest`]), and mutations report which cached
//! query kinds became stale through [`Invalidate`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::abort::{AbortController, AbortSignal};
use crate::config::DashboardConfig;
use crate::error::{DashError, Result};
use crate::filter::RemoteFilter;
use crate::schema::{Case, CompleteCaseType, ReferenceData, RowValueResolver};

/// Change to the members of one case set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSetMemberChange {
    pub case_set_id: String,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// Remote case store.
pub trait CaseSource {
    /// Cases of a case type matching every filter.
    fn fetch_cases(
        &self,
        case_type_id: &str,
        filters: &[RemoteFilter],
        signal: &AbortSignal,
    ) -> Result<Vec<Case>>;

    /// Add and remove members of a case set.
    fn update_case_set_members(&mut self, change: &CaseSetMemberChange, signal: &AbortSignal)
    -> Result<()>;
}

/// Case source over cases held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryCaseSource {
    case_type: CompleteCaseType,
    reference: ReferenceData,
    config: DashboardConfig,
    cases: Vec<Case>,
    case_sets: BTreeMap<String, BTreeSet<String>>,
}

impl InMemoryCaseSource {
    pub fn new(
        case_type: CompleteCaseType,
        reference: ReferenceData,
        config: DashboardConfig,
        cases: Vec<Case>,
    ) -> Self {
        Self {
            case_type,
            reference,
            config,
            cases,
            case_sets: BTreeMap::new(),
        }
    }

    /// Members of a case set, sorted.
    pub fn case_set_members(&self, case_set_id: &str) -> Vec<&str> {
        self.case_sets
            .get(case_set_id)
            .map(|members| members.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl CaseSource for InMemoryCaseSource {
    fn fetch_cases(
        &self,
        case_type_id: &str,
        filters: &[RemoteFilter],
        signal: &AbortSignal,
    ) -> Result<Vec<Case>> {
        if case_type_id != self.case_type.id {
            return Err(DashError::DataSource(format!(
                "unknown case type '{case_type_id}'"
            )));
        }
        let resolver = RowValueResolver::new(&self.case_type, &self.reference, &self.config);
        let mut matched = Vec::new();
        for case in &self.cases {
            if signal.is_aborted() {
                return Err(DashError::DataSource("request aborted".to_string()));
            }
            if filters.iter().all(|filter| filter.matches(case, &resolver)) {
                matched.push(case.clone());
            }
        }
        tracing::debug!(
            case_type = case_type_id,
            filters = filters.len(),
            matched = matched.len(),
            "fetched cases"
        );
        Ok(matched)
    }

    fn update_case_set_members(
        &mut self,
        change: &CaseSetMemberChange,
        signal: &AbortSignal,
    ) -> Result<()> {
        if signal.is_aborted() {
            return Err(DashError::DataSource("request aborted".to_string()));
        }
        let members = self.case_sets.entry(change.case_set_id.clone()).or_default();
        members.extend(change.add.iter().cloned());
        for id in &change.remove {
            members.remove(id);
        }
        Ok(())
    }
}

/// Kinds of fetched data that a client may cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryKey {
    Cases,
    CaseSets,
    CaseSetMembers,
    CaseTypes,
    CaseTypeCols,
    Cols,
    Dims,
    ConceptSets,
    Concepts,
    RegionSets,
    Regions,
    Organizations,
}

impl QueryKey {
    /// Keys whose cached data must also be dropped when this one changes.
    pub fn dependents(self) -> &'static [QueryKey] {
        use QueryKey::*;
        match self {
            Cases => &[CaseSetMembers],
            CaseSets => &[CaseSetMembers],
            CaseSetMembers => &[CaseSets, Cases],
            CaseTypes => &[CaseTypeCols, Dims],
            CaseTypeCols => &[CaseTypes],
            Cols => &[CaseTypeCols],
            Dims => &[CaseTypes],
            ConceptSets => &[Concepts, Cols],
            Concepts => &[ConceptSets],
            RegionSets => &[Regions, Cols],
            Regions => &[RegionSets],
            Organizations => &[],
        }
    }
}

/// Receiver of invalidation requests.
pub trait Invalidate {
    fn invalidate(&mut self, keys: &[QueryKey]);
}

/// Add case-set members through a source, invalidating dependent queries on
/// success.
pub fn update_case_set_members(
    source: &mut dyn CaseSource,
    invalidator: &mut dyn Invalidate,
    change: &CaseSetMemberChange,
    signal: &AbortSignal,
) -> Result<()> {
    source.update_case_set_members(change, signal)?;
    invalidator.invalidate(&[QueryKey::CaseSetMembers, QueryKey::Cases]);
    Ok(())
}

/// Handle of one issued request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    signal: AbortSignal,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Signal aborted when a newer request supersedes this one.
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }
}

/// What to do with a completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// The response belongs to the newest request.
    Applied(T),
    /// A newer request was issued; the response must be dropped.
    Stale,
}

/// Tracks the newest in-flight request of one kind.
#[derive(Debug, Default)]
pub struct LatestRequest {
    latest: u64,
    controller: Option<AbortController>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the previous request, if any, and issue a new ticket.
    pub fn begin(&mut self) -> RequestTicket {
        if let Some(previous) = self.controller.take() {
            previous.abort();
        }
        self.latest += 1;
        let controller = AbortController::new();
        let ticket = RequestTicket {
            id: self.latest,
            signal: controller.signal(),
        };
        self.controller = Some(controller);
        ticket
    }

    /// Accept a response only if its ticket is the newest one.
    pub fn complete<T>(&mut self, ticket: &RequestTicket, response: T) -> Completion<T> {
        if ticket.id != self.latest {
            tracing::debug!(ticket = ticket.id, latest = self.latest, "discarding stale response");
            return Completion::Stale;
        }
        self.controller = None;
        Completion::Applied(response)
    }

    /// Abort the in-flight request without issuing a new one.
    pub fn cancel(&mut self) {
        if let Some(controller) = self.controller.take() {
            controller.abort();
        }
        self.latest += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CaseTypeCol, CaseTypeDim, Col, ColType, Dim, DimType};

    fn source() -> InMemoryCaseSource {
        let case_type = CompleteCaseType::new("ct", "Test")
            .with_dim(Dim::new("city", DimType::Text))
            .with_col(Col::new("city", ColType::Text, "city", 1))
            .with_case_type_col(CaseTypeCol::new("ctc_city", "city", "City"))
            .with_case_type_dim(CaseTypeDim::new("d", "city", vec!["ctc_city".into()]));
        let cases = vec![
            Case::new("c1").with_value("ctc_city", "Leiden"),
            Case::new("c2").with_value("ctc_city", "Delft"),
        ];
        InMemoryCaseSource::new(case_type, ReferenceData::new(), DashboardConfig::default(), cases)
    }

    #[derive(Default)]
    struct Recorder(Vec<QueryKey>);

    impl Invalidate for Recorder {
        fn invalidate(&mut self, keys: &[QueryKey]) {
            self.0.extend_from_slice(keys);
        }
    }

    #[test]
    fn test_fetch_applies_remote_filters() {
        let source = source();
        let filters = vec![RemoteFilter::Contains {
            case_type_col_id: "ctc_city".into(),
            value: "leid".into(),
        }];
        let cases = source
            .fetch_cases("ct", &filters, &AbortSignal::default())
            .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "c1");

        assert!(matches!(
            source.fetch_cases("other", &[], &AbortSignal::default()),
            Err(DashError::DataSource(_))
        ));
    }

    #[test]
    fn test_membership_change_invalidates() {
        let mut source = source();
        let mut recorder = Recorder::default();
        let change = CaseSetMemberChange {
            case_set_id: "outbreak".into(),
            add: vec!["c2".into(), "c1".into()],
            remove: vec![],
        };
        update_case_set_members(&mut source, &mut recorder, &change, &AbortSignal::default())
            .unwrap();
        assert_eq!(source.case_set_members("outbreak"), vec!["c1", "c2"]);
        assert_eq!(recorder.0, vec![QueryKey::CaseSetMembers, QueryKey::Cases]);

        let controller = AbortController::new();
        controller.abort();
        let mut recorder = Recorder::default();
        assert!(
            update_case_set_members(&mut source, &mut recorder, &change, &controller.signal())
                .is_err()
        );
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn test_latest_request_discards_stale() {
        let mut latest = LatestRequest::new();
        let first = latest.begin();
        let second = latest.begin();
        assert!(first.signal().is_aborted());
        assert!(!second.signal().is_aborted());

        // Out-of-order completion: the newer response arrives first.
        assert_eq!(latest.complete(&second, "new"), Completion::Applied("new"));
        assert_eq!(latest.complete(&first, "old"), Completion::Stale);

        let third = latest.begin();
        latest.cancel();
        assert!(third.signal().is_aborted());
        assert_eq!(latest.complete(&third, ()), Completion::Stale);
    }

    #[test]
    fn test_dependents_are_static() {
        assert!(QueryKey::CaseSetMembers.dependents().contains(&QueryKey::Cases));
        assert!(QueryKey::Organizations.dependents().is_empty());
    }
}
