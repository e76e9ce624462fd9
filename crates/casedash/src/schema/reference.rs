//! Side-loaded reference data: concept sets, region sets and organizations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A categorical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub abbreviation: String,
    pub name: String,
}

impl Concept {
    pub fn new(id: impl Into<String>, abbreviation: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            abbreviation: abbreviation.into(),
            name: name.into(),
        }
    }

    /// Label used in select options: `abbreviation (name)`.
    pub fn option_label(&self) -> String {
        format!("{} ({})", self.abbreviation, self.name)
    }
}

/// An ordered set of concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptSet {
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "keyed_list")]
    pub concepts: IndexMap<String, Concept>,
}

impl ConceptSet {
    /// Create a concept set from concepts in member order.
    pub fn new(id: impl Into<String>, concepts: Vec<Concept>) -> Self {
        let id = id.into();
        Self {
            code: id.clone(),
            name: id.clone(),
            id,
            concepts: concepts.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}

/// A geographic region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub code: String,
    pub name: String,
}

impl Region {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A set of regions at one administrative level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSet {
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// Label regions by their code instead of their name.
    #[serde(default)]
    pub region_code_as_label: bool,
    #[serde(with = "keyed_list")]
    pub regions: IndexMap<String, Region>,
}

impl RegionSet {
    /// Create a region set from regions in display order.
    pub fn new(id: impl Into<String>, region_code_as_label: bool, regions: Vec<Region>) -> Self {
        let id = id.into();
        Self {
            code: id.clone(),
            name: id.clone(),
            id,
            region_code_as_label,
            regions: regions.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Display label of a region in this set.
    pub fn label_of<'a>(&self, region: &'a Region) -> &'a str {
        if self.region_code_as_label {
            &region.code
        } else {
            &region.name
        }
    }
}

/// An organization (laboratory, institute, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

impl Organization {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Loaded reference data used to resolve display values.
///
/// Every mutation bumps `generation` so that derived caches can tell when
/// their entries are stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default, with = "keyed_list")]
    concept_sets: IndexMap<String, ConceptSet>,
    #[serde(default, with = "keyed_list")]
    region_sets: IndexMap<String, RegionSet>,
    #[serde(default, with = "keyed_list")]
    organizations: IndexMap<String, Organization>,
    #[serde(skip)]
    generation: u64,
}

impl ReferenceData {
    /// Create empty reference data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation counter, bumped on every change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn concept_set(&self, id: &str) -> Option<&ConceptSet> {
        self.concept_sets.get(id)
    }

    pub fn region_set(&self, id: &str) -> Option<&RegionSet> {
        self.region_sets.get(id)
    }

    pub fn organization(&self, id: &str) -> Option<&Organization> {
        self.organizations.get(id)
    }

    /// Ids of the loaded concept sets.
    pub fn concept_set_ids(&self) -> impl Iterator<Item = &str> {
        self.concept_sets.keys().map(String::as_str)
    }

    /// Ids of the loaded region sets.
    pub fn region_set_ids(&self) -> impl Iterator<Item = &str> {
        self.region_sets.keys().map(String::as_str)
    }

    /// All organizations in load order.
    pub fn organizations(&self) -> impl Iterator<Item = &Organization> {
        self.organizations.values()
    }

    /// Whether organizations have been loaded.
    pub fn has_organizations(&self) -> bool {
        !self.organizations.is_empty()
    }

    /// Insert or replace a concept set.
    pub fn insert_concept_set(&mut self, concept_set: ConceptSet) {
        self.concept_sets.insert(concept_set.id.clone(), concept_set);
        self.generation += 1;
    }

    /// Insert or replace a region set.
    pub fn insert_region_set(&mut self, region_set: RegionSet) {
        self.region_sets.insert(region_set.id.clone(), region_set);
        self.generation += 1;
    }

    /// Replace all organizations.
    pub fn set_organizations(&mut self, organizations: Vec<Organization>) {
        self.organizations = organizations
            .into_iter()
            .map(|o| (o.id.clone(), o))
            .collect();
        self.generation += 1;
    }

    /// Remove a concept set, returning whether it was present.
    pub fn remove_concept_set(&mut self, id: &str) -> bool {
        let removed = self.concept_sets.shift_remove(id).is_some();
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Remove a region set, returning whether it was present.
    pub fn remove_region_set(&mut self, id: &str) -> bool {
        let removed = self.region_sets.shift_remove(id).is_some();
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Drop all organizations.
    pub fn clear_organizations(&mut self) {
        if !self.organizations.is_empty() {
            self.organizations.clear();
            self.generation += 1;
        }
    }

    /// Copy every set and organization of `other` into this one.
    ///
    /// Organizations are replaced only when `other` carries any.
    pub fn merge(&mut self, other: ReferenceData) {
        self.concept_sets.extend(other.concept_sets);
        self.region_sets.extend(other.region_sets);
        if !other.organizations.is_empty() {
            self.organizations = other.organizations;
        }
        self.generation += 1;
    }

    /// Number of loaded concept sets, region sets and organizations.
    pub fn entry_count(&self) -> usize {
        self.concept_sets.len() + self.region_sets.len() + self.organizations.len()
    }

    /// Drop everything, keeping the generation moving forward.
    pub fn clear(&mut self) {
        self.concept_sets.clear();
        self.region_sets.clear();
        self.organizations.clear();
        self.generation += 1;
    }
}

/// Types stored in an id-keyed map but written as a JSON list.
trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Concept {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ConceptSet {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Region {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for RegionSet {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Organization {
    fn key(&self) -> &str {
        &self.id
    }
}

mod keyed_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Keyed;

    pub fn serialize<S, T>(map: &IndexMap<String, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Keyed,
    {
        let items: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(items
            .into_iter()
            .map(|item| (item.key().to_string(), item))
            .collect())
    }
}
