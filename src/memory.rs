//! In-memory implementation of every collaborator contract.
//!
//! The store keeps chronologies by nid together with a handful of lookups
//! (similar to database indexes) that the clauses need:
//! - (referenced component, assemblage) -> semantics
//! - assemblage -> members
//! - relationship destination -> relationship semantics
//!
//! Taxonomy questions are answered from is-a relationship semantics, resolved
//! under the coordinate at the time of the question. Nothing is cached, so
//! the answers always follow the versions that are visible.

use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

// used to keep the one-to-one mapping between concept names and nids
use bimap::BiMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::construct::{Chronology, ChronologyKind, ConceptRef, Stamp, Version};
use crate::coordinate::ManifoldCoordinate;
use crate::datatype::{Nid, NidHasher, OtherHasher, Payload, Premise};
use crate::error::Result;
use crate::nidset::NidSet;
use crate::service::{
    AssemblageService, ChronologyService, Relationship, Services, TaxonomyService, TextIndex,
};

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

// ------------- Lookups -------------
#[derive(Debug)]
pub struct Lookup<K, V, H = RandomState> {
    index: HashMap<K, HashSet<V>, H>,
}
impl<K: Eq + Hash, V: Eq + Hash + Copy, H: BuildHasher + Default> Lookup<K, V, H> {
    pub fn new() -> Self {
        Self {
            index: HashMap::<K, HashSet<V>, H>::default(),
        }
    }
    pub fn insert(&mut self, key: K, value: V) {
        let set = self.index.entry(key).or_default();
        set.insert(value);
    }
    pub fn lookup(&self, key: &K) -> Vec<V> {
        self.index
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
impl<K: Eq + Hash, V: Eq + Hash + Copy, H: BuildHasher + Default> Default for Lookup<K, V, H> {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Export -------------
/// The serialized form of a store, used by the command line tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphExport {
    pub concept_assemblage: Nid,
    pub relationship_assemblage: Nid,
    pub is_a: Nid,
    #[serde(default)]
    pub names: Vec<(Nid, String)>,
    pub chronologies: Vec<Chronology>,
}

// ------------- MemoryStore -------------
pub struct MemoryStore {
    concept_assemblage: Nid,
    relationship_assemblage: Nid,
    is_a: Nid,
    chronologies: HashMap<Nid, Arc<Chronology>, NidHasher>,
    names: BiMap<Nid, String>,
    referencing: Lookup<(Nid, Nid), Nid, NidHasher>,
    members: Lookup<Nid, Nid, NidHasher>,
    by_destination: Lookup<Nid, Nid, NidHasher>,
}

impl MemoryStore {
    /// `concept_assemblage` collects every concept, `relationship_assemblage`
    /// holds relationship semantics, and `is_a` is the relationship type
    /// that builds the taxonomy.
    pub fn new(concept_assemblage: Nid, relationship_assemblage: Nid, is_a: Nid) -> Self {
        Self {
            concept_assemblage,
            relationship_assemblage,
            is_a,
            chronologies: HashMap::default(),
            names: BiMap::new(),
            referencing: Lookup::new(),
            members: Lookup::new(),
            by_destination: Lookup::new(),
        }
    }

    pub fn concept_assemblage(&self) -> Nid {
        self.concept_assemblage
    }
    pub fn relationship_assemblage(&self) -> Nid {
        self.relationship_assemblage
    }
    pub fn is_a(&self) -> Nid {
        self.is_a
    }

    pub fn add_concept(&mut self, nid: Nid, name: &str, stamp: Stamp) {
        self.names.insert(nid, name.to_string());
        self.add_version(nid, || Chronology::concept(nid), Version::new(stamp, Payload::Concept));
    }

    /// Records another version of an existing or new concept.
    pub fn add_concept_version(&mut self, nid: Nid, stamp: Stamp) {
        self.add_version(nid, || Chronology::concept(nid), Version::new(stamp, Payload::Concept));
    }

    pub fn add_semantic(
        &mut self,
        nid: Nid,
        referenced_component: Nid,
        assemblage: Nid,
        stamp: Stamp,
        payload: Payload,
    ) {
        self.add_version(
            nid,
            || Chronology::semantic(nid, referenced_component, assemblage),
            Version::new(stamp, payload),
        );
    }

    /// Adds a relationship semantic from `source` to `destination` in the
    /// relationship assemblage.
    pub fn add_relationship(
        &mut self,
        nid: Nid,
        source: Nid,
        relationship_type: Nid,
        destination: Nid,
        premise: Premise,
        stamp: Stamp,
    ) {
        let assemblage = self.relationship_assemblage;
        self.add_semantic(
            nid,
            source,
            assemblage,
            stamp,
            Payload::Relationship {
                destination,
                relationship_type,
                group: 0,
                premise,
            },
        );
    }

    pub fn add_is_a(&mut self, nid: Nid, child: Nid, parent: Nid, premise: Premise, stamp: Stamp) {
        let is_a = self.is_a;
        self.add_relationship(nid, child, is_a, parent, premise, stamp);
    }

    fn add_version<F: FnOnce() -> Chronology>(&mut self, nid: Nid, create: F, version: Version) {
        if let Payload::Relationship { destination, .. } = version.payload() {
            self.by_destination.insert(*destination, nid);
        }
        let chronology = self
            .chronologies
            .entry(nid)
            .or_insert_with(|| Arc::new(create()));
        match chronology.kind() {
            ChronologyKind::Concept => {
                self.members.insert(self.concept_assemblage, nid);
            }
            ChronologyKind::Semantic {
                referenced_component,
                assemblage,
            } => {
                self.members.insert(assemblage, nid);
                self.referencing.insert((referenced_component, assemblage), nid);
            }
        }
        Arc::make_mut(chronology).push(version);
    }

    pub fn add_chronology(&mut self, chronology: Chronology) {
        let nid = chronology.nid();
        let kind = chronology.kind();
        for version in chronology.versions() {
            self.add_version(
                nid,
                move || match kind {
                    ChronologyKind::Concept => Chronology::concept(nid),
                    ChronologyKind::Semantic {
                        referenced_component,
                        assemblage,
                    } => Chronology::semantic(nid, referenced_component, assemblage),
                },
                version.clone(),
            );
        }
    }

    pub fn concept_named(&self, name: &str) -> Option<ConceptRef> {
        self.names
            .get_by_right(name)
            .map(|nid| ConceptRef::new(*nid, name))
    }
    pub fn name_of(&self, nid: Nid) -> Option<&str> {
        self.names.get_by_left(&nid).map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.chronologies.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chronologies.is_empty()
    }

    pub fn from_export(export: GraphExport) -> Self {
        let mut store = Self::new(
            export.concept_assemblage,
            export.relationship_assemblage,
            export.is_a,
        );
        for chronology in export.chronologies {
            store.add_chronology(chronology);
        }
        for (nid, name) in export.names {
            store.names.insert(nid, name);
        }
        store
    }
    pub fn to_export(&self) -> GraphExport {
        let mut nids: Vec<Nid> = self.chronologies.keys().copied().collect();
        nids.sort_unstable();
        let mut names: Vec<(Nid, String)> =
            self.names.iter().map(|(n, s)| (*n, s.clone())).collect();
        names.sort();
        GraphExport {
            concept_assemblage: self.concept_assemblage,
            relationship_assemblage: self.relationship_assemblage,
            is_a: self.is_a,
            names,
            chronologies: nids
                .iter()
                .map(|nid| self.chronologies[nid].as_ref().clone())
                .collect(),
        }
    }
    pub fn from_json(json: &str) -> Result<Self> {
        let export: GraphExport = serde_json::from_str(json)?;
        Ok(Self::from_export(export))
    }
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_export())?)
    }

    /// Bundles this store as every collaborator, adding one text index over
    /// all text bearing semantics for each of `index_names`.
    pub fn into_services(self, index_names: &[&str]) -> Services {
        let store = Arc::new(self);
        let mut services = Services::new(store.clone(), store.clone(), store.clone());
        for name in index_names {
            services = services.with_text_index(Arc::new(MemoryTextIndex::build(name, &store)));
        }
        services
    }

    fn active_relationships(
        &self,
        semantics: &[Nid],
        coordinate: &ManifoldCoordinate,
    ) -> Vec<(Nid, Relationship)> {
        let mut found = Vec::new();
        for nid in semantics {
            let Some(chronology) = self.chronologies.get(nid) else {
                continue;
            };
            if chronology.assemblage() != Some(self.relationship_assemblage) {
                continue;
            }
            let Some(version) = coordinate.stamp.latest(chronology.versions()) else {
                continue;
            };
            if !version.is_active() {
                continue;
            }
            if let Payload::Relationship {
                destination,
                relationship_type,
                premise,
                ..
            } = version.payload()
            {
                if *premise == coordinate.premise {
                    if let Some(source) = chronology.referenced_component() {
                        found.push((
                            source,
                            Relationship {
                                relationship_type: *relationship_type,
                                destination: *destination,
                            },
                        ));
                    }
                }
            }
        }
        found
    }

    fn parents(&self, concept: Nid, coordinate: &ManifoldCoordinate) -> Vec<Nid> {
        self.relationships(concept, coordinate)
            .into_iter()
            .filter(|r| r.relationship_type == self.is_a)
            .map(|r| r.destination)
            .collect()
    }
}

impl ChronologyService for MemoryStore {
    fn chronology(&self, nid: Nid) -> Option<Arc<Chronology>> {
        self.chronologies.get(&nid).cloned()
    }
}

impl AssemblageService for MemoryStore {
    fn semantics_referencing(&self, component: Nid, assemblage: Nid) -> NidSet {
        self.referencing.lookup(&(component, assemblage)).into_iter().collect()
    }
    fn assemblage_members(&self, assemblage: Nid) -> NidSet {
        self.members.lookup(&assemblage).into_iter().collect()
    }
    fn semantic_chronology(&self, nid: Nid) -> Option<Arc<Chronology>> {
        self.chronologies
            .get(&nid)
            .filter(|c| !c.is_concept())
            .cloned()
    }
}

impl TaxonomyService for MemoryStore {
    fn is_child_of(&self, candidate: Nid, parent: Nid, coordinate: &ManifoldCoordinate) -> bool {
        self.parents(candidate, coordinate).contains(&parent)
    }

    fn is_kind_of(&self, candidate: Nid, parent: Nid, coordinate: &ManifoldCoordinate) -> bool {
        let mut seen = HashSet::<Nid, NidHasher>::default();
        let mut queue = VecDeque::from([candidate]);
        while let Some(nid) = queue.pop_front() {
            if nid == parent {
                return true;
            }
            if seen.insert(nid) {
                queue.extend(self.parents(nid, coordinate));
            }
        }
        false
    }

    fn kind_of_set(&self, parent: Nid, coordinate: &ManifoldCoordinate) -> NidSet {
        let mut kinds = NidSet::new();
        let mut queue = VecDeque::from([parent]);
        while let Some(nid) = queue.pop_front() {
            if kinds.add(nid) {
                queue.extend(self.child_of_set(nid, coordinate).iter());
            }
        }
        kinds
    }

    fn child_of_set(&self, parent: Nid, coordinate: &ManifoldCoordinate) -> NidSet {
        let semantics = self.by_destination.lookup(&parent);
        self.active_relationships(&semantics, coordinate)
            .into_iter()
            .filter(|(_, r)| r.relationship_type == self.is_a && r.destination == parent)
            .map(|(source, _)| source)
            .collect()
    }

    fn relationships(&self, concept: Nid, coordinate: &ManifoldCoordinate) -> Vec<Relationship> {
        let semantics = self
            .referencing
            .lookup(&(concept, self.relationship_assemblage));
        self.active_relationships(&semantics, coordinate)
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }
}

// ------------- MemoryTextIndex -------------
/// Inverted token index over every version of every text bearing semantic.
///
/// A query is a list of tokens that must all appear. A query wrapped in
/// double quotes is a phrase and must appear verbatim (ignoring case).
pub struct MemoryTextIndex {
    name: String,
    tokens: HashMap<String, NidSet, OtherHasher>,
    texts: HashMap<Nid, Vec<String>, NidHasher>,
}

fn tokenize(text: &str) -> Vec<String> {
    TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

impl MemoryTextIndex {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tokens: HashMap::default(),
            texts: HashMap::default(),
        }
    }

    pub fn build(name: &str, store: &MemoryStore) -> Self {
        let mut index = Self::new(name);
        for (nid, chronology) in store.chronologies.iter() {
            for version in chronology.versions() {
                if let Some(fields) = version.payload().text_fields() {
                    for field in fields {
                        index.insert(*nid, field);
                    }
                }
            }
        }
        index
    }

    pub fn insert(&mut self, nid: Nid, text: &str) {
        for token in tokenize(text) {
            self.tokens.entry(token).or_default().add(nid);
        }
        self.texts.entry(nid).or_default().push(text.to_lowercase());
    }

    fn score(&self, nid: Nid, matched: usize) -> f32 {
        let longest = self
            .texts
            .get(&nid)
            .map(|texts| texts.iter().map(|t| tokenize(t).len()).max().unwrap_or(1))
            .unwrap_or(1)
            .max(1);
        matched as f32 / longest as f32
    }
}

impl TextIndex for MemoryTextIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, query: &str, max_results: usize) -> Vec<(Nid, f32)> {
        let trimmed = query.trim();
        let phrase = trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"');
        let wanted = tokenize(trimmed);
        if wanted.is_empty() {
            return Vec::new();
        }
        let mut candidates: Option<NidSet> = None;
        for token in &wanted {
            let hits = self.tokens.get(token).cloned().unwrap_or_default();
            candidates = Some(match candidates {
                None => hits,
                Some(mut c) => {
                    c.intersect_with(&hits);
                    c
                }
            });
        }
        let mut candidates = candidates.unwrap_or_default();
        if phrase {
            let needle = trimmed[1..trimmed.len() - 1].to_lowercase();
            candidates.retain(|nid| {
                self.texts
                    .get(&nid)
                    .map(|texts| texts.iter().any(|t| t.contains(&needle)))
                    .unwrap_or(false)
            });
        }
        let mut scored: Vec<(Nid, f32)> = candidates
            .iter()
            .map(|nid| (nid, self.score(nid, wanted.len())))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(max_results);
        scored
    }
}
