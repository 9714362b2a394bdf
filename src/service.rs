//! Contracts for the collaborators the engine reads from.
//!
//! Storage, taxonomy computation and full-text indexing live outside the
//! engine. These traits name exactly what the clauses need from them; the
//! [`crate::memory`] module provides an in-memory implementation of each.
//! Implementations must be safe for concurrent reads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::construct::{Chronology, Version};
use crate::coordinate::{ManifoldCoordinate, StampFilter};
use crate::datatype::{Nid, OtherHasher};
use crate::error::{QueryError, Result};
use crate::nidset::NidSet;

// ------------- Chronologies -------------
pub trait ChronologyService: Send + Sync {
    fn chronology(&self, nid: Nid) -> Option<Arc<Chronology>>;

    fn resolve_latest_version(&self, nid: Nid, filter: &StampFilter) -> Option<Version> {
        let chronology = self.chronology(nid)?;
        filter.latest(chronology.versions()).cloned()
    }

    fn is_latest_version_active(&self, nid: Nid, filter: &StampFilter) -> bool {
        self.resolve_latest_version(nid, filter)
            .map(|v| v.is_active())
            .unwrap_or(false)
    }
}

// ------------- Assemblages -------------
pub trait AssemblageService: Send + Sync {
    /// Semantic nids in `assemblage` whose referenced component is `component`.
    fn semantics_referencing(&self, component: Nid, assemblage: Nid) -> NidSet;

    /// Every nid belonging to `assemblage`. For a concept assemblage these
    /// are concepts, otherwise semantics.
    fn assemblage_members(&self, assemblage: Nid) -> NidSet;

    fn semantic_chronology(&self, nid: Nid) -> Option<Arc<Chronology>>;
}

// ------------- Taxonomy -------------
/// An outgoing relationship of a concept under some premise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Relationship {
    pub relationship_type: Nid,
    pub destination: Nid,
}

pub trait TaxonomyService: Send + Sync {
    fn is_child_of(&self, candidate: Nid, parent: Nid, coordinate: &ManifoldCoordinate) -> bool;

    fn is_kind_of(&self, candidate: Nid, parent: Nid, coordinate: &ManifoldCoordinate) -> bool;

    /// `parent` and everything below it.
    fn kind_of_set(&self, parent: Nid, coordinate: &ManifoldCoordinate) -> NidSet;

    /// The direct children of `parent`.
    fn child_of_set(&self, parent: Nid, coordinate: &ManifoldCoordinate) -> NidSet;

    /// Everything below `parent`, excluding `parent`.
    fn descendent_of_set(&self, parent: Nid, coordinate: &ManifoldCoordinate) -> NidSet {
        let mut descendents = self.kind_of_set(parent, coordinate);
        descendents.remove(parent);
        descendents
    }

    fn relationships(&self, concept: Nid, coordinate: &ManifoldCoordinate) -> Vec<Relationship>;
}

// ------------- Text -------------
pub trait TextIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates matching `query`, best first, at most `max_results` long.
    fn search(&self, query: &str, max_results: usize) -> Vec<(Nid, f32)>;
}

// ------------- Services -------------
/// The collaborators one evaluation reads from.
#[derive(Clone)]
pub struct Services {
    pub chronologies: Arc<dyn ChronologyService>,
    pub assemblages: Arc<dyn AssemblageService>,
    pub taxonomy: Arc<dyn TaxonomyService>,
    text_indexes: HashMap<String, Arc<dyn TextIndex>, OtherHasher>,
}

impl Services {
    pub fn new(
        chronologies: Arc<dyn ChronologyService>,
        assemblages: Arc<dyn AssemblageService>,
        taxonomy: Arc<dyn TaxonomyService>,
    ) -> Self {
        Self {
            chronologies,
            assemblages,
            taxonomy,
            text_indexes: HashMap::default(),
        }
    }
    pub fn with_text_index(mut self, index: Arc<dyn TextIndex>) -> Self {
        self.text_indexes.insert(index.name().to_string(), index);
        self
    }
    pub fn text_index(&self, name: &str) -> Result<Arc<dyn TextIndex>> {
        self.text_indexes
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::MissingCollaborator(format!("text index '{}'", name)))
    }
}
