//! Operator implementations.
//!
//! Every clause is first *prepared*: its let keys are resolved against the
//! bindings and anything that depends only on them (closures, compiled
//! patterns, index hits) is computed once per evaluation. The prepared form
//! then answers three questions for the evaluator:
//! - `narrow`: the set-level pruning done in PRE_ITERATION,
//! - `matches`: the per-candidate predicate run in ITERATION,
//! - `remap`: the translation a re-mapping parent applies in POST_ITERATION.
//!
//! Prepared operators hold owned copies of what they read and are `Sync`, so
//! the evaluator may test candidates from several threads at once.

use regex::Regex;
use tracing::debug;

use crate::bindings::LetBindings;
use crate::clause::{Clause, ClauseSemantic};
use crate::config::EngineConfig;
use crate::construct::{ChronologyKind, ConceptRef, Version};
use crate::coordinate::{ManifoldCoordinate, StampFilter};
use crate::datatype::{Nid, Payload, Shape};
use crate::error::{QueryError, Result};
use crate::nidset::NidSet;
use crate::service::Services;

/// Longest chain of referenced components followed when looking for the
/// concept a semantic ultimately annotates.
const MAX_COMPONENT_DEPTH: usize = 64;

/// What an operator reads from during one evaluation.
#[derive(Clone, Copy)]
pub struct OperatorContext<'a> {
    pub services: &'a Services,
    pub bindings: &'a LetBindings,
    pub config: &'a EngineConfig,
}

impl<'a> OperatorContext<'a> {
    pub fn new(services: &'a Services, bindings: &'a LetBindings, config: &'a EngineConfig) -> Self {
        Self {
            services,
            bindings,
            config,
        }
    }

    fn latest(&self, nid: Nid, filter: &StampFilter) -> Option<Version> {
        self.services.chronologies.resolve_latest_version(nid, filter)
    }

    /// The referenced component of a semantic, or `None` for anything else.
    fn referenced_component(&self, nid: Nid) -> Option<Nid> {
        self.services
            .assemblages
            .semantic_chronology(nid)
            .and_then(|c| c.referenced_component())
    }

    /// Whether any semantic of `assemblage` that references `component` has
    /// an active latest version.
    fn is_member(&self, component: Nid, assemblage: Nid, filter: &StampFilter) -> bool {
        self.services
            .assemblages
            .semantics_referencing(component, assemblage)
            .iter()
            .any(|semantic| {
                self.services
                    .chronologies
                    .is_latest_version_active(semantic, filter)
            })
    }
}

// ------------- Capabilities -------------
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn apply(&self, holds: bool) -> bool {
        match self {
            Polarity::Positive => holds,
            Polarity::Negative => !holds,
        }
    }
}

/// Decides whether a component passes a precomputed subsumption closure.
pub trait SubsumptionTest: Sync {
    fn accepts(&self, component: Nid, closure: &NidSet) -> bool;
}

struct KindOf;
struct NotKindOf;

impl SubsumptionTest for KindOf {
    fn accepts(&self, component: Nid, closure: &NidSet) -> bool {
        closure.contains(component)
    }
}

impl SubsumptionTest for NotKindOf {
    fn accepts(&self, component: Nid, closure: &NidSet) -> bool {
        !closure.contains(component)
    }
}

static KIND_OF: KindOf = KindOf;
static NOT_KIND_OF: NotKindOf = NotKindOf;

// ------------- Prepared operators -------------
pub enum Prepared {
    /// Set algebra parents. They carry no state of their own.
    Combinator,
    Seed(Nid),
    Closure(NidSet),
    Activity {
        filter: StampFilter,
        polarity: Polarity,
    },
    Membership {
        assemblage: Nid,
        filter: StampFilter,
        polarity: Polarity,
    },
    ReferencedIs(Nid),
    ReferencedKind {
        closure: NidSet,
        filter: StampFilter,
        test: &'static dyn SubsumptionTest,
    },
    ReferencedMembership {
        assemblage: Nid,
        filter: StampFilter,
        polarity: Polarity,
    },
    Pattern {
        regex: Regex,
        filter: StampFilter,
        descriptions_only: bool,
    },
    Contains {
        needle: String,
        filter: StampFilter,
    },
    Search {
        hits: NidSet,
        filter: StampFilter,
        descriptions_only: bool,
    },
    Change {
        before: StampFilter,
        after: StampFilter,
    },
    Relationships {
        manifold: ManifoldCoordinate,
        types: NidSet,
        destinations: Option<NidSet>,
    },
    ConceptsForComponents,
    Names {
        manifold: ManifoldCoordinate,
        preferred: bool,
    },
}

/// The concept's latest version under `manifold` must be active before a
/// hierarchy can be rooted at it.
fn require_active(ctx: &OperatorContext, concept: &ConceptRef, filter: &StampFilter) -> Result<()> {
    if ctx
        .services
        .chronologies
        .is_latest_version_active(concept.nid(), filter)
    {
        Ok(())
    } else {
        Err(QueryError::IllegalState(format!(
            "{} is not active under the given coordinate",
            concept
        )))
    }
}

fn subsumption_closure(
    ctx: &OperatorContext,
    concept: Nid,
    manifold: &ManifoldCoordinate,
    subsume: bool,
) -> NidSet {
    if subsume {
        ctx.services.taxonomy.kind_of_set(concept, manifold)
    } else {
        NidSet::of(&[concept])
    }
}

/// Resolves the let keys of `clause` and computes everything that does not
/// depend on individual candidates.
pub fn prepare(clause: &Clause, ctx: &OperatorContext) -> Result<Prepared> {
    let b = ctx.bindings;
    let prepared = match clause {
        Clause::And(_) | Clause::Or(_) | Clause::Xor(_) | Clause::Not(_) => Prepared::Combinator,
        Clause::ConceptForComponent(_) => Prepared::ConceptsForComponents,
        Clause::FullyQualifiedNameForConcept(p, _) => Prepared::Names {
            manifold: b.manifold(&p.manifold)?.clone(),
            preferred: false,
        },
        Clause::PreferredNameForConcept(p, _) => Prepared::Names {
            manifold: b.manifold(&p.manifold)?.clone(),
            preferred: true,
        },
        Clause::ConceptIs(p) => Prepared::Seed(b.concept(&p.concept)?.nid()),
        Clause::ConceptIsKindOf(p) | Clause::ConceptIsChildOf(p) | Clause::ConceptIsDescendentOf(p) => {
            let concept = b.concept(&p.concept)?;
            let manifold = b.manifold(&p.manifold)?;
            require_active(ctx, concept, &manifold.stamp)?;
            let taxonomy = &ctx.services.taxonomy;
            Prepared::Closure(match clause {
                Clause::ConceptIsChildOf(_) => taxonomy.child_of_set(concept.nid(), manifold),
                Clause::ConceptIsDescendentOf(_) => {
                    taxonomy.descendent_of_set(concept.nid(), manifold)
                }
                _ => taxonomy.kind_of_set(concept.nid(), manifold),
            })
        }
        Clause::ComponentIsActive(p) => Prepared::Activity {
            filter: b.stamp_filter(&p.stamp)?.clone(),
            polarity: Polarity::Positive,
        },
        Clause::ComponentIsInactive(p) => Prepared::Activity {
            filter: b.stamp_filter(&p.stamp)?.clone(),
            polarity: Polarity::Negative,
        },
        Clause::ComponentIsMemberOf(p) | Clause::ComponentIsNotMemberOf(p) => Prepared::Membership {
            assemblage: b.concept(&p.assemblage)?.nid(),
            filter: b.stamp_filter(&p.stamp)?.clone(),
            polarity: if matches!(clause, Clause::ComponentIsMemberOf(_)) {
                Polarity::Positive
            } else {
                Polarity::Negative
            },
        },
        Clause::ReferencedComponentIs(p) => Prepared::ReferencedIs(b.concept(&p.concept)?.nid()),
        Clause::ReferencedComponentIsKindOf(p) | Clause::ReferencedComponentIsNotKindOf(p) => {
            let concept = b.concept(&p.concept)?;
            let manifold = b.manifold(&p.manifold)?;
            require_active(ctx, concept, &manifold.stamp)?;
            let test: &'static dyn SubsumptionTest =
                if matches!(clause, Clause::ReferencedComponentIsKindOf(_)) {
                    &KIND_OF
                } else {
                    &NOT_KIND_OF
                };
            Prepared::ReferencedKind {
                closure: ctx.services.taxonomy.kind_of_set(concept.nid(), manifold),
                filter: manifold.stamp.clone(),
                test,
            }
        }
        Clause::ReferencedComponentIsMemberOf(p) | Clause::ReferencedComponentIsNotMemberOf(p) => {
            Prepared::ReferencedMembership {
                assemblage: b.concept(&p.assemblage)?.nid(),
                filter: b.stamp_filter(&p.stamp)?.clone(),
                polarity: if matches!(clause, Clause::ReferencedComponentIsMemberOf(_)) {
                    Polarity::Positive
                } else {
                    Polarity::Negative
                },
            }
        }
        Clause::DescriptionRegexMatch(p) | Clause::SemanticRegexMatch(p) => Prepared::Pattern {
            regex: Regex::new(b.text(&p.text)?)?,
            filter: b.stamp_filter(&p.stamp)?.clone(),
            descriptions_only: matches!(clause, Clause::DescriptionRegexMatch(_)),
        },
        Clause::SemanticContainsText(p) => Prepared::Contains {
            needle: b.text(&p.text)?.to_string(),
            filter: b.stamp_filter(&p.stamp)?.clone(),
        },
        Clause::DescriptionLuceneMatch(p) | Clause::SemanticLuceneMatch(p) => {
            let descriptions_only = matches!(clause, Clause::DescriptionLuceneMatch(_));
            let index_name = if descriptions_only {
                &ctx.config.description_index
            } else {
                &ctx.config.semantic_index
            };
            let index = ctx.services.text_index(index_name)?;
            let query = b.text(&p.text)?;
            let hits: NidSet = index
                .search(query, ctx.config.max_text_results)
                .into_iter()
                .map(|(nid, _score)| nid)
                .collect();
            debug!(index = index_name.as_str(), query, hits = hits.len(), "text search");
            Prepared::Search {
                hits,
                filter: b.stamp_filter(&p.stamp)?.clone(),
                descriptions_only,
            }
        }
        Clause::ChangedBetweenVersions(p) => Prepared::Change {
            before: b.stamp_filter(&p.before)?.clone(),
            after: b.stamp_filter(&p.after)?.clone(),
        },
        Clause::RelType(p) => {
            let manifold = b.manifold(&p.manifold)?.clone();
            let relationship_type = b.concept(&p.relationship_type)?.nid();
            let subsume = b.boolean(&p.type_subsumption)?;
            Prepared::Relationships {
                types: subsumption_closure(ctx, relationship_type, &manifold, subsume),
                destinations: None,
                manifold,
            }
        }
        Clause::RelRestriction(p) => {
            let manifold = b.manifold(&p.manifold)?.clone();
            let relationship_type = b.concept(&p.relationship_type)?.nid();
            let destination = b.concept(&p.destination)?.nid();
            let subsume_type = b.boolean(&p.type_subsumption)?;
            let subsume_destination = b.boolean(&p.destination_subsumption)?;
            Prepared::Relationships {
                types: subsumption_closure(ctx, relationship_type, &manifold, subsume_type),
                destinations: Some(subsumption_closure(
                    ctx,
                    destination,
                    &manifold,
                    subsume_destination,
                )),
                manifold,
            }
        }
        Clause::RelationshipIsCircular(_) | Clause::TaxonomyRelatedConcepts(_) => {
            return Err(QueryError::Unimplemented {
                semantic: clause.semantic(),
            });
        }
    };
    debug!(clause = %clause.semantic(), "clause prepared");
    Ok(prepared)
}

impl Prepared {
    /// PRE_ITERATION pruning of `incoming`.
    pub fn narrow(&self, ctx: &OperatorContext, incoming: &NidSet) -> Result<NidSet> {
        match self {
            Prepared::Seed(nid) => Ok(NidSet::of(&[*nid])),
            Prepared::Closure(closure) => Ok(incoming.intersection(closure)),
            Prepared::Search { hits, .. } => self.filter(ctx, &incoming.intersection(hits)),
            Prepared::Activity { .. }
            | Prepared::Membership { .. }
            | Prepared::ReferencedIs(_)
            | Prepared::ReferencedKind { .. }
            | Prepared::ReferencedMembership { .. } => self.filter(ctx, incoming),
            _ => Ok(incoming.clone()),
        }
    }

    /// Every candidate of `candidates` that `matches`.
    pub fn filter(&self, ctx: &OperatorContext, candidates: &NidSet) -> Result<NidSet> {
        let mut kept = NidSet::new();
        for nid in candidates.iter() {
            if self.matches(ctx, nid)? {
                kept.add(nid);
            }
        }
        Ok(kept)
    }

    /// The per-candidate predicate.
    pub fn matches(&self, ctx: &OperatorContext, nid: Nid) -> Result<bool> {
        Ok(match self {
            Prepared::Combinator | Prepared::ConceptsForComponents | Prepared::Names { .. } => {
                return Err(QueryError::IllegalState(
                    "parent clauses have no per-candidate predicate".to_string(),
                ));
            }
            Prepared::Seed(seed) => nid == *seed,
            Prepared::Closure(closure) => closure.contains(nid),
            // absent chronologies pass neither polarity
            Prepared::Activity { filter, polarity } => match ctx.latest(nid, filter) {
                Some(version) => polarity.apply(version.is_active()),
                None => false,
            },
            Prepared::Membership {
                assemblage,
                filter,
                polarity,
            } => {
                ctx.latest(nid, filter).is_some()
                    && polarity.apply(ctx.is_member(nid, *assemblage, filter))
            }
            Prepared::ReferencedIs(concept) => ctx.referenced_component(nid) == Some(*concept),
            Prepared::ReferencedKind {
                closure,
                filter,
                test,
            } => match ctx.referenced_component(nid) {
                Some(component) if ctx.latest(nid, filter).is_some() => {
                    test.accepts(component, closure)
                }
                _ => false,
            },
            Prepared::ReferencedMembership {
                assemblage,
                filter,
                polarity,
            } => match ctx.referenced_component(nid) {
                Some(component) if ctx.latest(nid, filter).is_some() => {
                    polarity.apply(ctx.is_member(component, *assemblage, filter))
                }
                _ => false,
            },
            Prepared::Pattern {
                regex,
                filter,
                descriptions_only,
            } => match text_target(ctx, nid, filter)? {
                Some(version) => {
                    if *descriptions_only && version.shape() != Shape::Description {
                        return Err(unsupported(nid, &version));
                    }
                    text_fields(nid, &version)?
                        .iter()
                        .any(|field| regex.is_match(field))
                }
                None => false,
            },
            Prepared::Contains { needle, filter } => match text_target(ctx, nid, filter)? {
                Some(version) => text_fields(nid, &version)?
                    .iter()
                    .any(|field| field.contains(needle.as_str())),
                None => false,
            },
            Prepared::Search {
                hits,
                filter,
                descriptions_only,
            } => {
                hits.contains(nid)
                    && match ctx.latest(nid, filter) {
                        Some(version) => {
                            version.is_active()
                                && (!descriptions_only || version.shape() == Shape::Description)
                        }
                        None => false,
                    }
            }
            Prepared::Change { before, after } => {
                match (ctx.latest(nid, before), ctx.latest(nid, after)) {
                    (None, None) => false,
                    (Some(a), Some(b)) => !a.deep_equals(&b),
                    _ => true,
                }
            }
            Prepared::Relationships {
                manifold,
                types,
                destinations,
            } => ctx
                .services
                .taxonomy
                .relationships(nid, manifold)
                .iter()
                .any(|r| {
                    types.contains(r.relationship_type)
                        && destinations
                            .as_ref()
                            .map(|d| d.contains(r.destination))
                            .unwrap_or(true)
                }),
        })
    }

    /// POST_ITERATION translation of the union of a re-mapping parent's
    /// child results.
    pub fn remap(&self, ctx: &OperatorContext, input: &NidSet) -> Result<NidSet> {
        match self {
            Prepared::ConceptsForComponents => concepts_for(ctx, input),
            Prepared::Names {
                manifold,
                preferred,
            } => Ok(names_for(ctx, input, manifold, *preferred)),
            _ => Err(QueryError::IllegalState(
                "only re-mapping parents translate their results".to_string(),
            )),
        }
    }
}

fn unsupported(nid: Nid, version: &Version) -> QueryError {
    QueryError::UnsupportedMatchTarget {
        nid,
        shape: version.shape().to_string(),
    }
}

/// The latest version of a semantic candidate. Concepts, and semantics with
/// nothing visible under `filter`, are not text match targets.
fn text_target(ctx: &OperatorContext, nid: Nid, filter: &StampFilter) -> Result<Option<Version>> {
    if ctx.services.assemblages.semantic_chronology(nid).is_none() {
        return Ok(None);
    }
    Ok(ctx.latest(nid, filter))
}

fn text_fields(nid: Nid, version: &Version) -> Result<Vec<String>> {
    version
        .payload()
        .text_fields()
        .map(|fields| fields.into_iter().map(str::to_string).collect())
        .ok_or_else(|| unsupported(nid, version))
}

// ------------- Re-mapping -------------
/// Maps every nid to the concept it ultimately annotates, following
/// referenced components. Concepts map to themselves and nids without a
/// chronology are dropped.
pub fn concepts_for(ctx: &OperatorContext, input: &NidSet) -> Result<NidSet> {
    let mut concepts = NidSet::new();
    for nid in input.iter() {
        let mut current = nid;
        let mut depth = 0;
        while let Some(chronology) = ctx.services.chronologies.chronology(current) {
            match chronology.kind() {
                ChronologyKind::Concept => {
                    concepts.add(current);
                    break;
                }
                ChronologyKind::Semantic {
                    referenced_component,
                    ..
                } => {
                    depth += 1;
                    if depth > MAX_COMPONENT_DEPTH {
                        return Err(QueryError::IllegalState(format!(
                            "component chain from {} does not reach a concept",
                            nid
                        )));
                    }
                    current = referenced_component;
                }
            }
        }
    }
    Ok(concepts)
}

/// Active descriptions of `concept` in the manifold's language.
fn descriptions_of(ctx: &OperatorContext, concept: Nid, manifold: &ManifoldCoordinate) -> Vec<(Nid, Nid)> {
    let language = &manifold.language;
    ctx.services
        .assemblages
        .semantics_referencing(concept, language.description_assemblage)
        .iter()
        .filter_map(|nid| {
            let version = ctx.latest(nid, &manifold.stamp)?;
            if !version.is_active() {
                return None;
            }
            match version.payload() {
                Payload::Description {
                    description_type,
                    language: lang,
                    ..
                } if *lang == language.language => Some((nid, *description_type)),
                _ => None,
            }
        })
        .collect()
}

fn is_preferred_in(ctx: &OperatorContext, description: Nid, dialect: Nid, manifold: &ManifoldCoordinate) -> bool {
    ctx.services
        .assemblages
        .semantics_referencing(description, dialect)
        .iter()
        .any(|acceptability| match ctx.latest(acceptability, &manifold.stamp) {
            Some(version) => {
                version.is_active()
                    && version.payload().component() == Some(manifold.language.preferred_acceptability)
            }
            None => false,
        })
}

/// Fully qualified names, or preferred regular names, of `concepts`.
/// Preferred names come from the first dialect in which a concept has one.
pub fn names_for(
    ctx: &OperatorContext,
    concepts: &NidSet,
    manifold: &ManifoldCoordinate,
    preferred: bool,
) -> NidSet {
    let language = &manifold.language;
    let mut names = NidSet::new();
    for concept in concepts.iter() {
        let descriptions = descriptions_of(ctx, concept, manifold);
        if !preferred {
            names.extend(
                descriptions
                    .iter()
                    .filter(|(_, kind)| *kind == language.fully_qualified_name_type)
                    .map(|(nid, _)| *nid),
            );
            continue;
        }
        for dialect in &language.dialect_assemblages {
            let found: Vec<Nid> = descriptions
                .iter()
                .filter(|(_, kind)| *kind == language.regular_name_type)
                .map(|(nid, _)| *nid)
                .filter(|nid| is_preferred_in(ctx, *nid, *dialect, manifold))
                .collect();
            if !found.is_empty() {
                names.extend(found);
                break;
            }
        }
    }
    names
}

/// Name clauses evaluate their children over the concepts behind their own
/// candidates.
pub fn evaluates_children_over_concepts(semantic: ClauseSemantic) -> bool {
    matches!(
        semantic,
        ClauseSemantic::FullyQualifiedNameForConcept | ClauseSemantic::PreferredNameForConcept
    )
}
