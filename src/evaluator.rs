//! The phase evaluator.
//!
//! A clause tree is flattened into a plan in document order. Evaluation then
//! runs the three compute phases over the whole plan, with a barrier between
//! them: every clause of every assemblage finishes PRE_ITERATION before any
//! clause starts ITERATION, and so on.
//!
//! All intermediate sets live in an [`Evaluation`], which is created for one
//! run and dropped after it. The clause tree itself is only ever read, so one
//! tree can back any number of concurrent evaluations.
//!
//! Per assemblage and per plan node the evaluation tracks:
//! - the *universe*: the candidates the node is evaluated over. This is the
//!   incoming set of the assemblage, except below a name clause, where it is
//!   the set of concepts behind the name clause's own universe.
//! - the *possible* set: what PRE_ITERATION left over for the node.
//! - the *scope*: the part of the possible set that can still reach the
//!   root. ITERATION only visits the scope.
//! - the *result*: what POST_ITERATION combined.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bindings::LetBindings;
use crate::clause::{Clause, ClauseSemantic, ComputePhase, ComputePhases};
use crate::config::EngineConfig;
use crate::construct::ConceptRef;
use crate::datatype::Nid;
use crate::error::Result;
use crate::nidset::{AssemblageResults, NidSet};
use crate::operators::{self, OperatorContext, Prepared};
use crate::service::Services;
use crate::where_clause::{WhereClause, describe, parse};

// ------------- Plan -------------
struct PlanNode<'c> {
    clause: &'c Clause,
    semantic: ClauseSemantic,
    phases: ComputePhases,
    children: Vec<usize>,
}

impl PlanNode<'_> {
    fn is_leaf(&self) -> bool {
        !self.semantic.is_parent()
    }
    fn remaps(&self) -> bool {
        matches!(
            self.semantic,
            ClauseSemantic::ConceptForComponent
                | ClauseSemantic::FullyQualifiedNameForConcept
                | ClauseSemantic::PreferredNameForConcept
        )
    }
}

fn flatten<'c>(clause: &'c Clause, plan: &mut Vec<PlanNode<'c>>) -> usize {
    let index = plan.len();
    plan.push(PlanNode {
        clause,
        semantic: clause.semantic(),
        phases: clause.compute_phases(),
        children: Vec::new(),
    });
    let children: Vec<usize> = clause
        .children()
        .iter()
        .map(|child| flatten(child, plan))
        .collect();
    plan[index].children = children;
    index
}

// ------------- Evaluation context -------------
struct AssemblageState {
    assemblage: Nid,
    universe: Vec<NidSet>,
    possible: Vec<NidSet>,
    scope: Vec<NidSet>,
    iterated: Vec<Option<NidSet>>,
    result: Vec<NidSet>,
}

impl AssemblageState {
    fn new(assemblage: Nid, incoming: NidSet, nodes: usize) -> Self {
        let mut universe = vec![NidSet::new(); nodes];
        universe[0] = incoming;
        Self {
            assemblage,
            universe,
            possible: vec![NidSet::new(); nodes],
            scope: vec![NidSet::new(); nodes],
            iterated: vec![None; nodes],
            result: vec![NidSet::new(); nodes],
        }
    }
}

/// The state of one evaluation of one clause tree.
pub struct Evaluation<'c> {
    plan: Vec<PlanNode<'c>>,
    prepared: Vec<Prepared>,
    states: Vec<AssemblageState>,
}

impl<'c> Evaluation<'c> {
    pub fn new(root: &'c Clause, incoming: AssemblageResults) -> Self {
        let mut plan = Vec::with_capacity(root.size());
        flatten(root, &mut plan);
        let nodes = plan.len();
        let states = incoming
            .assemblages()
            .into_iter()
            .map(|assemblage| {
                let candidates = incoming.get(assemblage).cloned().unwrap_or_default();
                AssemblageState::new(assemblage, candidates, nodes)
            })
            .collect();
        Self {
            plan,
            prepared: Vec::with_capacity(nodes),
            states,
        }
    }

    pub fn run(mut self, ctx: &OperatorContext) -> Result<AssemblageResults> {
        for phase in ComputePhase::ORDER {
            let started = Instant::now();
            match phase {
                ComputePhase::PreIteration => self.pre_iteration(ctx)?,
                ComputePhase::Iteration => self.iteration(ctx)?,
                ComputePhase::PostIteration => self.post_iteration(ctx)?,
            }
            debug!(
                %phase,
                ms = started.elapsed().as_secs_f64() * 1000.0,
                "phase complete"
            );
        }
        let mut results = AssemblageResults::new();
        for state in self.states {
            results.insert(state.assemblage, state.result.into_iter().next().unwrap_or_default());
        }
        Ok(results)
    }

    fn pre_iteration(&mut self, ctx: &OperatorContext) -> Result<()> {
        for node in &self.plan {
            self.prepared.push(operators::prepare(node.clause, ctx)?);
        }
        for state in self.states.iter_mut() {
            // universes flow down, so parents precede children
            for (i, node) in self.plan.iter().enumerate() {
                let below = if operators::evaluates_children_over_concepts(node.semantic) {
                    operators::concepts_for(ctx, &state.universe[i])?
                } else {
                    state.universe[i].clone()
                };
                for &child in &node.children {
                    state.universe[child] = below.clone();
                }
            }
            for (i, node) in self.plan.iter().enumerate() {
                if node.is_leaf() {
                    state.possible[i] = if node.phases.contains(ComputePhase::PreIteration) {
                        self.prepared[i].narrow(ctx, &state.universe[i])?
                    } else {
                        state.universe[i].clone()
                    };
                }
            }
            for (i, node) in self.plan.iter().enumerate().rev() {
                if node.is_leaf() {
                    continue;
                }
                let children = node.children.iter().map(|c| &state.possible[*c]);
                state.possible[i] = match node.semantic {
                    ClauseSemantic::And => intersect_all(children),
                    ClauseSemantic::Or | ClauseSemantic::Xor => unite_all(children),
                    _ => state.universe[i].clone(),
                };
            }
            state.scope[0] = state.possible[0].clone();
            for (i, node) in self.plan.iter().enumerate() {
                for &child in &node.children {
                    state.scope[child] = if node.remaps() {
                        state.possible[child].clone()
                    } else {
                        state.scope[i].intersection(&state.possible[child])
                    };
                }
            }
            debug!(
                assemblage = state.assemblage,
                incoming = state.universe[0].len(),
                possible = state.possible[0].len(),
                "pre-iteration narrowed"
            );
        }
        Ok(())
    }

    fn iteration(&mut self, ctx: &OperatorContext) -> Result<()> {
        for state in self.states.iter_mut() {
            for (i, node) in self.plan.iter().enumerate() {
                if !node.is_leaf() || !node.phases.contains(ComputePhase::Iteration) {
                    continue;
                }
                let kept = iterate(&self.prepared[i], ctx, &state.scope[i])?;
                debug!(
                    assemblage = state.assemblage,
                    clause = %node.semantic,
                    visited = state.scope[i].len(),
                    kept = kept.len(),
                    "iterated"
                );
                state.iterated[i] = Some(kept);
            }
        }
        Ok(())
    }

    fn post_iteration(&mut self, ctx: &OperatorContext) -> Result<()> {
        for state in self.states.iter_mut() {
            for (i, node) in self.plan.iter().enumerate().rev() {
                let result = if node.is_leaf() {
                    match state.iterated[i].take() {
                        Some(kept) => kept,
                        None => state.possible[i].clone(),
                    }
                } else {
                    let children = node.children.iter().map(|c| &state.result[*c]);
                    match node.semantic {
                        ClauseSemantic::And => intersect_all(children),
                        ClauseSemantic::Or => unite_all(children),
                        ClauseSemantic::Xor => exactly_one(children),
                        ClauseSemantic::Not => {
                            let child = node.children.first().map(|c| &state.result[*c]);
                            match child {
                                Some(child) => state.universe[i].difference(child),
                                None => state.universe[i].clone(),
                            }
                        }
                        _ => self.prepared[i].remap(ctx, &unite_all(children))?,
                    }
                };
                state.result[i] = result;
            }
        }
        Ok(())
    }
}

fn intersect_all<'a>(mut sets: impl Iterator<Item = &'a NidSet>) -> NidSet {
    let mut result = sets.next().cloned().unwrap_or_default();
    for set in sets {
        result.intersect_with(set);
    }
    result
}

fn unite_all<'a>(sets: impl Iterator<Item = &'a NidSet>) -> NidSet {
    let mut result = NidSet::new();
    for set in sets {
        result.union_with(set);
    }
    result
}

fn exactly_one<'a>(sets: impl Iterator<Item = &'a NidSet>) -> NidSet {
    let mut seen = NidSet::new();
    let mut repeated = NidSet::new();
    for set in sets {
        repeated.union_with(&seen.intersection(set));
        seen.union_with(set);
    }
    seen.difference_with(&repeated);
    seen
}

/// Tests every candidate of `scope`. Large scopes are tested in parallel and
/// the survivors collected afterwards. Either way a failure reports the
/// lowest failing nid.
fn iterate(prepared: &Prepared, ctx: &OperatorContext, scope: &NidSet) -> Result<NidSet> {
    let threshold = ctx.config.parallel_iteration_threshold;
    if threshold == 0 || scope.len() < threshold {
        return prepared.filter(ctx, scope);
    }
    // collected in ascending nid order, whichever worker finishes first
    let verdicts: Vec<_> = scope
        .to_vec()
        .par_iter()
        .map(|nid| (*nid, prepared.matches(ctx, *nid)))
        .collect();
    let mut kept = NidSet::new();
    for (nid, verdict) in verdicts {
        if verdict? {
            kept.add(nid);
        }
    }
    Ok(kept)
}

// ------------- Entry points -------------
/// Evaluates `root` over every assemblage of `incoming`. Every incoming
/// assemblage is present in the returned map, possibly with no candidates.
pub fn evaluate(
    root: &Clause,
    bindings: &LetBindings,
    incoming: AssemblageResults,
    services: &Services,
    config: &EngineConfig,
) -> Result<AssemblageResults> {
    let started = Instant::now();
    let fingerprint = describe(root).fingerprint()?;
    let ctx = OperatorContext::new(services, bindings, config);
    let outcome = root
        .validate()
        .and_then(|_| Evaluation::new(root, incoming).run(&ctx));
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    match outcome {
        Ok(results) => {
            info!(
                ms,
                %fingerprint,
                assemblages = results.len(),
                candidates = results.candidate_count(),
                "query complete"
            );
            Ok(results)
        }
        Err(e) => {
            warn!(ms, %fingerprint, error = %e, "query error");
            Err(e)
        }
    }
}

// ------------- Query -------------
/// A clause tree together with its bindings and the assemblages it runs
/// over.
#[derive(Clone, Debug)]
pub struct Query {
    name: String,
    root: Clause,
    bindings: LetBindings,
    for_set: Vec<ConceptRef>,
}

impl Query {
    pub fn new(root: Clause, bindings: LetBindings, for_set: Vec<ConceptRef>) -> Self {
        Self {
            name: String::new(),
            root,
            bindings,
            for_set,
        }
    }
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn root(&self) -> &Clause {
        &self.root
    }
    pub fn bindings(&self) -> &LetBindings {
        &self.bindings
    }
    pub fn for_set(&self) -> &[ConceptRef] {
        &self.for_set
    }

    /// Seeds every assemblage of the for-set with its members and evaluates.
    pub fn compute(&self, services: &Services, config: &EngineConfig) -> Result<AssemblageResults> {
        let mut incoming = AssemblageResults::new();
        for assemblage in &self.for_set {
            incoming.insert(
                assemblage.nid(),
                services.assemblages.assemblage_members(assemblage.nid()),
            );
        }
        debug!(
            query = self.name.as_str(),
            assemblages = incoming.len(),
            candidates = incoming.candidate_count(),
            "computing"
        );
        evaluate(&self.root, &self.bindings, incoming, services, config)
    }

    pub fn to_saved(&self) -> SavedQuery {
        SavedQuery {
            name: self.name.clone(),
            let_bindings: self.bindings.clone(),
            for_set: self.for_set.clone(),
            where_clause: describe(&self.root),
        }
    }
}

/// The persisted form of a [`Query`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SavedQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub let_bindings: LetBindings,
    pub for_set: Vec<ConceptRef>,
    pub where_clause: WhereClause,
}

#[derive(Deserialize)]
struct RawSavedQuery {
    #[serde(default)]
    name: String,
    #[serde(default)]
    let_bindings: LetBindings,
    for_set: Vec<ConceptRef>,
    where_clause: serde_json::Value,
}

impl SavedQuery {
    pub fn to_query(&self) -> Result<Query> {
        Ok(Query::new(
            parse(&self.where_clause)?,
            self.let_bindings.clone(),
            self.for_set.clone(),
        )
        .named(self.name.clone()))
    }
    /// Reads a saved query. Problems with the where clause surface as the
    /// where clause errors they are, not as generic serialization errors.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSavedQuery = serde_json::from_str(json)?;
        Ok(SavedQuery {
            name: raw.name,
            let_bindings: raw.let_bindings,
            for_set: raw.for_set,
            where_clause: WhereClause::from_value(raw.where_clause)?,
        })
    }
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
