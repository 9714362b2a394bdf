//! The clause tree.
//!
//! A query is a tree of [`Clause`] nodes. Parent clauses combine or re-map the
//! results of their children; leaf clauses filter the candidate bitset of the
//! assemblage being evaluated. Every node is tagged by a [`ClauseSemantic`],
//! a fixed enumeration whose names are the persisted form of the operator.
//!
//! Clause trees hold no evaluation state. Everything an evaluation produces
//! lives in the evaluator's context, so one tree can be evaluated any number
//! of times, also concurrently.

use std::fmt;

// used to look clause tags up by variant and by name
use bimap::BiMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::bindings::LetKey;
use crate::error::{QueryError, Result};

// ------------- ClauseSemantic -------------
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ClauseSemantic {
    And,
    Or,
    Xor,
    Not,
    ConceptForComponent,
    FullyQualifiedNameForConcept,
    PreferredNameForConcept,
    ConceptIs,
    ConceptIsKindOf,
    ConceptIsChildOf,
    ConceptIsDescendentOf,
    ComponentIsActive,
    ComponentIsInactive,
    ComponentIsMemberOf,
    ComponentIsNotMemberOf,
    ReferencedComponentIs,
    ReferencedComponentIsKindOf,
    ReferencedComponentIsNotKindOf,
    ReferencedComponentIsMemberOf,
    ReferencedComponentIsNotMemberOf,
    DescriptionRegexMatch,
    DescriptionLuceneMatch,
    SemanticContainsText,
    SemanticRegexMatch,
    SemanticLuceneMatch,
    ChangedBetweenVersions,
    RelType,
    RelRestriction,
    RelationshipIsCircular,
    TaxonomyRelatedConcepts,
}

use ClauseSemantic::*;

lazy_static! {
    static ref TAGS: BiMap<ClauseSemantic, &'static str> = ClauseSemantic::ALL
        .iter()
        .map(|semantic| (*semantic, semantic.as_str()))
        .collect();
}

/// Clauses whose results are concept nids.
const CONCEPT_CLAUSES: &[ClauseSemantic] = &[
    And,
    Or,
    Xor,
    Not,
    ConceptForComponent,
    ConceptIs,
    ConceptIsKindOf,
    ConceptIsChildOf,
    ConceptIsDescendentOf,
    ComponentIsActive,
    ComponentIsInactive,
    ComponentIsMemberOf,
    ComponentIsNotMemberOf,
    ChangedBetweenVersions,
    RelType,
    RelRestriction,
    RelationshipIsCircular,
    TaxonomyRelatedConcepts,
];

/// Clauses that can sit next to a name clause: their inputs and outputs are
/// description nids as well.
const DESCRIPTION_SIBLINGS: &[ClauseSemantic] = &[
    FullyQualifiedNameForConcept,
    PreferredNameForConcept,
    DescriptionRegexMatch,
    DescriptionLuceneMatch,
    SemanticContainsText,
    SemanticRegexMatch,
    ComponentIsActive,
    ComponentIsInactive,
    ComponentIsMemberOf,
    ComponentIsNotMemberOf,
    ChangedBetweenVersions,
];

impl ClauseSemantic {
    pub const ALL: [ClauseSemantic; 30] = [
        And,
        Or,
        Xor,
        Not,
        ConceptForComponent,
        FullyQualifiedNameForConcept,
        PreferredNameForConcept,
        ConceptIs,
        ConceptIsKindOf,
        ConceptIsChildOf,
        ConceptIsDescendentOf,
        ComponentIsActive,
        ComponentIsInactive,
        ComponentIsMemberOf,
        ComponentIsNotMemberOf,
        ReferencedComponentIs,
        ReferencedComponentIsKindOf,
        ReferencedComponentIsNotKindOf,
        ReferencedComponentIsMemberOf,
        ReferencedComponentIsNotMemberOf,
        DescriptionRegexMatch,
        DescriptionLuceneMatch,
        SemanticContainsText,
        SemanticRegexMatch,
        SemanticLuceneMatch,
        ChangedBetweenVersions,
        RelType,
        RelRestriction,
        RelationshipIsCircular,
        TaxonomyRelatedConcepts,
    ];

    /// The persisted tag. These names never change once released.
    pub fn as_str(&self) -> &'static str {
        match self {
            And => "and",
            Or => "or",
            Xor => "xor",
            Not => "not",
            ConceptForComponent => "concept-for-component",
            FullyQualifiedNameForConcept => "fully-qualified-name-for-concept",
            PreferredNameForConcept => "preferred-name-for-concept",
            ConceptIs => "concept-is",
            ConceptIsKindOf => "concept-is-kind-of",
            ConceptIsChildOf => "concept-is-child-of",
            ConceptIsDescendentOf => "concept-is-descendent-of",
            ComponentIsActive => "component-is-active",
            ComponentIsInactive => "component-is-inactive",
            ComponentIsMemberOf => "component-is-member-of",
            ComponentIsNotMemberOf => "component-is-not-member-of",
            ReferencedComponentIs => "referenced-component-is",
            ReferencedComponentIsKindOf => "referenced-component-is-kind-of",
            ReferencedComponentIsNotKindOf => "referenced-component-is-not-kind-of",
            ReferencedComponentIsMemberOf => "referenced-component-is-member-of",
            ReferencedComponentIsNotMemberOf => "referenced-component-is-not-member-of",
            DescriptionRegexMatch => "description-regex-match",
            DescriptionLuceneMatch => "description-lucene-match",
            SemanticContainsText => "semantic-contains-text",
            SemanticRegexMatch => "semantic-regex-match",
            SemanticLuceneMatch => "semantic-lucene-match",
            ChangedBetweenVersions => "changed-between-versions",
            RelType => "rel-type",
            RelRestriction => "rel-restriction",
            RelationshipIsCircular => "relationship-is-circular",
            TaxonomyRelatedConcepts => "taxonomy-related-concepts",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        TAGS.get_by_right(tag)
            .copied()
            .ok_or_else(|| QueryError::UnknownClauseTag(tag.to_string()))
    }

    pub fn is_parent(&self) -> bool {
        matches!(
            self,
            And | Or
                | Xor
                | Not
                | ConceptForComponent
                | FullyQualifiedNameForConcept
                | PreferredNameForConcept
        )
    }

    /// How many let keys a clause of this kind references.
    pub fn let_key_count(&self) -> usize {
        match self {
            And | Or | Xor | Not | ConceptForComponent => 0,
            FullyQualifiedNameForConcept | PreferredNameForConcept => 1,
            ConceptIs | ReferencedComponentIs => 1,
            ComponentIsActive | ComponentIsInactive => 1,
            ConceptIsKindOf | ConceptIsChildOf | ConceptIsDescendentOf => 2,
            ReferencedComponentIsKindOf | ReferencedComponentIsNotKindOf => 2,
            ComponentIsMemberOf | ComponentIsNotMemberOf => 2,
            ReferencedComponentIsMemberOf | ReferencedComponentIsNotMemberOf => 2,
            DescriptionRegexMatch | SemanticRegexMatch | SemanticContainsText => 2,
            DescriptionLuceneMatch | SemanticLuceneMatch => 2,
            ChangedBetweenVersions => 2,
            RelType => 3,
            RelRestriction => 5,
            RelationshipIsCircular => 1,
            TaxonomyRelatedConcepts => 2,
        }
    }

    pub fn compute_phases(&self) -> ComputePhases {
        match self {
            And | Or | Xor | Not => ComputePhases::PRE_AND_POST_ITERATION,
            ConceptForComponent | FullyQualifiedNameForConcept | PreferredNameForConcept => {
                ComputePhases::POST_ITERATION
            }
            ConceptIs
            | ConceptIsKindOf
            | ConceptIsChildOf
            | ConceptIsDescendentOf
            | ComponentIsActive
            | ComponentIsInactive
            | ComponentIsMemberOf
            | ComponentIsNotMemberOf
            | ReferencedComponentIs
            | ReferencedComponentIsKindOf
            | ReferencedComponentIsNotKindOf
            | ReferencedComponentIsMemberOf
            | ReferencedComponentIsNotMemberOf
            | DescriptionLuceneMatch
            | SemanticLuceneMatch
            | TaxonomyRelatedConcepts => ComputePhases::PRE_ITERATION,
            SemanticContainsText | ChangedBetweenVersions => ComputePhases::ITERATION,
            DescriptionRegexMatch
            | SemanticRegexMatch
            | RelType
            | RelRestriction
            | RelationshipIsCircular => ComputePhases::PRE_ITERATION_AND_ITERATION,
        }
    }

    /// `None` means any clause may be a child.
    pub fn allowed_children(&self) -> Option<&'static [ClauseSemantic]> {
        match self {
            FullyQualifiedNameForConcept | PreferredNameForConcept => Some(CONCEPT_CLAUSES),
            _ => None,
        }
    }

    /// `None` means any clause may be a sibling.
    pub fn allowed_siblings(&self) -> Option<&'static [ClauseSemantic]> {
        match self {
            FullyQualifiedNameForConcept | PreferredNameForConcept => Some(DESCRIPTION_SIBLINGS),
            _ => None,
        }
    }
}

impl fmt::Display for ClauseSemantic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ClauseSemantic> for &'static str {
    fn from(semantic: ClauseSemantic) -> Self {
        semantic.as_str()
    }
}

impl TryFrom<String> for ClauseSemantic {
    type Error = QueryError;
    fn try_from(tag: String) -> Result<Self> {
        ClauseSemantic::from_tag(&tag)
    }
}

// ------------- ComputePhases -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ComputePhase {
    PreIteration,
    Iteration,
    PostIteration,
}

impl ComputePhase {
    pub const ORDER: [ComputePhase; 3] = [
        ComputePhase::PreIteration,
        ComputePhase::Iteration,
        ComputePhase::PostIteration,
    ];
    fn bit(&self) -> u8 {
        match self {
            ComputePhase::PreIteration => 0b001,
            ComputePhase::Iteration => 0b010,
            ComputePhase::PostIteration => 0b100,
        }
    }
}

impl fmt::Display for ComputePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ComputePhase::PreIteration => "PRE_ITERATION",
            ComputePhase::Iteration => "ITERATION",
            ComputePhase::PostIteration => "POST_ITERATION",
        };
        write!(f, "{}", name)
    }
}

/// The phases a clause takes part in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComputePhases(u8);

impl ComputePhases {
    pub const PRE_ITERATION: ComputePhases = ComputePhases(0b001);
    pub const ITERATION: ComputePhases = ComputePhases(0b010);
    pub const POST_ITERATION: ComputePhases = ComputePhases(0b100);
    pub const PRE_AND_POST_ITERATION: ComputePhases = ComputePhases(0b101);
    pub const PRE_ITERATION_AND_ITERATION: ComputePhases = ComputePhases(0b011);

    pub fn contains(&self, phase: ComputePhase) -> bool {
        self.0 & phase.bit() != 0
    }
}

// ------------- Parameters -------------
// Each leaf embeds one of these by value. Field order is the order in which
// the keys are persisted.
macro_rules! let_params {
    ($(#[$doc:meta])* $name:ident { $($field:ident),+ }) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, Debug)]
        pub struct $name {
            $(pub $field: LetKey,)+
        }
        impl $name {
            pub fn new($($field: impl Into<LetKey>),+) -> Self {
                Self { $($field: $field.into(),)+ }
            }
            pub fn let_keys(&self) -> Vec<LetKey> {
                vec![$(self.$field.clone(),)+]
            }
            fn from_keys(keys: &[LetKey]) -> Self {
                let mut keys = keys.iter().cloned();
                Self { $($field: keys.next().unwrap_or_else(|| LetKey::new("")),)+ }
            }
        }
    };
}

let_params!(ConceptParams { concept });
let_params!(
    /// A concept and the manifold coordinate the taxonomy is read under.
    HierarchyParams { concept, manifold }
);
let_params!(StampParams { stamp });
let_params!(MembershipParams { assemblage, stamp });
let_params!(
    /// A let-bound text (a literal, a regular expression or an index query)
    /// and the stamp filter selecting the version to inspect.
    TextParams { text, stamp }
);
let_params!(ChangeParams { before, after });
let_params!(ManifoldParams { manifold });
let_params!(RelTypeParams {
    relationship_type,
    manifold,
    type_subsumption
});
let_params!(RelRestrictionParams {
    relationship_type,
    destination,
    manifold,
    type_subsumption,
    destination_subsumption
});

// ------------- Clause -------------
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Clause {
    And(Vec<Clause>),
    Or(Vec<Clause>),
    Xor(Vec<Clause>),
    Not(Box<Clause>),
    ConceptForComponent(Vec<Clause>),
    FullyQualifiedNameForConcept(ManifoldParams, Vec<Clause>),
    PreferredNameForConcept(ManifoldParams, Vec<Clause>),
    ConceptIs(ConceptParams),
    ConceptIsKindOf(HierarchyParams),
    ConceptIsChildOf(HierarchyParams),
    ConceptIsDescendentOf(HierarchyParams),
    ComponentIsActive(StampParams),
    ComponentIsInactive(StampParams),
    ComponentIsMemberOf(MembershipParams),
    ComponentIsNotMemberOf(MembershipParams),
    ReferencedComponentIs(ConceptParams),
    ReferencedComponentIsKindOf(HierarchyParams),
    ReferencedComponentIsNotKindOf(HierarchyParams),
    ReferencedComponentIsMemberOf(MembershipParams),
    ReferencedComponentIsNotMemberOf(MembershipParams),
    DescriptionRegexMatch(TextParams),
    DescriptionLuceneMatch(TextParams),
    SemanticContainsText(TextParams),
    SemanticRegexMatch(TextParams),
    SemanticLuceneMatch(TextParams),
    ChangedBetweenVersions(ChangeParams),
    RelType(RelTypeParams),
    RelRestriction(RelRestrictionParams),
    RelationshipIsCircular(ManifoldParams),
    TaxonomyRelatedConcepts(HierarchyParams),
}

/// Let-key count and child count a node must have for its tag.
fn check_arity(semantic: ClauseSemantic, keys: usize, children: usize) -> Result<()> {
    if keys != semantic.let_key_count() {
        return Err(QueryError::MalformedWhereClause(format!(
            "{} takes {} let keys, found {}",
            semantic,
            semantic.let_key_count(),
            keys
        )));
    }
    if semantic.is_parent() {
        if children == 0 {
            return Err(QueryError::MalformedWhereClause(format!(
                "{} needs at least one child",
                semantic
            )));
        }
        if semantic == Not && children != 1 {
            return Err(QueryError::MalformedWhereClause(format!(
                "not takes exactly one child, found {}",
                children
            )));
        }
    } else if children != 0 {
        return Err(QueryError::MalformedWhereClause(format!(
            "{} is a leaf and cannot have children",
            semantic
        )));
    }
    Ok(())
}

impl Clause {
    pub fn semantic(&self) -> ClauseSemantic {
        match self {
            Clause::And(_) => And,
            Clause::Or(_) => Or,
            Clause::Xor(_) => Xor,
            Clause::Not(_) => Not,
            Clause::ConceptForComponent(_) => ConceptForComponent,
            Clause::FullyQualifiedNameForConcept(..) => FullyQualifiedNameForConcept,
            Clause::PreferredNameForConcept(..) => PreferredNameForConcept,
            Clause::ConceptIs(_) => ConceptIs,
            Clause::ConceptIsKindOf(_) => ConceptIsKindOf,
            Clause::ConceptIsChildOf(_) => ConceptIsChildOf,
            Clause::ConceptIsDescendentOf(_) => ConceptIsDescendentOf,
            Clause::ComponentIsActive(_) => ComponentIsActive,
            Clause::ComponentIsInactive(_) => ComponentIsInactive,
            Clause::ComponentIsMemberOf(_) => ComponentIsMemberOf,
            Clause::ComponentIsNotMemberOf(_) => ComponentIsNotMemberOf,
            Clause::ReferencedComponentIs(_) => ReferencedComponentIs,
            Clause::ReferencedComponentIsKindOf(_) => ReferencedComponentIsKindOf,
            Clause::ReferencedComponentIsNotKindOf(_) => ReferencedComponentIsNotKindOf,
            Clause::ReferencedComponentIsMemberOf(_) => ReferencedComponentIsMemberOf,
            Clause::ReferencedComponentIsNotMemberOf(_) => ReferencedComponentIsNotMemberOf,
            Clause::DescriptionRegexMatch(_) => DescriptionRegexMatch,
            Clause::DescriptionLuceneMatch(_) => DescriptionLuceneMatch,
            Clause::SemanticContainsText(_) => SemanticContainsText,
            Clause::SemanticRegexMatch(_) => SemanticRegexMatch,
            Clause::SemanticLuceneMatch(_) => SemanticLuceneMatch,
            Clause::ChangedBetweenVersions(_) => ChangedBetweenVersions,
            Clause::RelType(_) => RelType,
            Clause::RelRestriction(_) => RelRestriction,
            Clause::RelationshipIsCircular(_) => RelationshipIsCircular,
            Clause::TaxonomyRelatedConcepts(_) => TaxonomyRelatedConcepts,
        }
    }

    pub fn compute_phases(&self) -> ComputePhases {
        self.semantic().compute_phases()
    }

    pub fn children(&self) -> &[Clause] {
        match self {
            Clause::And(children)
            | Clause::Or(children)
            | Clause::Xor(children)
            | Clause::ConceptForComponent(children)
            | Clause::FullyQualifiedNameForConcept(_, children)
            | Clause::PreferredNameForConcept(_, children) => children,
            Clause::Not(child) => std::slice::from_ref(child.as_ref()),
            _ => &[],
        }
    }

    /// The let keys this clause reads, in the order it consumes them.
    pub fn let_keys(&self) -> Vec<LetKey> {
        match self {
            Clause::And(_)
            | Clause::Or(_)
            | Clause::Xor(_)
            | Clause::Not(_)
            | Clause::ConceptForComponent(_) => Vec::new(),
            Clause::FullyQualifiedNameForConcept(p, _) | Clause::PreferredNameForConcept(p, _) => {
                p.let_keys()
            }
            Clause::ConceptIs(p) | Clause::ReferencedComponentIs(p) => p.let_keys(),
            Clause::ConceptIsKindOf(p)
            | Clause::ConceptIsChildOf(p)
            | Clause::ConceptIsDescendentOf(p)
            | Clause::ReferencedComponentIsKindOf(p)
            | Clause::ReferencedComponentIsNotKindOf(p)
            | Clause::TaxonomyRelatedConcepts(p) => p.let_keys(),
            Clause::ComponentIsActive(p) | Clause::ComponentIsInactive(p) => p.let_keys(),
            Clause::ComponentIsMemberOf(p)
            | Clause::ComponentIsNotMemberOf(p)
            | Clause::ReferencedComponentIsMemberOf(p)
            | Clause::ReferencedComponentIsNotMemberOf(p) => p.let_keys(),
            Clause::DescriptionRegexMatch(p)
            | Clause::DescriptionLuceneMatch(p)
            | Clause::SemanticContainsText(p)
            | Clause::SemanticRegexMatch(p)
            | Clause::SemanticLuceneMatch(p) => p.let_keys(),
            Clause::ChangedBetweenVersions(p) => p.let_keys(),
            Clause::RelType(p) => p.let_keys(),
            Clause::RelRestriction(p) => p.let_keys(),
            Clause::RelationshipIsCircular(p) => p.let_keys(),
        }
    }

    /// Builds a clause from its tag, let keys and children, checking arity
    /// and the composition grammar of the new node.
    pub fn assemble(
        semantic: ClauseSemantic,
        keys: &[LetKey],
        mut children: Vec<Clause>,
    ) -> Result<Clause> {
        check_arity(semantic, keys.len(), children.len())?;
        let clause = match semantic {
            And => Clause::And(children),
            Or => Clause::Or(children),
            Xor => Clause::Xor(children),
            Not => match children.pop() {
                Some(child) => Clause::Not(Box::new(child)),
                None => return Err(QueryError::MalformedWhereClause("empty not".into())),
            },
            ConceptForComponent => Clause::ConceptForComponent(children),
            FullyQualifiedNameForConcept => {
                Clause::FullyQualifiedNameForConcept(ManifoldParams::from_keys(keys), children)
            }
            PreferredNameForConcept => {
                Clause::PreferredNameForConcept(ManifoldParams::from_keys(keys), children)
            }
            ConceptIs => Clause::ConceptIs(ConceptParams::from_keys(keys)),
            ConceptIsKindOf => Clause::ConceptIsKindOf(HierarchyParams::from_keys(keys)),
            ConceptIsChildOf => Clause::ConceptIsChildOf(HierarchyParams::from_keys(keys)),
            ConceptIsDescendentOf => {
                Clause::ConceptIsDescendentOf(HierarchyParams::from_keys(keys))
            }
            ComponentIsActive => Clause::ComponentIsActive(StampParams::from_keys(keys)),
            ComponentIsInactive => Clause::ComponentIsInactive(StampParams::from_keys(keys)),
            ComponentIsMemberOf => Clause::ComponentIsMemberOf(MembershipParams::from_keys(keys)),
            ComponentIsNotMemberOf => {
                Clause::ComponentIsNotMemberOf(MembershipParams::from_keys(keys))
            }
            ReferencedComponentIs => Clause::ReferencedComponentIs(ConceptParams::from_keys(keys)),
            ReferencedComponentIsKindOf => {
                Clause::ReferencedComponentIsKindOf(HierarchyParams::from_keys(keys))
            }
            ReferencedComponentIsNotKindOf => {
                Clause::ReferencedComponentIsNotKindOf(HierarchyParams::from_keys(keys))
            }
            ReferencedComponentIsMemberOf => {
                Clause::ReferencedComponentIsMemberOf(MembershipParams::from_keys(keys))
            }
            ReferencedComponentIsNotMemberOf => {
                Clause::ReferencedComponentIsNotMemberOf(MembershipParams::from_keys(keys))
            }
            DescriptionRegexMatch => Clause::DescriptionRegexMatch(TextParams::from_keys(keys)),
            DescriptionLuceneMatch => Clause::DescriptionLuceneMatch(TextParams::from_keys(keys)),
            SemanticContainsText => Clause::SemanticContainsText(TextParams::from_keys(keys)),
            SemanticRegexMatch => Clause::SemanticRegexMatch(TextParams::from_keys(keys)),
            SemanticLuceneMatch => Clause::SemanticLuceneMatch(TextParams::from_keys(keys)),
            ChangedBetweenVersions => {
                Clause::ChangedBetweenVersions(ChangeParams::from_keys(keys))
            }
            RelType => Clause::RelType(RelTypeParams::from_keys(keys)),
            RelRestriction => Clause::RelRestriction(RelRestrictionParams::from_keys(keys)),
            RelationshipIsCircular => {
                Clause::RelationshipIsCircular(ManifoldParams::from_keys(keys))
            }
            TaxonomyRelatedConcepts => {
                Clause::TaxonomyRelatedConcepts(HierarchyParams::from_keys(keys))
            }
        };
        clause.check_composition()?;
        Ok(clause)
    }

    /// Checks this node's children and sibling pairs against the allow-lists.
    fn check_composition(&self) -> Result<()> {
        let parent = self.semantic();
        let children = self.children();
        if let Some(allowed) = parent.allowed_children() {
            for child in children {
                if !allowed.contains(&child.semantic()) {
                    return Err(QueryError::DisallowedComposition {
                        parent,
                        child: child.semantic(),
                    });
                }
            }
        }
        for (i, a) in children.iter().enumerate() {
            for b in children.iter().skip(i + 1) {
                for (x, y) in [(a, b), (b, a)] {
                    if let Some(allowed) = x.semantic().allowed_siblings() {
                        if !allowed.contains(&y.semantic()) {
                            return Err(QueryError::DisallowedComposition {
                                parent,
                                child: y.semantic(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks arity and the composition grammar over the whole tree, so that
    /// a hand-built tree is held to the rules `assemble` enforces.
    pub fn validate(&self) -> Result<()> {
        check_arity(self.semantic(), self.let_keys().len(), self.children().len())?;
        self.check_composition()?;
        for child in self.children() {
            child.validate()?;
        }
        Ok(())
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(Clause::size).sum::<usize>()
    }

    // ------------- Builders -------------
    pub fn and(children: Vec<Clause>) -> Result<Clause> {
        Clause::assemble(And, &[], children)
    }
    pub fn or(children: Vec<Clause>) -> Result<Clause> {
        Clause::assemble(Or, &[], children)
    }
    pub fn xor(children: Vec<Clause>) -> Result<Clause> {
        Clause::assemble(Xor, &[], children)
    }
    pub fn not(child: Clause) -> Result<Clause> {
        Clause::assemble(Not, &[], vec![child])
    }
    pub fn concept_for_component(children: Vec<Clause>) -> Result<Clause> {
        Clause::assemble(ConceptForComponent, &[], children)
    }
    pub fn fully_qualified_name_for_concept(
        manifold: impl Into<LetKey>,
        children: Vec<Clause>,
    ) -> Result<Clause> {
        Clause::assemble(FullyQualifiedNameForConcept, &[manifold.into()], children)
    }
    pub fn preferred_name_for_concept(
        manifold: impl Into<LetKey>,
        children: Vec<Clause>,
    ) -> Result<Clause> {
        Clause::assemble(PreferredNameForConcept, &[manifold.into()], children)
    }
    pub fn concept_is(concept: impl Into<LetKey>) -> Clause {
        Clause::ConceptIs(ConceptParams::new(concept))
    }
    pub fn concept_is_kind_of(concept: impl Into<LetKey>, manifold: impl Into<LetKey>) -> Clause {
        Clause::ConceptIsKindOf(HierarchyParams::new(concept, manifold))
    }
    pub fn concept_is_child_of(concept: impl Into<LetKey>, manifold: impl Into<LetKey>) -> Clause {
        Clause::ConceptIsChildOf(HierarchyParams::new(concept, manifold))
    }
    pub fn concept_is_descendent_of(
        concept: impl Into<LetKey>,
        manifold: impl Into<LetKey>,
    ) -> Clause {
        Clause::ConceptIsDescendentOf(HierarchyParams::new(concept, manifold))
    }
    pub fn component_is_active(stamp: impl Into<LetKey>) -> Clause {
        Clause::ComponentIsActive(StampParams::new(stamp))
    }
    pub fn component_is_inactive(stamp: impl Into<LetKey>) -> Clause {
        Clause::ComponentIsInactive(StampParams::new(stamp))
    }
    pub fn component_is_member_of(assemblage: impl Into<LetKey>, stamp: impl Into<LetKey>) -> Clause {
        Clause::ComponentIsMemberOf(MembershipParams::new(assemblage, stamp))
    }
    pub fn component_is_not_member_of(
        assemblage: impl Into<LetKey>,
        stamp: impl Into<LetKey>,
    ) -> Clause {
        Clause::ComponentIsNotMemberOf(MembershipParams::new(assemblage, stamp))
    }
    pub fn referenced_component_is(concept: impl Into<LetKey>) -> Clause {
        Clause::ReferencedComponentIs(ConceptParams::new(concept))
    }
    pub fn referenced_component_is_kind_of(
        concept: impl Into<LetKey>,
        manifold: impl Into<LetKey>,
    ) -> Clause {
        Clause::ReferencedComponentIsKindOf(HierarchyParams::new(concept, manifold))
    }
    pub fn referenced_component_is_not_kind_of(
        concept: impl Into<LetKey>,
        manifold: impl Into<LetKey>,
    ) -> Clause {
        Clause::ReferencedComponentIsNotKindOf(HierarchyParams::new(concept, manifold))
    }
    pub fn referenced_component_is_member_of(
        assemblage: impl Into<LetKey>,
        stamp: impl Into<LetKey>,
    ) -> Clause {
        Clause::ReferencedComponentIsMemberOf(MembershipParams::new(assemblage, stamp))
    }
    pub fn referenced_component_is_not_member_of(
        assemblage: impl Into<LetKey>,
        stamp: impl Into<LetKey>,
    ) -> Clause {
        Clause::ReferencedComponentIsNotMemberOf(MembershipParams::new(assemblage, stamp))
    }
    pub fn description_regex_match(text: impl Into<LetKey>, stamp: impl Into<LetKey>) -> Clause {
        Clause::DescriptionRegexMatch(TextParams::new(text, stamp))
    }
    pub fn description_lucene_match(text: impl Into<LetKey>, stamp: impl Into<LetKey>) -> Clause {
        Clause::DescriptionLuceneMatch(TextParams::new(text, stamp))
    }
    pub fn semantic_contains_text(text: impl Into<LetKey>, stamp: impl Into<LetKey>) -> Clause {
        Clause::SemanticContainsText(TextParams::new(text, stamp))
    }
    pub fn semantic_regex_match(text: impl Into<LetKey>, stamp: impl Into<LetKey>) -> Clause {
        Clause::SemanticRegexMatch(TextParams::new(text, stamp))
    }
    pub fn semantic_lucene_match(text: impl Into<LetKey>, stamp: impl Into<LetKey>) -> Clause {
        Clause::SemanticLuceneMatch(TextParams::new(text, stamp))
    }
    pub fn changed_between_versions(before: impl Into<LetKey>, after: impl Into<LetKey>) -> Clause {
        Clause::ChangedBetweenVersions(ChangeParams::new(before, after))
    }
    pub fn rel_type(
        relationship_type: impl Into<LetKey>,
        manifold: impl Into<LetKey>,
        type_subsumption: impl Into<LetKey>,
    ) -> Clause {
        Clause::RelType(RelTypeParams::new(relationship_type, manifold, type_subsumption))
    }
    pub fn rel_restriction(
        relationship_type: impl Into<LetKey>,
        destination: impl Into<LetKey>,
        manifold: impl Into<LetKey>,
        type_subsumption: impl Into<LetKey>,
        destination_subsumption: impl Into<LetKey>,
    ) -> Clause {
        Clause::RelRestriction(RelRestrictionParams::new(
            relationship_type,
            destination,
            manifold,
            type_subsumption,
            destination_subsumption,
        ))
    }
    pub fn relationship_is_circular(manifold: impl Into<LetKey>) -> Clause {
        Clause::RelationshipIsCircular(ManifoldParams::new(manifold))
    }
    pub fn taxonomy_related_concepts(
        concept: impl Into<LetKey>,
        manifold: impl Into<LetKey>,
    ) -> Clause {
        Clause::TaxonomyRelatedConcepts(HierarchyParams::new(concept, manifold))
    }
}
