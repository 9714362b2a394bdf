#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use kbquery::bindings::{LetBindings, LetValue};
use kbquery::clause::Clause;
use kbquery::config::EngineConfig;
use kbquery::construct::{ConceptRef, Stamp};
use kbquery::coordinate::{LanguageCoordinate, ManifoldCoordinate, StampFilter};
use kbquery::datatype::{Nid, Payload, Premise, Status};
use kbquery::evaluate;
use kbquery::memory::MemoryStore;
use kbquery::nidset::{AssemblageResults, NidSet};
use kbquery::service::Services;

// concepts
pub const ANIMAL: Nid = 1;
pub const DOG: Nid = 2;
pub const CAT: Nid = 3;
pub const POODLE: Nid = 4;
pub const ROCK: Nid = 5;
pub const PLACE: Nid = 6;
pub const HOUSE: Nid = 7;
pub const EXTINCT: Nid = 8;

// assemblages and metadata
pub const CONCEPTS: Nid = 10;
pub const RELATIONSHIPS: Nid = 11;
pub const IS_A: Nid = 12;
pub const HAS_HABITAT: Nid = 13;
pub const DESCRIPTIONS: Nid = 20;
pub const US_DIALECT: Nid = 21;
pub const PREFERRED: Nid = 22;
pub const ACCEPTABLE: Nid = 23;
pub const FQN_TYPE: Nid = 24;
pub const REGULAR_TYPE: Nid = 25;
pub const ENGLISH: Nid = 26;
pub const CASE_INSENSITIVE: Nid = 27;
pub const PETS: Nid = 30;
pub const RETIRED: Nid = 31;
pub const COMMENTS: Nid = 40;
pub const COUNTS: Nid = 41;

pub const PATH: Nid = 1;
pub const AUTHOR: Nid = 1;
pub const MODULE: Nid = 1;

pub const HOUND: Nid = 1023;

pub fn at(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
}

pub fn stamp(status: Status, year: i32) -> Stamp {
    Stamp::new(status, at(year), AUTHOR, MODULE, PATH)
}

fn active() -> Stamp {
    stamp(Status::Active, 2020)
}

pub fn fqn(concept: Nid) -> Nid {
    1000 + concept * 10 + 1
}

pub fn preferred_name(concept: Nid) -> Nid {
    1000 + concept * 10 + 2
}

fn add_description(store: &mut MemoryStore, nid: Nid, concept: Nid, text: &str, kind: Nid) {
    store.add_semantic(
        nid,
        concept,
        DESCRIPTIONS,
        active(),
        Payload::Description {
            text: text.to_string(),
            case_significance: CASE_INSENSITIVE,
            description_type: kind,
            language: ENGLISH,
        },
    );
}

fn add_acceptability(store: &mut MemoryStore, description: Nid, acceptability: Nid) {
    store.add_semantic(
        description + 1000,
        description,
        US_DIALECT,
        active(),
        Payload::Component { nid: acceptability },
    );
}

/// Animal (1) with children Dog (2) and Cat (3), grandchild Poodle (4, under
/// Dog), the unrelated Rock (5), Place (6) with child House (7), and the
/// inactive Extinct (8).
///
/// Cat becomes inactive in 2022. Everything else is stated in 2020.
pub fn store() -> MemoryStore {
    let mut store = MemoryStore::new(CONCEPTS, RELATIONSHIPS, IS_A);
    for (nid, name) in [
        (ANIMAL, "Animal"),
        (DOG, "Dog"),
        (CAT, "Cat"),
        (POODLE, "Poodle"),
        (ROCK, "Rock"),
        (PLACE, "Place"),
        (HOUSE, "House"),
    ] {
        store.add_concept(nid, name, active());
    }
    store.add_concept(EXTINCT, "Extinct", stamp(Status::Inactive, 2020));
    store.add_concept_version(CAT, stamp(Status::Inactive, 2022));

    store.add_is_a(201, DOG, ANIMAL, Premise::Stated, active());
    store.add_is_a(202, CAT, ANIMAL, Premise::Stated, active());
    store.add_is_a(203, POODLE, DOG, Premise::Stated, active());
    store.add_is_a(204, HOUSE, PLACE, Premise::Stated, active());
    store.add_relationship(205, DOG, HAS_HABITAT, HOUSE, Premise::Stated, active());
    store.add_relationship(206, CAT, HAS_HABITAT, PLACE, Premise::Stated, active());

    for (concept, name) in [(ANIMAL, "Animal"), (DOG, "Dog"), (CAT, "Cat"), (POODLE, "Poodle")] {
        add_description(&mut store, fqn(concept), concept, &format!("{} (organism)", name), FQN_TYPE);
        add_description(&mut store, preferred_name(concept), concept, name, REGULAR_TYPE);
        add_acceptability(&mut store, fqn(concept), PREFERRED);
        add_acceptability(&mut store, preferred_name(concept), PREFERRED);
    }
    add_description(&mut store, HOUND, DOG, "Hound", REGULAR_TYPE);
    add_acceptability(&mut store, HOUND, ACCEPTABLE);

    store.add_semantic(301, ANIMAL, PETS, active(), Payload::Member);
    store.add_semantic(302, DOG, PETS, active(), Payload::Member);
    store.add_semantic(303, CAT, PETS, active(), Payload::Member);
    store.add_semantic(314, POODLE, RETIRED, stamp(Status::Inactive, 2020), Payload::Member);

    store.add_semantic(
        401,
        DOG,
        COMMENTS,
        active(),
        Payload::Text {
            text: "A loyal companion".to_string(),
        },
    );
    store.add_semantic(
        402,
        CAT,
        COMMENTS,
        active(),
        Payload::Text {
            text: "An independent hunter".to_string(),
        },
    );
    store.add_semantic(
        403,
        ANIMAL,
        COMMENTS,
        active(),
        Payload::TextText {
            first: "kingdom".to_string(),
            second: "Animalia".to_string(),
        },
    );
    store.add_semantic(
        404,
        POODLE,
        COMMENTS,
        stamp(Status::Active, 2022),
        Payload::Text {
            text: "A curly coat".to_string(),
        },
    );
    store.add_semantic(411, DOG, COUNTS, active(), Payload::Integer { value: 4 });
    store
}

pub fn services() -> Services {
    store().into_services(&["descriptions", "semantics"])
}

pub fn language() -> LanguageCoordinate {
    LanguageCoordinate {
        language: ENGLISH,
        description_assemblage: DESCRIPTIONS,
        fully_qualified_name_type: FQN_TYPE,
        regular_name_type: REGULAR_TYPE,
        dialect_assemblages: vec![US_DIALECT],
        preferred_acceptability: PREFERRED,
    }
}

/// Every status visible, as of 2021.
pub fn now() -> StampFilter {
    StampFilter::latest_on(PATH, at(2021))
}

pub fn manifold() -> ManifoldCoordinate {
    ManifoldCoordinate::new(now(), Premise::Stated, language())
}

pub fn bindings() -> LetBindings {
    let concept = |nid: Nid, name: &str| LetValue::Concept(ConceptRef::new(nid, name));
    LetBindings::new()
        .with("animal", concept(ANIMAL, "Animal"))
        .with("dog", concept(DOG, "Dog"))
        .with("cat", concept(CAT, "Cat"))
        .with("poodle", concept(POODLE, "Poodle"))
        .with("place", concept(PLACE, "Place"))
        .with("extinct", concept(EXTINCT, "Extinct"))
        .with("is-a", concept(IS_A, "Is a"))
        .with("has-habitat", concept(HAS_HABITAT, "Has habitat"))
        .with("pets", concept(PETS, "Pets"))
        .with("retired", concept(RETIRED, "Retired"))
        .with("manifold", LetValue::Manifold(manifold()))
        .with("now", LetValue::StampFilter(now()))
        .with("later", LetValue::StampFilter(StampFilter::latest_on(PATH, at(2023))))
        .with("yes", LetValue::Boolean(true))
        .with("no", LetValue::Boolean(false))
}

pub fn concept_ref(nid: Nid, name: &str) -> ConceptRef {
    ConceptRef::new(nid, name)
}

/// Evaluates `clause` over a single assemblage holding `candidates`.
pub fn run_with(
    clause: &Clause,
    bindings: &LetBindings,
    services: &Services,
    candidates: &[Nid],
) -> kbquery::Result<NidSet> {
    let incoming = AssemblageResults::new().with(CONCEPTS, NidSet::of(candidates));
    let results = evaluate(clause, bindings, incoming, services, &EngineConfig::default())?;
    Ok(results.get(CONCEPTS).cloned().unwrap_or_default())
}

pub fn run(clause: &Clause, candidates: &[Nid]) -> kbquery::Result<NidSet> {
    run_with(clause, &bindings(), &services(), candidates)
}

/// Evaluates `clause` over every member of `assemblage`.
pub fn run_over(clause: &Clause, bindings: &LetBindings, services: &Services, assemblage: Nid) -> kbquery::Result<NidSet> {
    let incoming =
        AssemblageResults::new().with(assemblage, services.assemblages.assemblage_members(assemblage));
    let results = evaluate(clause, bindings, incoming, services, &EngineConfig::default())?;
    Ok(results.get(assemblage).cloned().unwrap_or_default())
}

pub fn shared_store() -> Arc<MemoryStore> {
    Arc::new(store())
}
