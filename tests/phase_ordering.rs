mod common;

use std::sync::{Arc, Mutex};

use common::*;
use kbquery::clause::{Clause, ClauseSemantic, ComputePhase, ComputePhases};
use kbquery::construct::Chronology;
use kbquery::datatype::Nid;
use kbquery::memory::MemoryStore;
use kbquery::nidset::NidSet;
use kbquery::service::{ChronologyService, Services};

/// Forwards to the store, remembering every nid asked for.
struct Recording {
    inner: Arc<MemoryStore>,
    seen: Mutex<Vec<Nid>>,
}

impl ChronologyService for Recording {
    fn chronology(&self, nid: Nid) -> Option<Arc<Chronology>> {
        self.seen.lock().unwrap().push(nid);
        self.inner.chronology(nid)
    }
}

fn recording_services() -> (Arc<Recording>, Services) {
    let store = shared_store();
    let recording = Arc::new(Recording {
        inner: store.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let services = Services::new(recording.clone(), store.clone(), store);
    (recording, services)
}

#[test]
fn iteration_only_visits_what_pre_iteration_left() {
    let (recording, services) = recording_services();
    let narrowing = Clause::or(vec![
        Clause::concept_is("animal"),
        Clause::concept_is("dog"),
        Clause::concept_is("cat"),
    ])
    .unwrap();
    assert_eq!(
        narrowing.compute_phases(),
        ComputePhases::PRE_AND_POST_ITERATION
    );
    let changed = Clause::changed_between_versions("now", "later");
    assert!(changed.compute_phases().contains(ComputePhase::Iteration));
    assert!(!changed.compute_phases().contains(ComputePhase::PreIteration));

    // the iterating clause comes first in document order
    let clause = Clause::and(vec![changed, narrowing]).unwrap();
    let res = run_with(&clause, &bindings(), &services, &[ANIMAL, DOG, CAT, POODLE, ROCK]).unwrap();
    assert_eq!(res.to_vec(), vec![CAT]);

    let seen: NidSet = recording.seen.lock().unwrap().iter().copied().collect();
    assert!(!seen.is_empty());
    assert!(
        seen.is_subset(&NidSet::of(&[ANIMAL, DOG, CAT])),
        "iteration examined {}",
        seen
    );
}

#[test]
fn negation_cannot_narrow_before_iteration() {
    let (recording, services) = recording_services();
    let clause = Clause::and(vec![
        Clause::not(Clause::concept_is("dog")).unwrap(),
        Clause::changed_between_versions("now", "later"),
    ])
    .unwrap();
    let res = run_with(&clause, &bindings(), &services, &[ANIMAL, DOG, CAT]).unwrap();
    assert_eq!(res.to_vec(), vec![CAT]);
    let seen: NidSet = recording.seen.lock().unwrap().iter().copied().collect();
    assert_eq!(seen, NidSet::of(&[ANIMAL, DOG, CAT]));
}

#[test]
fn pre_iteration_failures_stop_before_iteration() {
    let (recording, services) = recording_services();
    let clause = Clause::and(vec![
        Clause::changed_between_versions("now", "later"),
        Clause::relationship_is_circular("manifold"),
    ])
    .unwrap();
    let err = run_with(&clause, &bindings(), &services, &[ANIMAL, DOG, CAT]).unwrap_err();
    assert!(matches!(
        err,
        kbquery::QueryError::Unimplemented {
            semantic: ClauseSemantic::RelationshipIsCircular
        }
    ));
    assert!(recording.seen.lock().unwrap().is_empty());
}

#[test]
fn phases_are_declared_per_operator() {
    use ClauseSemantic::*;
    for semantic in ClauseSemantic::ALL {
        let phases = semantic.compute_phases();
        let any = ComputePhase::ORDER.iter().any(|p| phases.contains(*p));
        assert!(any, "{} takes part in no phase", semantic);
    }
    assert_eq!(And.compute_phases(), ComputePhases::PRE_AND_POST_ITERATION);
    assert_eq!(ConceptForComponent.compute_phases(), ComputePhases::POST_ITERATION);
    assert_eq!(ComponentIsMemberOf.compute_phases(), ComputePhases::PRE_ITERATION);
    assert_eq!(SemanticContainsText.compute_phases(), ComputePhases::ITERATION);
    assert_eq!(RelRestriction.compute_phases(), ComputePhases::PRE_ITERATION_AND_ITERATION);
}
