mod common;

use common::*;
use kbquery::clause::Clause;
use kbquery::datatype::Nid;
use kbquery::nidset::NidSet;
use kbquery::service::Services;

// 99 has no chronology at all
const CONCEPT_CANDIDATES: &[Nid] = &[ANIMAL, DOG, CAT, POODLE, ROCK, PLACE, HOUSE, EXTINCT, 99];
const SEMANTIC_CANDIDATES: &[Nid] = &[301, 302, 303, 314, 401, 402, 403, 404, 1021, 1023, 99];

fn pairs() -> Vec<(Clause, Clause)> {
    vec![
        (
            Clause::component_is_active("now"),
            Clause::component_is_inactive("now"),
        ),
        (
            Clause::component_is_active("later"),
            Clause::component_is_inactive("later"),
        ),
        (
            Clause::component_is_member_of("pets", "now"),
            Clause::component_is_not_member_of("pets", "now"),
        ),
        (
            Clause::component_is_member_of("retired", "now"),
            Clause::component_is_not_member_of("retired", "now"),
        ),
        (
            Clause::referenced_component_is_kind_of("dog", "manifold"),
            Clause::referenced_component_is_not_kind_of("dog", "manifold"),
        ),
        (
            Clause::referenced_component_is_member_of("pets", "now"),
            Clause::referenced_component_is_not_member_of("pets", "now"),
        ),
    ]
}

fn check(services: &Services, candidates: &[Nid]) {
    let bindings = bindings();
    for (positive, negative) in pairs() {
        let yes = run_with(&positive, &bindings, services, candidates).expect("query ok");
        let no = run_with(&negative, &bindings, services, candidates).expect("query ok");
        assert!(
            yes.intersection(&no).is_empty(),
            "{} and {} overlap on {}",
            positive,
            negative,
            yes.intersection(&no)
        );
        for nid in candidates {
            let alone_yes = run_with(&positive, &bindings, services, &[*nid]).unwrap();
            let alone_no = run_with(&negative, &bindings, services, &[*nid]).unwrap();
            assert_eq!(alone_yes.contains(*nid), yes.contains(*nid));
            assert_eq!(alone_no.contains(*nid), no.contains(*nid));
            if yes.contains(*nid) || no.contains(*nid) {
                assert_ne!(yes.contains(*nid), no.contains(*nid), "{} under {}", nid, positive);
            }
        }
        assert!(!yes.contains(99) && !no.contains(99), "absent chronology passed {}", positive);
    }
}

#[test]
fn paired_operators_are_complements() {
    let services = services();
    check(&services, CONCEPT_CANDIDATES);
    check(&services, SEMANTIC_CANDIDATES);
}

#[test]
fn activity_partitions_every_resolvable_candidate() {
    let services = services();
    let bindings = bindings();
    let active = run_with(&Clause::component_is_active("now"), &bindings, &services, CONCEPT_CANDIDATES).unwrap();
    let inactive =
        run_with(&Clause::component_is_inactive("now"), &bindings, &services, CONCEPT_CANDIDATES).unwrap();
    assert_eq!(inactive.to_vec(), vec![EXTINCT]);
    let mut all = active.union(&inactive);
    all.add(99);
    assert_eq!(all, NidSet::of(CONCEPT_CANDIDATES));

    // Cat is retired by 2022
    let inactive =
        run_with(&Clause::component_is_inactive("later"), &bindings, &services, CONCEPT_CANDIDATES).unwrap();
    assert_eq!(inactive.to_vec(), vec![CAT, EXTINCT]);
}

#[test]
fn inactive_membership_is_no_membership() {
    let res = run(&Clause::component_is_member_of("retired", "now"), &[POODLE]).unwrap();
    assert!(res.is_empty());
    let res = run(&Clause::component_is_not_member_of("retired", "now"), &[POODLE]).unwrap();
    assert_eq!(res.to_vec(), vec![POODLE]);
}

#[test]
fn double_negation_restores_the_incoming_restriction() {
    let inner = Clause::concept_is_kind_of("dog", "manifold");
    let twice = Clause::not(Clause::not(inner.clone()).unwrap()).unwrap();
    let candidates = &[ANIMAL, DOG, POODLE, ROCK];
    assert_eq!(run(&twice, candidates).unwrap(), run(&inner, candidates).unwrap());

    // a seed outside the incoming set does not survive two negations
    let seed = Clause::concept_is("cat");
    let twice = Clause::not(Clause::not(seed).unwrap()).unwrap();
    assert!(run(&twice, candidates).unwrap().is_empty());
}

#[test]
fn referenced_membership_follows_the_component() {
    let services = services();
    let res = run_over(
        &Clause::referenced_component_is_member_of("pets", "now"),
        &bindings(),
        &services,
        COMMENTS,
    )
    .unwrap();
    // Dog, Cat and Animal are pets; 404 is not visible yet
    assert_eq!(res.to_vec(), vec![401, 402, 403]);
    let res = run_over(&Clause::referenced_component_is("cat"), &bindings(), &services, COMMENTS).unwrap();
    assert_eq!(res.to_vec(), vec![402]);
}
