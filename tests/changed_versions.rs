mod common;

use common::*;
use kbquery::clause::Clause;
use kbquery::datatype::{Payload, Status};

fn changed() -> Clause {
    Clause::changed_between_versions("now", "later")
}

#[test]
fn status_changes_are_changes() {
    let res = run(&changed(), &[ANIMAL, DOG, CAT, POODLE, ROCK]).unwrap();
    assert_eq!(res.to_vec(), vec![CAT]);
}

#[test]
fn appearing_components_are_changes() {
    let res = run_over(&changed(), &bindings(), &services(), COMMENTS).unwrap();
    assert_eq!(res.to_vec(), vec![404]);
}

#[test]
fn nothing_on_either_side_is_no_change() {
    assert!(run(&changed(), &[99]).unwrap().is_empty());
    // same filter on both sides
    let res = run(&Clause::changed_between_versions("later", "later"), &[CAT, 404]).unwrap();
    assert!(res.is_empty());
}

#[test]
fn restating_the_same_content_is_no_change() {
    let mut store = store();
    store.add_concept_version(ROCK, stamp(Status::Active, 2022));
    store.add_semantic(
        401,
        DOG,
        COMMENTS,
        stamp(Status::Active, 2022),
        Payload::Text {
            text: "A loyal friend".to_string(),
        },
    );
    let services = store.into_services(&[]);
    let res = run_with(&changed(), &bindings(), &services, &[ROCK, CAT]).unwrap();
    assert_eq!(res.to_vec(), vec![CAT]);
    let res = run_over(&changed(), &bindings(), &services, COMMENTS).unwrap();
    assert_eq!(res.to_vec(), vec![401, 404]);
}
