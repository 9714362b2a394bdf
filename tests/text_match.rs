mod common;

use common::*;
use kbquery::QueryError;
use kbquery::bindings::{LetBindings, LetValue};
use kbquery::clause::Clause;
use kbquery::datatype::Nid;
use kbquery::memory::MemoryTextIndex;
use kbquery::nidset::NidSet;
use kbquery::service::TextIndex;

fn with_text(text: &str) -> LetBindings {
    bindings().with("text", LetValue::Text(text.to_string()))
}

fn over(clause: &Clause, text: &str, assemblage: Nid) -> kbquery::Result<NidSet> {
    run_over(clause, &with_text(text), &services(), assemblage)
}

#[test]
fn contains_text_is_a_literal_match() {
    let contains = Clause::semantic_contains_text("text", "now");
    assert_eq!(over(&contains, "loyal", COMMENTS).unwrap().to_vec(), vec![401]);
    assert!(over(&contains, "Loyal", COMMENTS).unwrap().is_empty());
    // brackets mean nothing here
    assert!(over(&contains, "[a-z]", COMMENTS).unwrap().is_empty());

    // the Poodle comment is stated in 2022
    let contains = Clause::semantic_contains_text("text", "later");
    assert_eq!(over(&contains, "curly", COMMENTS).unwrap().to_vec(), vec![404]);
}

#[test]
fn regex_match_inspects_every_text_field() {
    let regex = Clause::semantic_regex_match("text", "now");
    assert_eq!(over(&regex, "^An ", COMMENTS).unwrap().to_vec(), vec![402]);
    assert_eq!(over(&regex, "Animalia", COMMENTS).unwrap().to_vec(), vec![403]);
    assert_eq!(over(&regex, "^kingdom$", COMMENTS).unwrap().to_vec(), vec![403]);
    assert_eq!(over(&regex, "(?i)^a", COMMENTS).unwrap().to_vec(), vec![401, 402, 403]);
}

#[test]
fn description_regex_match() {
    let regex = Clause::description_regex_match("text", "now");
    assert_eq!(
        over(&regex, r"\(organism\)$", DESCRIPTIONS).unwrap().to_vec(),
        vec![fqn(ANIMAL), fqn(DOG), fqn(CAT), fqn(POODLE)]
    );
    assert_eq!(over(&regex, "^Hound$", DESCRIPTIONS).unwrap().to_vec(), vec![HOUND]);
}

#[test]
fn concepts_are_not_text_targets() {
    let res = run_with(
        &Clause::semantic_contains_text("text", "now"),
        &with_text("o"),
        &services(),
        &[DOG, CAT],
    )
    .unwrap();
    assert!(res.is_empty());
}

#[test]
fn payloads_without_text_are_unsupported() {
    let err = over(&Clause::semantic_contains_text("text", "now"), "4", COUNTS).unwrap_err();
    assert!(
        matches!(err, QueryError::UnsupportedMatchTarget { nid: 411, ref shape } if shape == "integer"),
        "{}",
        err
    );
    let err = over(&Clause::semantic_regex_match("text", "now"), "4", COUNTS).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedMatchTarget { nid: 411, .. }));
}

#[test]
fn description_regex_rejects_other_shapes() {
    let err = over(&Clause::description_regex_match("text", "now"), "loyal", COMMENTS).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedMatchTarget { .. }), "{}", err);
}

#[test]
fn invalid_regex_fails_before_iteration() {
    let err = over(&Clause::semantic_regex_match("text", "now"), "(unclosed", COMMENTS).unwrap_err();
    assert!(matches!(err, QueryError::InvalidRegex(_)), "{}", err);
}

#[test]
fn lucene_match_uses_the_configured_indexes() {
    let lucene = Clause::description_lucene_match("text", "now");
    assert_eq!(
        over(&lucene, "dog", DESCRIPTIONS).unwrap().to_vec(),
        vec![fqn(DOG), preferred_name(DOG)]
    );
    assert_eq!(
        over(&lucene, "\"dog (organism)\"", DESCRIPTIONS).unwrap().to_vec(),
        vec![fqn(DOG)]
    );
    // description hits never come back for other assemblages
    assert!(over(&lucene, "dog", COMMENTS).unwrap().is_empty());

    let lucene = Clause::semantic_lucene_match("text", "now");
    assert_eq!(over(&lucene, "animalia", COMMENTS).unwrap().to_vec(), vec![403]);
    assert_eq!(over(&lucene, "a companion", COMMENTS).unwrap().to_vec(), vec![401]);
}

#[test]
fn missing_index_is_a_missing_collaborator() {
    let services = store().into_services(&["semantics"]);
    let err = run_over(
        &Clause::description_lucene_match("text", "now"),
        &with_text("dog"),
        &services,
        DESCRIPTIONS,
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::MissingCollaborator(_)), "{}", err);
}

#[test]
fn memory_index_phrases_and_tokens() {
    let index = MemoryTextIndex::build("comments", &store());
    assert_eq!(index.name(), "comments");
    let nids = |query: &str| -> Vec<Nid> {
        let mut nids: Vec<Nid> = index.search(query, 100).into_iter().map(|(nid, _)| nid).collect();
        nids.sort();
        nids
    };
    assert_eq!(nids("hunter independent"), vec![402]);
    assert_eq!(nids("\"independent hunter\""), vec![402]);
    assert!(nids("\"hunter independent\"").is_empty());
    assert!(nids("   ").is_empty());
    assert_eq!(nids("CURLY"), vec![404]);
    assert_eq!(index.search("a", 1).len(), 1);
}
