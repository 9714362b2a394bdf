use std::hint::black_box;

use chrono::{TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};

use kbquery::bindings::{LetBindings, LetValue};
use kbquery::clause::Clause;
use kbquery::config::EngineConfig;
use kbquery::construct::{ConceptRef, Stamp};
use kbquery::coordinate::{LanguageCoordinate, ManifoldCoordinate, StampFilter};
use kbquery::datatype::{Nid, Premise, Status};
use kbquery::evaluate;
use kbquery::memory::MemoryStore;
use kbquery::nidset::{AssemblageResults, NidSet};

const CONCEPTS: Nid = -1;
const RELATIONSHIPS: Nid = -2;
const IS_A: Nid = -3;

/// A binary taxonomy rooted at 1: the parent of n is n / 2.
fn taxonomy(size: Nid) -> MemoryStore {
    let stamp = Stamp::new(Status::Active, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), 1, 1, 1);
    let mut store = MemoryStore::new(CONCEPTS, RELATIONSHIPS, IS_A);
    for nid in 1..=size {
        store.add_concept(nid, &format!("concept {}", nid), stamp);
        if nid > 1 {
            store.add_is_a(size + nid, nid, nid / 2, Premise::Stated, stamp);
        }
    }
    store
}

fn bindings() -> LetBindings {
    let stamp = StampFilter::latest_on(1, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    let language = LanguageCoordinate {
        language: 0,
        description_assemblage: 0,
        fully_qualified_name_type: 0,
        regular_name_type: 0,
        dialect_assemblages: vec![],
        preferred_acceptability: 0,
    };
    LetBindings::new()
        .with("root", LetValue::Concept(ConceptRef::new(2, "concept 2")))
        .with("manifold", LetValue::Manifold(ManifoldCoordinate::new(stamp.clone(), Premise::Stated, language)))
        .with("now", LetValue::StampFilter(stamp))
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut r1 = NidSet::new();
    let mut r2 = NidSet::new();
    c.bench_function("intersect 0", |b| b.iter(|| black_box(r1.intersection(&r2))));
    r1.add(42);
    r2.add(42);
    c.bench_function("intersect 1", |b| b.iter(|| black_box(r1.intersection(&r2))));
    for n in -1000..1000 {
        r1.add(n);
        r2.add(n * 2);
    }
    c.bench_function("intersect 2k", |b| b.iter(|| black_box(r1.intersection(&r2))));
    for n in 100000..200000 {
        r1.add(n);
        r2.add(-n);
    }
    c.bench_function("intersect 100k", |b| b.iter(|| black_box(r1.intersection(&r2))));
    c.bench_function("union 100k", |b| b.iter(|| black_box(r1.union(&r2))));
    c.bench_function("difference 100k", |b| b.iter(|| black_box(r1.difference(&r2))));

    let services = taxonomy(10_000).into_services(&[]);
    let bindings = bindings();
    let candidates: NidSet = (1..=10_000).collect();
    let kind_of = Clause::concept_is_kind_of("root", "manifold");
    c.bench_function("kind-of 10k", |b| {
        b.iter(|| {
            let incoming = AssemblageResults::new().with(CONCEPTS, candidates.clone());
            evaluate(&kind_of, &bindings, incoming, &services, &EngineConfig::default())
        })
    });

    let changed = Clause::and(vec![
        Clause::concept_is_descendent_of("root", "manifold"),
        Clause::changed_between_versions("now", "now"),
    ])
    .unwrap();
    let parallel = EngineConfig {
        parallel_iteration_threshold: 1024,
        ..EngineConfig::default()
    };
    for (label, config) in [("serial", EngineConfig::default()), ("parallel", parallel)] {
        c.bench_function(&format!("iterate 10k {}", label), |b| {
            b.iter(|| {
                let incoming = AssemblageResults::new().with(CONCEPTS, candidates.clone());
                evaluate(&changed, &bindings, incoming, &services, &config)
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
