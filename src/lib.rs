//! kbquery – a query engine for versioned knowledge bases.
//!
//! A knowledge base here is a bitemporal semantic graph:
//! * A *concept* is a node in an is-a taxonomy.
//! * A *semantic* is a typed annotation referencing exactly one component
//!   (a concept or another semantic), grouped into named *assemblages*.
//! * Every concept and semantic is a [`construct::Chronology`] of
//!   [`construct::Version`]s, each stamped with status, time, author, module
//!   and path.
//!
//! Queries are trees of [`clause::Clause`] nodes. A query narrows the
//! candidate identifiers ("nids") of each assemblage it runs over down to
//! those satisfying the tree, reading versions through a
//! [`coordinate::StampFilter`] chosen by the caller.
//!
//! ## Modules
//! * [`nidset`] – the identifier bitset passed between clauses, and the
//!   per-assemblage result map.
//! * [`construct`], [`datatype`], [`coordinate`] – versions, payloads and
//!   the filters that pick the applicable version.
//! * [`service`] – contracts for the storage, taxonomy and text index
//!   collaborators, with an in-memory implementation in [`memory`].
//! * [`bindings`] – typed query parameters ("let bindings").
//! * [`clause`] – the clause tree and its composition grammar.
//! * [`where_clause`] – the persisted form of a clause tree: JSON, plus a
//!   compact text form parsed with the grammar in `where_clause.pest`.
//! * [`operators`] and [`evaluator`] – the operators and the phase evaluator
//!   that drives them.
//! * [`config`] – engine settings.
//!
//! ## Evaluation
//! Every clause takes part in one or more compute phases. The evaluator runs
//! PRE_ITERATION for the whole tree (cheap set algebra that prunes the
//! candidates), then ITERATION (per-candidate inspection of versions, text
//! and relationships, over what is left), then POST_ITERATION (combining
//! child results and re-mapping components to concepts or names).
//!
//! ## Quick Start
//! ```
//! use chrono::{TimeZone, Utc};
//! use kbquery::bindings::{LetBindings, LetValue};
//! use kbquery::clause::Clause;
//! use kbquery::config::EngineConfig;
//! use kbquery::construct::Stamp;
//! use kbquery::coordinate::StampFilter;
//! use kbquery::datatype::Status;
//! use kbquery::evaluator::evaluate;
//! use kbquery::memory::MemoryStore;
//! use kbquery::nidset::{AssemblageResults, NidSet};
//!
//! let time = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
//! let mut store = MemoryStore::new(100, 101, 102);
//! store.add_concept(1, "Animal", Stamp::new(Status::Active, time, 1, 1, 1));
//! store.add_concept(2, "Retired", Stamp::new(Status::Inactive, time, 1, 1, 1));
//! let services = store.into_services(&[]);
//!
//! let bindings = LetBindings::new().with(
//!     "now",
//!     LetValue::StampFilter(StampFilter::latest_on(1, Utc::now())),
//! );
//! let incoming = AssemblageResults::new().with(100, NidSet::of(&[1, 2]));
//! let results = evaluate(
//!     &Clause::component_is_active("now"),
//!     &bindings,
//!     incoming,
//!     &services,
//!     &EngineConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(results.get(100).unwrap().to_vec(), vec![1]);
//! ```

pub mod bindings;
pub mod clause;
pub mod config;
pub mod construct;
pub mod coordinate;
pub mod datatype;
pub mod error;
pub mod evaluator;
pub mod memory;
pub mod nidset;
pub mod operators;
pub mod service;
pub mod where_clause;

pub use error::{QueryError, Result};
pub use evaluator::{Query, SavedQuery, evaluate};
pub use where_clause::{WhereClause, describe, parse};

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber. `RUST_LOG` wins over `filter` when set.
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
