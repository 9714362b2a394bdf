use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Engine settings. Defaults are layered under an optional config file and
/// `KBQUERY_*` environment variables.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Passed as `max_results` to every text index search.
    pub max_text_results: usize,
    /// Index consulted by description lucene clauses.
    pub description_index: String,
    /// Index consulted by semantic lucene clauses.
    pub semantic_index: String,
    /// Iteration over at least this many candidates evaluates predicates in
    /// parallel. Zero keeps iteration on the calling thread.
    pub parallel_iteration_threshold: usize,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_results: 10_000,
            description_index: "descriptions".to_string(),
            semantic_index: "semantics".to_string(),
            parallel_iteration_threshold: 0,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = EngineConfig::default();
        let mut builder = Config::builder()
            .set_default("max_text_results", defaults.max_text_results as u64)?
            .set_default("description_index", defaults.description_index)?
            .set_default("semantic_index", defaults.semantic_index)?
            .set_default(
                "parallel_iteration_threshold",
                defaults.parallel_iteration_threshold as u64,
            )?
            .set_default("log_filter", defaults.log_filter)?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix("KBQUERY").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
