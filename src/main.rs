//! Evaluates a saved query against a graph export.
//!
//! ```text
//! kbquery <graph.json> <query.json> [config]
//! ```
//!
//! The per-assemblage results are printed to stdout as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use kbquery::config::EngineConfig;
use kbquery::memory::MemoryStore;
use kbquery::{QueryError, Result, SavedQuery, init_tracing};

/// Evaluate a saved query against a knowledge base graph export
#[derive(Parser, Debug)]
#[command(name = "kbquery")]
#[command(version)]
#[command(about = "Evaluate a saved query against a knowledge base graph export")]
struct Args {
    /// Graph export in JSON
    graph: PathBuf,
    /// Saved query in JSON
    query: PathBuf,
    /// Engine config file, layered over the defaults
    config: Option<PathBuf>,
}

fn run(graph: &Path, query_path: &Path, config: Option<&Path>) -> Result<()> {
    let config = EngineConfig::load(config)?;
    init_tracing(&config.log_filter);

    let store = MemoryStore::from_json(&fs::read_to_string(graph)?)?;
    info!(path = %graph.display(), chronologies = store.len(), "graph loaded");
    let services = store.into_services(&[
        config.description_index.as_str(),
        config.semantic_index.as_str(),
    ]);

    let saved = SavedQuery::from_json(&fs::read_to_string(query_path)?)?;
    let query = saved.to_query()?;
    info!(query = query.name(), where_clause = %saved.where_clause, "query loaded");

    let results = query.compute(&services, &config)?;
    info!(distinct = results.all_candidates().len(), "results ready");
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn main() -> ExitCode {
    // usage errors exit with 2 from inside clap
    let args = Args::parse();
    match run(&args.graph, &args.query, args.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "evaluation failed");
            eprintln!("{}", e);
            match e {
                QueryError::Io(_) | QueryError::Config(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn config_is_optional() {
        let args = Args::try_parse_from(["kbquery", "graph.json", "query.json"]).unwrap();
        assert_eq!(args.graph, PathBuf::from("graph.json"));
        assert_eq!(args.query, PathBuf::from("query.json"));
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["kbquery", "g.json", "q.json", "engine.toml"]).unwrap();
        assert_eq!(args.config.as_deref(), Some(Path::new("engine.toml")));
    }

    #[test]
    fn missing_and_extra_arguments_are_usage_errors() {
        for argv in [
            vec!["kbquery"],
            vec!["kbquery", "graph.json"],
            vec!["kbquery", "g.json", "q.json", "c.toml", "extra"],
        ] {
            let err = Args::try_parse_from(argv).unwrap_err();
            assert_eq!(err.exit_code(), 2);
        }
    }
}
