use thiserror::Error;

use crate::bindings::LetKey;
use crate::clause::ClauseSemantic;
use crate::datatype::Nid;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Unimplemented operator: {semantic}")]
    Unimplemented { semantic: ClauseSemantic },
    #[error("Illegal state: {0}")]
    IllegalState(String),
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),
    #[error("Unsupported match target: nid {nid} has shape {shape}")]
    UnsupportedMatchTarget { nid: Nid, shape: String },
    #[error("Unknown clause tag: {0}")]
    UnknownClauseTag(String),
    #[error("Disallowed composition: {child} may not appear under {parent}")]
    DisallowedComposition {
        parent: ClauseSemantic,
        child: ClauseSemantic,
    },
    #[error("Malformed where clause: {0}")]
    MalformedWhereClause(String),
    #[error("Missing let binding: {0}")]
    MissingLetBinding(LetKey),
    #[error("Let binding {key} holds {found}, expected {expected}")]
    LetBindingType {
        key: LetKey,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(String),
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        line: Option<usize>,
        col: Option<usize>,
    },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;

// Helper conversions
impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
impl From<config::ConfigError> for QueryError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
impl From<regex::Error> for QueryError {
    fn from(e: regex::Error) -> Self {
        Self::InvalidRegex(e.to_string())
    }
}
impl From<std::io::Error> for QueryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
impl From<pest::error::Error<crate::where_clause::Rule>> for QueryError {
    fn from(e: pest::error::Error<crate::where_clause::Rule>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (Some(l), Some(c)),
            pest::error::LineColLocation::Span((l, c), _) => (Some(l), Some(c)),
        };
        Self::Parse {
            message: e.variant.message().to_string(),
            line,
            col,
        }
    }
}
