//! Where clauses: the persisted and transmitted form of a clause tree.
//!
//! A [`WhereClause`] mirrors the clause tree node for node: the operator tag,
//! the let keys in the order the operator consumes them, and the described
//! children. Two renditions are supported:
//! * JSON, through serde:
//!   `{"semantic": "not", "let_keys": [], "children": [...]}`
//! * a compact text form parsed with the grammar in `where_clause.pest`:
//!   `and(concept-is-kind-of($animal, $manifold), not(component-is-inactive($stamp)))`
//!
//! `describe(parse(describe(c))) == describe(c)` for every clause `c`.

use std::fmt;
use std::str::FromStr;

use pest::Parser;
use pest::iterators::Pair;
use serde::{Deserialize, Serialize};

use crate::bindings::LetKey;
use crate::clause::{Clause, ClauseSemantic};
use crate::error::{QueryError, Result};

#[derive(pest_derive::Parser)]
#[grammar = "where_clause.pest"]
struct WhereClauseParser;

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawWhereClause")]
pub struct WhereClause {
    pub semantic: ClauseSemantic,
    pub let_keys: Vec<LetKey>,
    pub children: Vec<WhereClause>,
}

// Deserialization goes through this so that unknown tags surface as
// `UnknownClauseTag` rather than as a generic serde failure.
#[derive(Deserialize)]
struct RawWhereClause {
    semantic: String,
    #[serde(default)]
    let_keys: Vec<LetKey>,
    #[serde(default)]
    children: Vec<RawWhereClause>,
}

impl TryFrom<RawWhereClause> for WhereClause {
    type Error = QueryError;
    fn try_from(raw: RawWhereClause) -> Result<Self> {
        Ok(WhereClause {
            semantic: ClauseSemantic::from_tag(&raw.semantic)?,
            let_keys: raw.let_keys,
            children: raw
                .children
                .into_iter()
                .map(WhereClause::try_from)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

impl WhereClause {
    pub fn new(semantic: ClauseSemantic, let_keys: Vec<LetKey>, children: Vec<WhereClause>) -> Self {
        Self {
            semantic,
            let_keys,
            children,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawWhereClause = serde_json::from_str(json)?;
        WhereClause::try_from(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawWhereClause = serde_json::from_value(value)?;
        WhereClause::try_from(raw)
    }

    /// Parses the compact text form.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut pairs = WhereClauseParser::parse(Rule::where_clause, text)?;
        match pairs.next() {
            Some(pair) if pair.as_rule() == Rule::clause => build_where_clause(pair),
            _ => Err(QueryError::MalformedWhereClause(
                "expected a clause".to_string(),
            )),
        }
    }

    /// Hex digest of the canonical JSON form. Identical trees always share a
    /// fingerprint.
    pub fn fingerprint(&self) -> Result<String> {
        let json = self.to_json()?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Number of nodes in the described tree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(WhereClause::size).sum::<usize>()
    }
}

fn build_where_clause(pair: Pair<Rule>) -> Result<WhereClause> {
    let mut inner = pair.into_inner();
    let semantic = match inner.next() {
        Some(tag) => ClauseSemantic::from_tag(tag.as_str())?,
        None => {
            return Err(QueryError::MalformedWhereClause(
                "clause without a tag".to_string(),
            ));
        }
    };
    let mut let_keys = Vec::new();
    let mut children = Vec::new();
    for argument in inner {
        match argument.as_rule() {
            Rule::let_key => {
                if !children.is_empty() {
                    return Err(QueryError::MalformedWhereClause(format!(
                        "let key {} follows a child clause in {}",
                        argument.as_str(),
                        semantic
                    )));
                }
                let_keys.push(build_let_key(argument)?);
            }
            Rule::clause => children.push(build_where_clause(argument)?),
            _ => (),
        }
    }
    Ok(WhereClause::new(semantic, let_keys, children))
}

fn build_let_key(pair: Pair<Rule>) -> Result<LetKey> {
    match pair.into_inner().next() {
        Some(key) if key.as_rule() == Rule::quoted_key => {
            let mut unescaped = String::with_capacity(key.as_str().len());
            let mut chars = key.as_str().chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => unescaped.extend(chars.next()),
                    _ => unescaped.push(c),
                }
            }
            Ok(LetKey::new(unescaped))
        }
        Some(key) => Ok(LetKey::new(key.as_str())),
        None => Err(QueryError::MalformedWhereClause(
            "let key without a name".to_string(),
        )),
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.semantic)?;
        let mut first = true;
        for key in &self.let_keys {
            if !first {
                write!(f, ", ")?;
            }
            if is_bare_key(key.as_str()) {
                write!(f, "${}", key)?;
            } else {
                let escaped = key.as_str().replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "$\"{}\"", escaped)?;
            }
            first = false;
        }
        for child in &self.children {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", child)?;
            first = false;
        }
        write!(f, ")")
    }
}

impl FromStr for WhereClause {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self> {
        WhereClause::from_text(s)
    }
}

// ------------- describe / parse -------------
/// Produces the where clause describing `clause`.
pub fn describe(clause: &Clause) -> WhereClause {
    WhereClause::new(
        clause.semantic(),
        clause.let_keys(),
        clause.children().iter().map(describe).collect(),
    )
}

/// Rebuilds a clause tree, rejecting unknown arities and disallowed
/// compositions before any evaluation can begin.
pub fn parse(where_clause: &WhereClause) -> Result<Clause> {
    let children = where_clause
        .children
        .iter()
        .map(parse)
        .collect::<Result<Vec<_>>>()?;
    Clause::assemble(where_clause.semantic, &where_clause.let_keys, children)
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", describe(self))
    }
}

impl FromStr for Clause {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self> {
        parse(&WhereClause::from_text(s)?)
    }
}
