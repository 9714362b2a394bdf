use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::construct::ConceptRef;
use crate::coordinate::{ManifoldCoordinate, StampFilter};
use crate::error::{QueryError, Result};

// ------------- LetKey -------------
/// An opaque symbolic token naming one query parameter.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LetKey(String);

impl LetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LetKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LetKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

// ------------- LetValue -------------
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LetValue {
    Concept(ConceptRef),
    StampFilter(StampFilter),
    Manifold(ManifoldCoordinate),
    Boolean(bool),
    Text(String),
}

impl LetValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            LetValue::Concept(_) => "concept",
            LetValue::StampFilter(_) => "stamp filter",
            LetValue::Manifold(_) => "manifold coordinate",
            LetValue::Boolean(_) => "boolean",
            LetValue::Text(_) => "text",
        }
    }
}

// ------------- LetBindings -------------
/// Parameters supplied by the caller before evaluation begins. Clauses only
/// ever read from it.
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LetBindings {
    values: BTreeMap<LetKey, LetValue>,
}

impl LetBindings {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, key: impl Into<LetKey>, value: LetValue) -> Self {
        self.insert(key, value);
        self
    }
    pub fn insert(&mut self, key: impl Into<LetKey>, value: LetValue) -> Option<LetValue> {
        self.values.insert(key.into(), value)
    }
    pub fn get(&self, key: &LetKey) -> Result<&LetValue> {
        self.values
            .get(key)
            .ok_or_else(|| QueryError::MissingLetBinding(key.clone()))
    }
    pub fn keys(&self) -> impl Iterator<Item = &LetKey> {
        self.values.keys()
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn mismatch(key: &LetKey, expected: &'static str, found: &LetValue) -> QueryError {
        QueryError::LetBindingType {
            key: key.clone(),
            expected,
            found: found.type_name(),
        }
    }

    pub fn concept(&self, key: &LetKey) -> Result<&ConceptRef> {
        match self.get(key)? {
            LetValue::Concept(concept) => Ok(concept),
            other => Err(Self::mismatch(key, "concept", other)),
        }
    }
    /// A stamp filter, or the stamp filter embedded in a manifold coordinate.
    pub fn stamp_filter(&self, key: &LetKey) -> Result<&StampFilter> {
        match self.get(key)? {
            LetValue::StampFilter(filter) => Ok(filter),
            LetValue::Manifold(manifold) => Ok(&manifold.stamp),
            other => Err(Self::mismatch(key, "stamp filter", other)),
        }
    }
    pub fn manifold(&self, key: &LetKey) -> Result<&ManifoldCoordinate> {
        match self.get(key)? {
            LetValue::Manifold(manifold) => Ok(manifold),
            other => Err(Self::mismatch(key, "manifold coordinate", other)),
        }
    }
    pub fn boolean(&self, key: &LetKey) -> Result<bool> {
        match self.get(key)? {
            LetValue::Boolean(b) => Ok(*b),
            other => Err(Self::mismatch(key, "boolean", other)),
        }
    }
    pub fn text(&self, key: &LetKey) -> Result<&str> {
        match self.get(key)? {
            LetValue::Text(text) => Ok(text),
            other => Err(Self::mismatch(key, "text", other)),
        }
    }
}
