// used for the bitemporal stamp times
use chrono::{DateTime, Utc};

// used to print out readable forms of a construct
use std::fmt;

use serde::{Deserialize, Serialize};

// our own stuff that we need
use crate::datatype::{Nid, Payload, Shape, Status};

// ------------- Stamp -------------
/// Status, time, author, module and path of one version.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Stamp {
    status: Status,
    time: DateTime<Utc>,
    author: Nid,
    module: Nid,
    path: Nid,
}

impl Stamp {
    pub fn new(status: Status, time: DateTime<Utc>, author: Nid, module: Nid, path: Nid) -> Self {
        Self {
            status,
            time,
            author,
            module,
            path,
        }
    }
    // Stamps are immutable once created, so only getters are exposed.
    pub fn status(&self) -> Status {
        self.status
    }
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }
    pub fn author(&self) -> Nid {
        self.author
    }
    pub fn module(&self) -> Nid {
        self.module
    }
    pub fn path(&self) -> Nid {
        self.path
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{} {} a:{} m:{} p:{}>",
            self.status,
            self.time.format("%Y-%m-%dT%H:%M:%SZ"),
            self.author,
            self.module,
            self.path
        )
    }
}

// ------------- Version -------------
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Version {
    stamp: Stamp,
    payload: Payload,
}

impl Version {
    pub fn new(stamp: Stamp, payload: Payload) -> Self {
        Self { stamp, payload }
    }
    pub fn stamp(&self) -> &Stamp {
        &self.stamp
    }
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
    pub fn shape(&self) -> Shape {
        self.payload.shape()
    }
    pub fn is_active(&self) -> bool {
        self.stamp.status().is_active()
    }
    /// Content equality: same status and same payload. The stamp's time,
    /// author, module and path do not take part.
    pub fn deep_equals(&self, other: &Version) -> bool {
        self.stamp.status() == other.stamp.status() && self.payload == other.payload
    }
}

// ------------- Chronology -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChronologyKind {
    Concept,
    Semantic {
        referenced_component: Nid,
        assemblage: Nid,
    },
}

/// Every version ever written for one nid.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Chronology {
    nid: Nid,
    kind: ChronologyKind,
    versions: Vec<Version>,
}

impl Chronology {
    pub fn concept(nid: Nid) -> Self {
        Self {
            nid,
            kind: ChronologyKind::Concept,
            versions: Vec::new(),
        }
    }
    pub fn semantic(nid: Nid, referenced_component: Nid, assemblage: Nid) -> Self {
        Self {
            nid,
            kind: ChronologyKind::Semantic {
                referenced_component,
                assemblage,
            },
            versions: Vec::new(),
        }
    }
    pub fn nid(&self) -> Nid {
        self.nid
    }
    pub fn kind(&self) -> ChronologyKind {
        self.kind
    }
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }
    pub fn push(&mut self, version: Version) {
        self.versions.push(version);
    }
    pub fn referenced_component(&self) -> Option<Nid> {
        match self.kind {
            ChronologyKind::Semantic {
                referenced_component,
                ..
            } => Some(referenced_component),
            ChronologyKind::Concept => None,
        }
    }
    pub fn assemblage(&self) -> Option<Nid> {
        match self.kind {
            ChronologyKind::Semantic { assemblage, .. } => Some(assemblage),
            ChronologyKind::Concept => None,
        }
    }
    pub fn is_concept(&self) -> bool {
        matches!(self.kind, ChronologyKind::Concept)
    }
}

// ------------- ConceptRef -------------
/// A concept specification: a nid together with a human readable name.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ConceptRef {
    nid: Nid,
    name: String,
}

impl ConceptRef {
    pub fn new(nid: Nid, name: impl Into<String>) -> Self {
        Self {
            nid,
            name: name.into(),
        }
    }
    pub fn nid(&self) -> Nid {
        self.nid
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ConceptRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.nid)
    }
}
