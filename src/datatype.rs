// used for the nid keyed hashmaps
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

// used to print out readable forms of a data type
use std::fmt;

use serde::{Deserialize, Serialize};

// ------------- Nid -------------
/// A dense internal identifier for any versioned entity.
pub type Nid = i32;

pub type NidHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- Status -------------
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Inactive,
    Withdrawn,
    Canceled,
    Primordial,
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Withdrawn => "withdrawn",
            Status::Canceled => "canceled",
            Status::Primordial => "primordial",
        };
        write!(f, "{}", name)
    }
}

// ------------- Premise -------------
/// Which axiom set a relationship belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Premise {
    Stated,
    Inferred,
}

// ------------- Shapes -------------
/// The structural shape of a version: how many identifier and string slots
/// its payload carries. Text matching dispatches on this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Concept,
    Member,
    Component,
    Text,
    Integer,
    ComponentText,
    TextText,
    Description,
    Relationship,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Shape::Concept => "concept",
            Shape::Member => "member",
            Shape::Component => "component",
            Shape::Text => "text",
            Shape::Integer => "integer",
            Shape::ComponentText => "component+text",
            Shape::TextText => "text+text",
            Shape::Description => "description",
            Shape::Relationship => "relationship",
        };
        write!(f, "{}", name)
    }
}

// ------------- Payloads -------------
/// The typed content of one version. Two versions are deeply equal when
/// their status and payload are equal, regardless of their stamps' time.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Payload {
    Concept,
    Member,
    Component {
        nid: Nid,
    },
    Text {
        text: String,
    },
    Integer {
        value: i64,
    },
    ComponentText {
        nid: Nid,
        text: String,
    },
    TextText {
        first: String,
        second: String,
    },
    Description {
        text: String,
        case_significance: Nid,
        description_type: Nid,
        language: Nid,
    },
    Relationship {
        destination: Nid,
        relationship_type: Nid,
        group: i32,
        premise: Premise,
    },
}

impl Payload {
    pub fn shape(&self) -> Shape {
        match self {
            Payload::Concept => Shape::Concept,
            Payload::Member => Shape::Member,
            Payload::Component { .. } => Shape::Component,
            Payload::Text { .. } => Shape::Text,
            Payload::Integer { .. } => Shape::Integer,
            Payload::ComponentText { .. } => Shape::ComponentText,
            Payload::TextText { .. } => Shape::TextText,
            Payload::Description { .. } => Shape::Description,
            Payload::Relationship { .. } => Shape::Relationship,
        }
    }
    /// The string slots a text match inspects, or `None` when the shape
    /// carries no string slot at all.
    pub fn text_fields(&self) -> Option<Vec<&str>> {
        match self {
            Payload::Text { text } => Some(vec![text.as_str()]),
            Payload::ComponentText { text, .. } => Some(vec![text.as_str()]),
            Payload::TextText { first, second } => Some(vec![first.as_str(), second.as_str()]),
            Payload::Description { text, .. } => Some(vec![text.as_str()]),
            _ => None,
        }
    }
    /// The single identifier slot of component shaped payloads.
    pub fn component(&self) -> Option<Nid> {
        match self {
            Payload::Component { nid } | Payload::ComponentText { nid, .. } => Some(*nid),
            _ => None,
        }
    }
}
