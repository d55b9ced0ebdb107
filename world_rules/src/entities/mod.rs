//! Entity and relation definitions for the world graph.

mod relation;
mod schema;

pub use relation::*;
pub use schema::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::world_state::Position;

/// Open key/value property map carried by entities and relations.
pub type Properties = serde_json::Map<String, Value>;

/// Unique identifier for all entities in the world graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create a new entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of entities in the world. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Location,
    Actor,
    Item,
    Region,
    Custom(String),
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Location => "location",
            EntityKind::Actor => "actor",
            EntityKind::Item => "item",
            EntityKind::Region => "region",
            EntityKind::Custom(s) => s,
        }
    }
}

impl From<String> for EntityKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "location" => EntityKind::Location,
            "actor" => EntityKind::Actor,
            "item" => EntityKind::Item,
            "region" => EntityKind::Region,
            _ => EntityKind::Custom(kind),
        }
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, uniquely identified node in the world graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Entity {
    /// Create a new entity of the given kind with no properties or tags.
    pub fn new(id: impl Into<EntityId>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: Properties::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Create a new location entity.
    pub fn location(id: impl Into<EntityId>) -> Self {
        Self::new(id, EntityKind::Location)
    }

    /// Create a new actor entity.
    pub fn actor(id: impl Into<EntityId>) -> Self {
        Self::new(id, EntityKind::Actor)
    }

    /// Create a new item entity.
    pub fn item(id: impl Into<EntityId>) -> Self {
        Self::new(id, EntityKind::Item)
    }

    /// Set a property, replacing any previous value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the `x`/`y` coordinate properties.
    pub fn with_coordinates(self, pos: Position) -> Self {
        self.with_property("x", pos.x).with_property("y", pos.y)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(self.id.as_str())
    }

    /// Coordinates from the numeric `x`/`y` properties, if both are present.
    pub fn coordinates(&self) -> Option<Position> {
        let x = self.properties.get("x").and_then(Value::as_f64)?;
        let y = self.properties.get("y").and_then(Value::as_f64)?;
        Some(Position { x, y })
    }
}
