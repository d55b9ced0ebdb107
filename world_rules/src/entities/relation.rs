//! Relations - typed, directed edges between entities.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{EntityId, Properties};

/// Unique identifier for relations.
///
/// Derived by name from predicate, endpoints and properties, so the same
/// relation always receives the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub Uuid);

impl RelationId {
    pub fn derive(
        predicate: &str,
        subject: &EntityId,
        object: &EntityId,
        properties: &Properties,
    ) -> Self {
        let canonical: BTreeMap<&String, &Value> = properties.iter().collect();
        let props = serde_json::to_string(&canonical).unwrap_or_default();
        let key = format!("{predicate}|{subject}|{object}|{props}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open validity window `[from, until)` measured in turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: u64,
    pub until: Option<u64>,
}

impl ValidityWindow {
    pub fn contains(&self, turn: u64) -> bool {
        turn >= self.from && self.until.map_or(true, |end| turn < end)
    }
}

/// A typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub predicate: String,
    pub subject: EntityId,
    pub object: EntityId,
    pub directed: bool,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub validity: Option<ValidityWindow>,
}

impl Relation {
    /// A relation is open while its validity window has no end.
    pub fn is_open(&self) -> bool {
        self.validity.map_or(true, |w| w.until.is_none())
    }

    pub fn active_at(&self, turn: u64) -> bool {
        self.validity.map_or(true, |w| w.contains(turn))
    }

    /// Whether this relation touches `entity` at either end.
    pub fn involves(&self, entity: &EntityId) -> bool {
        &self.subject == entity || &self.object == entity
    }
}

/// A relation that has not been validated yet.
#[derive(Debug, Clone)]
pub struct RelationDraft {
    pub subject: EntityId,
    pub predicate: String,
    pub object: EntityId,
    pub directed: bool,
    pub properties: Properties,
    pub validity: Option<ValidityWindow>,
}

impl RelationDraft {
    pub fn new(
        subject: impl Into<EntityId>,
        predicate: impl Into<String>,
        object: impl Into<EntityId>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            directed: true,
            properties: Properties::new(),
            validity: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn undirected(mut self) -> Self {
        self.directed = false;
        self
    }

    pub fn valid_between(mut self, from: u64, until: Option<u64>) -> Self {
        self.validity = Some(ValidityWindow { from, until });
        self
    }

    pub fn id(&self) -> RelationId {
        RelationId::derive(&self.predicate, &self.subject, &self.object, &self.properties)
    }

    pub(crate) fn into_relation(self) -> Relation {
        Relation {
            id: self.id(),
            predicate: self.predicate,
            subject: self.subject,
            object: self.object,
            directed: self.directed,
            properties: self.properties,
            validity: self.validity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_id_is_stable() {
        let a = RelationDraft::new("hero", "located_in", "harbor").with_property("since", 3);
        let b = RelationDraft::new("hero", "located_in", "harbor").with_property("since", 3);
        let c = RelationDraft::new("hero", "located_in", "harbor").with_property("since", 4);

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_validity_window() {
        let window = ValidityWindow {
            from: 2,
            until: Some(5),
        };
        assert!(!window.contains(1));
        assert!(window.contains(2));
        assert!(window.contains(4));
        assert!(!window.contains(5));

        let relation = RelationDraft::new("a", "knows", "b")
            .valid_between(0, Some(3))
            .into_relation();
        assert!(!relation.is_open());
        assert!(relation.active_at(2));
        assert!(!relation.active_at(3));
    }
}
