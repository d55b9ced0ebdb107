//! Predicate specifications - the schema relations are validated against.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::{Entity, EntityKind, Properties};
use crate::error::{Result, WorldError};

/// Containment of actors and items in places.
pub const LOCATED_IN: &str = "located_in";
/// Containment of items in containers (actors, locations, other items).
pub const HOLDS: &str = "holds";
/// Directional link between two locations; requires a `direction` property.
pub const EXIT: &str = "exit";
pub const PART_OF: &str = "part_of";
pub const VISITED: &str = "visited";
pub const KNOWS: &str = "knows";

/// Runtime type expected of a required relation property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Number,
    Integer,
    Bool,
    Object,
    Array,
}

impl PropertyKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PropertyKind::String => value.is_string(),
            PropertyKind::Number => value.is_number(),
            PropertyKind::Integer => value.is_i64() || value.is_u64(),
            PropertyKind::Bool => value.is_boolean(),
            PropertyKind::Object => value.is_object(),
            PropertyKind::Array => value.is_array(),
        }
    }
}

/// Named invariants a predicate may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invariant {
    /// A subject has at most one open relation of this predicate.
    UniqueOutgoing,
    /// An object has at most one open relation of this predicate.
    UniqueIncoming,
    NoSelfLoop,
}

impl Invariant {
    pub fn name(&self) -> &'static str {
        match self {
            Invariant::UniqueOutgoing => "unique_outgoing",
            Invariant::UniqueIncoming => "unique_incoming",
            Invariant::NoSelfLoop => "no_self_loop",
        }
    }
}

/// Registered schema for one predicate. Empty kind lists accept any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateSpec {
    pub name: String,
    #[serde(default)]
    pub subject_kinds: Vec<EntityKind>,
    #[serde(default)]
    pub object_kinds: Vec<EntityKind>,
    #[serde(default)]
    pub required: BTreeMap<String, PropertyKind>,
    #[serde(default)]
    pub invariants: Vec<Invariant>,
}

impl PredicateSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject_kinds: Vec::new(),
            object_kinds: Vec::new(),
            required: BTreeMap::new(),
            invariants: Vec::new(),
        }
    }

    pub fn subjects(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.subject_kinds.extend(kinds);
        self
    }

    pub fn objects(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.object_kinds.extend(kinds);
        self
    }

    pub fn requires(mut self, property: impl Into<String>, kind: PropertyKind) -> Self {
        self.required.insert(property.into(), kind);
        self
    }

    pub fn invariant(mut self, invariant: Invariant) -> Self {
        self.invariants.push(invariant);
        self
    }

    pub fn has_invariant(&self, invariant: Invariant) -> bool {
        self.invariants.contains(&invariant)
    }

    /// Check endpoint kinds, required properties and self-loops.
    ///
    /// Uniqueness invariants depend on the rest of the graph and are checked
    /// by the store.
    pub fn validate(&self, subject: &Entity, object: &Entity, properties: &Properties) -> Result<()> {
        if !self.subject_kinds.is_empty() && !self.subject_kinds.contains(&subject.kind) {
            return Err(self.violation(format!(
                "subject {} has kind '{}'",
                subject.id, subject.kind
            )));
        }
        if !self.object_kinds.is_empty() && !self.object_kinds.contains(&object.kind) {
            return Err(self.violation(format!(
                "object {} has kind '{}'",
                object.id, object.kind
            )));
        }
        for (property, kind) in &self.required {
            match properties.get(property) {
                None => {
                    return Err(self.violation(format!("missing required property '{property}'")));
                }
                Some(value) if !kind.matches(value) => {
                    return Err(self.violation(format!(
                        "property '{property}' expected {kind:?}, got {value}"
                    )));
                }
                Some(_) => {}
            }
        }
        if self.has_invariant(Invariant::NoSelfLoop) && subject.id == object.id {
            return Err(WorldError::InvariantViolation {
                predicate: self.name.clone(),
                invariant: Invariant::NoSelfLoop.name(),
                entity: subject.id.clone(),
            });
        }
        Ok(())
    }

    fn violation(&self, reason: String) -> WorldError {
        WorldError::SchemaViolation {
            predicate: self.name.clone(),
            reason,
        }
    }
}

/// Immutable table of predicate specs handed to a graph at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateRegistry {
    specs: HashMap<String, PredicateSpec>,
}

impl PredicateRegistry {
    /// An empty registry: every predicate is unregistered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The predicates the world record seeds into the graph.
    pub fn standard() -> Self {
        use EntityKind::*;
        Self::from_specs([
            PredicateSpec::new(LOCATED_IN)
                .subjects([Actor, Item])
                .objects([Location, Region])
                .invariant(Invariant::UniqueOutgoing),
            PredicateSpec::new(HOLDS)
                .subjects([Actor, Location, Item])
                .objects([Item])
                .invariant(Invariant::UniqueIncoming)
                .invariant(Invariant::NoSelfLoop),
            PredicateSpec::new(EXIT)
                .subjects([Location])
                .objects([Location])
                .requires("direction", PropertyKind::String)
                .invariant(Invariant::NoSelfLoop),
            PredicateSpec::new(PART_OF)
                .subjects([Location])
                .objects([Region])
                .invariant(Invariant::UniqueOutgoing)
                .invariant(Invariant::NoSelfLoop),
            PredicateSpec::new(VISITED)
                .subjects([Actor])
                .objects([Location])
                .requires("turn", PropertyKind::Integer),
            PredicateSpec::new(KNOWS)
                .subjects([Actor])
                .invariant(Invariant::NoSelfLoop),
        ])
    }

    pub fn from_specs(specs: impl IntoIterator<Item = PredicateSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    pub fn get(&self, predicate: &str) -> Option<&PredicateSpec> {
        self.specs.get(predicate)
    }

    pub fn is_registered(&self, predicate: &str) -> bool {
        self.specs.contains_key(predicate)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_kinds() {
        assert!(PropertyKind::Integer.matches(&json!(3)));
        assert!(!PropertyKind::Integer.matches(&json!(3.5)));
        assert!(PropertyKind::Number.matches(&json!(3.5)));
        assert!(PropertyKind::String.matches(&json!("north")));
        assert!(!PropertyKind::Bool.matches(&json!("true")));
    }

    #[test]
    fn test_validate_kinds() {
        let registry = PredicateRegistry::standard();
        let spec = registry.get(LOCATED_IN).unwrap();

        let hero = Entity::actor("hero");
        let harbor = Entity::location("harbor");
        let lantern = Entity::item("lantern");

        assert!(spec.validate(&hero, &harbor, &Properties::new()).is_ok());
        assert!(matches!(
            spec.validate(&hero, &lantern, &Properties::new()),
            Err(WorldError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_validate_required_property() {
        let registry = PredicateRegistry::standard();
        let spec = registry.get(EXIT).unwrap();
        let a = Entity::location("a");
        let b = Entity::location("b");

        let mut props = Properties::new();
        assert!(spec.validate(&a, &b, &props).is_err());

        props.insert("direction".into(), json!(4));
        assert!(spec.validate(&a, &b, &props).is_err());

        props.insert("direction".into(), json!("north"));
        assert!(spec.validate(&a, &b, &props).is_ok());

        assert!(matches!(
            spec.validate(&a, &a, &props),
            Err(WorldError::InvariantViolation { invariant: "no_self_loop", .. })
        ));
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: PredicateSpec = toml::from_str(
            r#"
            name = "guards"
            subject_kinds = ["actor"]
            object_kinds = ["location", "vault"]
            invariants = ["unique_incoming"]

            [required]
            shift = "string"
            "#,
        )
        .unwrap();

        assert_eq!(spec.object_kinds[1], EntityKind::Custom("vault".into()));
        assert_eq!(spec.required.get("shift"), Some(&PropertyKind::String));
        assert!(spec.has_invariant(Invariant::UniqueIncoming));
    }
}
