//! Error types for the world substrate.

use crate::entities::{EntityId, RelationId};

/// Errors raised by graph mutations, patch application and configuration loading.
///
/// Constraint violations are not errors; they are reported as soft violation
/// lists by the narrative layer.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityId),

    #[error("missing entity {id} ({context})")]
    MissingEntity { id: EntityId, context: &'static str },

    #[error("missing relation: {0}")]
    MissingRelation(RelationId),

    #[error("schema violation on '{predicate}': {reason}")]
    SchemaViolation { predicate: String, reason: String },

    #[error("invariant '{invariant}' violated on '{predicate}' for {entity}")]
    InvariantViolation {
        predicate: String,
        invariant: &'static str,
        entity: EntityId,
    },

    #[error("{container} does not hold {item}")]
    NotContained { container: EntityId, item: EntityId },

    #[error("malformed patch path '{0}': paths must start with '/'")]
    MalformedPath(String),

    #[error("merge at '{0}' requires an object value")]
    MergeValue(String),

    #[error("cannot traverse '{path}' at segment '{segment}'")]
    PathTraversal { path: String, segment: String },

    #[error("record shape error: {0}")]
    RecordShape(#[from] serde_json::Error),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WorldError>;
