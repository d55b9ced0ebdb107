//! Error types for the narrative layer.

use world_rules::WorldError;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    World(#[from] WorldError),

    /// The session advanced after the shadow turn was taken.
    #[error("shadow turn based on turn {expected}, but the session is at turn {actual}")]
    StaleShadow { expected: u64, actual: u64 },
}

pub type Result<T> = std::result::Result<T, ContextError>;
