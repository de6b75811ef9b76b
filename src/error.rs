use thiserror::Error;

use crate::validation::ValidationError;

/// Terminal errors returned to callers.
///
/// Parse problems and collaborator failures are absorbed internally (they
/// degrade output quality, not availability) and never appear here unless
/// the deterministic fallback itself cannot run.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Structural violation of the canonical-model invariants
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed request: same source/target dialect or an unknown tag
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No deterministic type-mapping table exists for the dialect pair
    #[error("no type mapping table for dialect pair {src} -> {target}")]
    UnsupportedPair { src: String, target: String },
}
