//! Canonical database schema modeling with three coupled operations:
//! ingesting heterogeneous source model definitions into a dialect-neutral
//! entity/relationship graph, converting that graph into another database
//! dialect's DDL, and computing a structural diff between two snapshots.
//!
//! Every component is a pure pipeline over an immutable [`CanonicalModel`];
//! the only suspending operation is the external collaborator call behind
//! AI-assisted conversion, and its failure degrades to deterministic
//! table-driven mapping instead of surfacing.

pub mod collaborator;
pub mod convert;
pub mod diff;
pub mod error;
pub mod ingest;
pub mod schema;
pub mod validation;


pub use collaborator::{
    CollaboratorConfig, CollaboratorError, GenerativeCollaborator, HttpCollaborator,
};
pub use convert::{ConversionEngine, ConversionOutput, DatabaseDialect, MappingExplanation};
pub use diff::{ChangeSet, EntityChange, RelationshipChange, diff};
pub use error::SchemaError;
pub use ingest::{IngestReport, IngestWarning, SourceDialect, detect_dialect, ingest_files};
pub use schema::{Attribute, CanonicalModel, Cardinality, Entity, LogicalType, Relationship};
pub use validation::{SchemaViolation, ValidationError, validate};
