//! Structural-integrity checks for the canonical model.
//!
//! The validator gates every entry point: ingestion-merge output, conversion
//! input, and externally supplied models before diffing. Checks run in
//! ordered classes, short-circuiting on the first class that fails but
//! collecting every violation of that class.

use crate::schema::CanonicalModel;

/// A single structural violation with enough context to locate it
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    /// Entity has an empty id
    EmptyEntityId { name: String },
    /// Entity declares no attributes
    NoAttributes { entity: String },
    /// Attribute has an empty name
    EmptyAttributeName { entity: String },
    /// Primary-key attribute is marked nullable
    NullablePrimaryKey { entity: String, attribute: String },
    /// Two attributes in one entity share a name
    DuplicateAttribute { entity: String, attribute: String },
    /// Relationship source references an entity id not in the model
    UnknownSourceEntity { source: String, target: String },
    /// Relationship target references an entity id not in the model
    UnknownTargetEntity { source: String, target: String },
    /// Relationship source attribute missing on the source entity
    UnknownSourceAttribute { entity: String, attribute: String },
    /// Relationship target attribute missing on the target entity
    UnknownTargetAttribute { entity: String, attribute: String },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaViolation::EmptyEntityId { name } => {
                write!(f, "entity '{}' has an empty id", name)
            }
            SchemaViolation::NoAttributes { entity } => {
                write!(f, "entity '{}' has no attributes", entity)
            }
            SchemaViolation::EmptyAttributeName { entity } => {
                write!(f, "entity '{}' has an attribute with an empty name", entity)
            }
            SchemaViolation::NullablePrimaryKey { entity, attribute } => {
                write!(
                    f,
                    "primary-key attribute '{}.{}' cannot be nullable",
                    entity, attribute
                )
            }
            SchemaViolation::DuplicateAttribute { entity, attribute } => {
                write!(
                    f,
                    "duplicate attribute name '{}' in entity '{}'",
                    attribute, entity
                )
            }
            SchemaViolation::UnknownSourceEntity { source, target } => {
                write!(
                    f,
                    "relationship {} -> {} references unknown source entity '{}'",
                    source, target, source
                )
            }
            SchemaViolation::UnknownTargetEntity { source, target } => {
                write!(
                    f,
                    "relationship {} -> {} references unknown target entity '{}'",
                    source, target, target
                )
            }
            SchemaViolation::UnknownSourceAttribute { entity, attribute } => {
                write!(
                    f,
                    "relationship source attribute '{}.{}' does not exist",
                    entity, attribute
                )
            }
            SchemaViolation::UnknownTargetAttribute { entity, attribute } => {
                write!(
                    f,
                    "relationship target attribute '{}.{}' does not exist",
                    entity, attribute
                )
            }
        }
    }
}

/// Validation failure carrying every violation of the first failing class
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<SchemaViolation>,
}

impl ValidationError {
    fn new(violations: Vec<SchemaViolation>) -> Self {
        Self { violations }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "schema validation failed: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Validate the structural invariants of a canonical model.
///
/// Pure, no side effects. Invalid entities are reported, never dropped.
pub fn validate(model: &CanonicalModel) -> Result<(), ValidationError> {
    // Class 1: entity identity and shape
    let mut violations = Vec::new();
    for entity in &model.entities {
        if entity.id.trim().is_empty() {
            violations.push(SchemaViolation::EmptyEntityId {
                name: entity.name.clone(),
            });
        }
        if entity.attributes.is_empty() {
            violations.push(SchemaViolation::NoAttributes {
                entity: entity.name.clone(),
            });
        }
    }
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    // Class 2: attribute names and the primary-key/nullable exclusivity.
    // Logical-type membership is enforced by the closed enum.
    for entity in &model.entities {
        for attribute in &entity.attributes {
            if attribute.name.trim().is_empty() {
                violations.push(SchemaViolation::EmptyAttributeName {
                    entity: entity.name.clone(),
                });
            }
            if attribute.is_primary_key && attribute.is_nullable {
                violations.push(SchemaViolation::NullablePrimaryKey {
                    entity: entity.name.clone(),
                    attribute: attribute.name.clone(),
                });
            }
        }
    }
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    // Class 3: attribute-name uniqueness within each entity
    for entity in &model.entities {
        let mut seen = std::collections::HashSet::new();
        for attribute in &entity.attributes {
            if !seen.insert(attribute.name.as_str()) {
                violations.push(SchemaViolation::DuplicateAttribute {
                    entity: entity.name.clone(),
                    attribute: attribute.name.clone(),
                });
            }
        }
    }
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    // Class 4: relationship endpoints resolve to entities and attributes
    for relationship in &model.relationships {
        match model.entity(&relationship.source_entity) {
            None => violations.push(SchemaViolation::UnknownSourceEntity {
                source: relationship.source_entity.clone(),
                target: relationship.target_entity.clone(),
            }),
            Some(entity) => {
                if entity.attribute(&relationship.source_attribute).is_none() {
                    violations.push(SchemaViolation::UnknownSourceAttribute {
                        entity: entity.name.clone(),
                        attribute: relationship.source_attribute.clone(),
                    });
                }
            }
        }
        match model.entity(&relationship.target_entity) {
            None => violations.push(SchemaViolation::UnknownTargetEntity {
                source: relationship.source_entity.clone(),
                target: relationship.target_entity.clone(),
            }),
            Some(entity) => {
                if entity.attribute(&relationship.target_attribute).is_none() {
                    violations.push(SchemaViolation::UnknownTargetAttribute {
                        entity: entity.name.clone(),
                        attribute: relationship.target_attribute.clone(),
                    });
                }
            }
        }
    }
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    Ok(())
}
