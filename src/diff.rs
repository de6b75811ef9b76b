//! Structural diff between two canonical-model snapshots.
//!
//! Entities are matched by id, relationships by the ordered (source,
//! target) entity pair. Matching by pair collapses multiple relationships
//! between the same two entities to one tracked edge; this is a known
//! precision limit of the pair key, kept deliberately.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::{Attribute, CanonicalModel, Entity, Relationship};
use crate::validation::validate;

/// Modification of one entity, carrying both attribute snapshots
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct EntityChange {
    pub id: String,
    pub name: String,
    pub before: Vec<Attribute>,
    pub after: Vec<Attribute>,
}

/// Modification of the relationship tracked for one (source, target) pair
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RelationshipChange {
    pub source_entity: String,
    pub target_entity: String,
    pub before: Relationship,
    pub after: Relationship,
}

/// Categorized output of the diff engine
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ChangeSet {
    pub added_entities: Vec<Entity>,
    pub removed_entities: Vec<Entity>,
    pub modified_entities: Vec<EntityChange>,
    pub added_relationships: Vec<Relationship>,
    pub removed_relationships: Vec<Relationship>,
    pub modified_relationships: Vec<RelationshipChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added_entities.is_empty()
            && self.removed_entities.is_empty()
            && self.modified_entities.is_empty()
            && self.added_relationships.is_empty()
            && self.removed_relationships.is_empty()
            && self.modified_relationships.is_empty()
    }
}

/// Compute the before -> after change set between two snapshots.
///
/// Both inputs are re-validated at this boundary; the comparison itself is
/// pure and independent of entity or relationship ordering.
pub fn diff(before: &CanonicalModel, after: &CanonicalModel) -> Result<ChangeSet, SchemaError> {
    validate(before)?;
    validate(after)?;
    Ok(diff_validated(before, after))
}

fn diff_validated(before: &CanonicalModel, after: &CanonicalModel) -> ChangeSet {
    let mut changes = ChangeSet::default();

    let before_entities: HashMap<&str, &Entity> =
        before.entities.iter().map(|e| (e.id.as_str(), e)).collect();
    let after_entities: HashMap<&str, &Entity> =
        after.entities.iter().map(|e| (e.id.as_str(), e)).collect();

    for entity in &before.entities {
        match after_entities.get(entity.id.as_str()) {
            None => changes.removed_entities.push(entity.clone()),
            Some(other) => {
                if !attribute_sets_equal(&entity.attributes, &other.attributes) {
                    changes.modified_entities.push(EntityChange {
                        id: entity.id.clone(),
                        name: other.name.clone(),
                        before: entity.attributes.clone(),
                        after: other.attributes.clone(),
                    });
                }
            }
        }
    }
    for entity in &after.entities {
        if !before_entities.contains_key(entity.id.as_str()) {
            changes.added_entities.push(entity.clone());
        }
    }

    // One tracked relationship per ordered pair; the first declared wins
    let before_rels = relationships_by_pair(before);
    let after_rels = relationships_by_pair(after);

    for (pair, relationship) in &before_rels {
        match after_rels.get(pair) {
            None => changes.removed_relationships.push((*relationship).clone()),
            Some(other) => {
                if relationship != other {
                    changes.modified_relationships.push(RelationshipChange {
                        source_entity: relationship.source_entity.clone(),
                        target_entity: relationship.target_entity.clone(),
                        before: (*relationship).clone(),
                        after: (*other).clone(),
                    });
                }
            }
        }
    }
    for (pair, relationship) in &after_rels {
        if !before_rels.contains_key(pair) {
            changes.added_relationships.push((*relationship).clone());
        }
    }

    changes
}

fn relationships_by_pair(model: &CanonicalModel) -> HashMap<(&str, &str), &Relationship> {
    let mut by_pair = HashMap::new();
    for relationship in &model.relationships {
        by_pair
            .entry((
                relationship.source_entity.as_str(),
                relationship.target_entity.as_str(),
            ))
            .or_insert(relationship);
    }
    by_pair
}

/// Order-insensitive value equality over attribute sets
fn attribute_sets_equal(a: &[Attribute], b: &[Attribute]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(|x, y| x.name.cmp(&y.name));
    b.sort_by(|x, y| x.name.cmp(&y.name));
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Cardinality, LogicalType};

    fn snapshot() -> CanonicalModel {
        let user = Entity::new("e-user", "User")
            .add_attribute(Attribute::new("id", LogicalType::Integer).primary_key())
            .add_attribute(Attribute::new("email", LogicalType::Text).unique());
        let order = Entity::new("e-order", "Order")
            .add_attribute(Attribute::new("id", LogicalType::Integer).primary_key())
            .add_attribute(Attribute::new("user_id", LogicalType::Integer));
        CanonicalModel::new()
            .add_entity(user)
            .add_entity(order)
            .add_relationship(Relationship::new(
                "e-order",
                "e-user",
                "user_id",
                "id",
                Cardinality::ManyToOne,
            ))
    }

    #[test]
    fn equal_models_yield_empty_change_set() {
        let a = snapshot();
        let changes = diff(&a, &a).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let a = snapshot();
        let mut b = snapshot();
        b.entities[0].attributes.reverse();
        assert!(diff(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn added_and_removed_entities_are_categorized() {
        let a = snapshot();
        let mut b = snapshot();
        b.entities.push(
            Entity::new("e-invoice", "Invoice")
                .add_attribute(Attribute::new("id", LogicalType::Integer).primary_key()),
        );
        let changes = diff(&a, &b).unwrap();
        assert_eq!(changes.added_entities.len(), 1);
        assert_eq!(changes.added_entities[0].name, "Invoice");
        assert!(changes.removed_entities.is_empty());
        assert!(changes.modified_entities.is_empty());
    }

    #[test]
    fn attribute_change_records_before_and_after() {
        let a = snapshot();
        let mut b = snapshot();
        // Swap email for phone on User
        b.entities[0].attributes.retain(|attr| attr.name != "email");
        b.entities[0]
            .attributes
            .push(Attribute::new("phone", LogicalType::Text));

        let changes = diff(&a, &b).unwrap();
        assert!(changes.added_entities.is_empty());
        assert!(changes.removed_entities.is_empty());
        assert_eq!(changes.modified_entities.len(), 1);
        let change = &changes.modified_entities[0];
        assert_eq!(change.name, "User");
        assert!(change.before.iter().any(|attr| attr.name == "email"));
        assert!(change.before.iter().all(|attr| attr.name != "phone"));
        assert!(change.after.iter().any(|attr| attr.name == "phone"));
        assert!(change.after.iter().all(|attr| attr.name != "email"));
    }

    #[test]
    fn flag_change_is_a_modification() {
        let a = snapshot();
        let mut b = snapshot();
        b.entities[0].attributes[1].is_unique = false;
        let changes = diff(&a, &b).unwrap();
        assert_eq!(changes.modified_entities.len(), 1);
    }

    #[test]
    fn relationship_changes_match_by_entity_pair() {
        let a = snapshot();
        let mut b = snapshot();
        b.relationships[0].cardinality = Cardinality::OneToOne;
        let changes = diff(&a, &b).unwrap();
        assert_eq!(changes.modified_relationships.len(), 1);
        let change = &changes.modified_relationships[0];
        assert_eq!(change.before.cardinality, Cardinality::ManyToOne);
        assert_eq!(change.after.cardinality, Cardinality::OneToOne);
    }

    #[test]
    fn removed_relationship_is_categorized() {
        let a = snapshot();
        let mut b = snapshot();
        b.relationships.clear();
        let changes = diff(&a, &b).unwrap();
        assert_eq!(changes.removed_relationships.len(), 1);
        assert!(changes.added_relationships.is_empty());
    }

    #[test]
    fn swap_symmetry_over_added_and_removed() {
        let a = snapshot();
        let mut b = snapshot();
        b.entities.remove(1);
        b.relationships.clear();
        b.entities.push(
            Entity::new("e-invoice", "Invoice")
                .add_attribute(Attribute::new("id", LogicalType::Integer).primary_key()),
        );

        let forward = diff(&a, &b).unwrap();
        let backward = diff(&b, &a).unwrap();
        assert_eq!(forward.added_entities, backward.removed_entities);
        assert_eq!(forward.removed_entities, backward.added_entities);
        assert_eq!(forward.added_relationships, backward.removed_relationships);
        assert_eq!(forward.removed_relationships, backward.added_relationships);
    }

    #[test]
    fn parallel_relationships_collapse_per_pair() {
        let mut a = snapshot();
        a.entities[1].attributes.push(Attribute::new(
            "billing_user_id",
            LogicalType::Integer,
        ));
        a.relationships.push(Relationship::new(
            "e-order",
            "e-user",
            "billing_user_id",
            "id",
            Cardinality::ManyToOne,
        ));
        let changes = diff(&a, &a).unwrap();
        // The second edge between the same pair is not tracked separately
        assert!(changes.is_empty());
    }

    #[test]
    fn invalid_input_is_rejected_at_the_boundary() {
        let a = snapshot();
        let mut b = snapshot();
        b.relationships.push(Relationship::new(
            "e-order",
            "missing",
            "user_id",
            "id",
            Cardinality::ManyToOne,
        ));
        assert!(matches!(
            diff(&a, &b),
            Err(SchemaError::Validation(_))
        ));
    }
}
