use serde::{Deserialize, Serialize};

/// Dialect-neutral attribute type.
///
/// Every source and target dialect renders its own names for these; the
/// canonical model only ever carries this closed set.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Id,
    Array,
    Object,
    Binary,
    Unstructured,
}

impl LogicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Text => "text",
            LogicalType::Integer => "integer",
            LogicalType::Float => "float",
            LogicalType::Boolean => "boolean",
            LogicalType::DateTime => "datetime",
            LogicalType::Id => "id",
            LogicalType::Array => "array",
            LogicalType::Object => "object",
            LogicalType::Binary => "binary",
            LogicalType::Unstructured => "unstructured",
        }
    }
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single named attribute (column/field) of an entity
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub logical_type: LogicalType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            is_primary_key: false,
            is_nullable: true,
            is_unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

/// Graph node - a table or collection
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Entity {
    /// Caller-assigned identifier, stable across edits of the same model
    pub id: String,
    /// Display name, unique within a merged model
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Position hint for canvas layouts (x, y); opaque to the core
    pub position: (f64, f64),
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Vec::new(),
            position: (0.0, 0.0),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = (x, y);
        self
    }

    pub fn add_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The attributes forming this entity's identity
    pub fn primary_key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_primary_key)
    }
}

/// Cardinality of a relationship edge
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "1:1"),
            Cardinality::OneToMany => write!(f, "1:N"),
            Cardinality::ManyToOne => write!(f, "N:1"),
            Cardinality::ManyToMany => write!(f, "N:M"),
        }
    }
}

/// Graph edge - a directed link between two entities.
///
/// The source side owns the foreign-key attribute; the target side is the
/// referenced entity.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Relationship {
    /// Id of the entity owning the foreign-key attribute
    pub source_entity: String,
    /// Id of the referenced entity
    pub target_entity: String,
    /// Attribute name on the source side
    pub source_attribute: String,
    /// Attribute name on the target side
    pub target_attribute: String,
    pub cardinality: Cardinality,
}

impl Relationship {
    pub fn new(
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        source_attribute: impl Into<String>,
        target_attribute: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            source_entity: source_entity.into(),
            target_entity: target_entity.into(),
            source_attribute: source_attribute.into(),
            target_attribute: target_attribute.into(),
            cardinality,
        }
    }
}

/// The dialect-neutral entity/relationship graph all components share.
///
/// A model is constructed once per request and never mutated afterwards;
/// transformations produce a new model.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct CanonicalModel {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl CanonicalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn add_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Look up an entity by its id
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Look up an entity by its display name
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
