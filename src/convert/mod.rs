//! Dialect conversion engine.
//!
//! Decides between deterministic table-driven type mapping and an
//! AI-assisted translation, then synthesizes DDL from the canonical model.
//! The assisted path is a single round trip; its failure falls back to the
//! deterministic path rather than surfacing to the caller.

mod typemap;

use serde::{Deserialize, Serialize};

use crate::collaborator::GenerativeCollaborator;
use crate::error::SchemaError;
use crate::schema::{CanonicalModel, Entity};
use crate::validation::validate;

/// Conversion targets: one document-oriented dialect and three relational
/// dialects with distinct identity-column and JSON idioms.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum DatabaseDialect {
    MongoDb,
    MySql,
    Postgres,
    Sqlite,
}

impl DatabaseDialect {
    /// Normalize a caller-supplied dialect tag, tolerating case and the
    /// common aliases.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" | "documentdb" => Some(DatabaseDialect::MongoDb),
            "mysql" | "mariadb" => Some(DatabaseDialect::MySql),
            "postgresql" | "postgres" | "pg" => Some(DatabaseDialect::Postgres),
            "sqlite" | "sqlite3" => Some(DatabaseDialect::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDialect::MongoDb => "mongodb",
            DatabaseDialect::MySql => "mysql",
            DatabaseDialect::Postgres => "postgresql",
            DatabaseDialect::Sqlite => "sqlite",
        }
    }

    fn is_document(&self) -> bool {
        matches!(self, DatabaseDialect::MongoDb)
    }

    /// Full column rendering for auto-increment/identity primary keys
    fn identity_column(&self) -> &'static str {
        match self {
            DatabaseDialect::MySql => "INT AUTO_INCREMENT PRIMARY KEY",
            DatabaseDialect::Postgres => "INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY",
            DatabaseDialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            DatabaseDialect::MongoDb => "objectId",
        }
    }
}

impl std::fmt::Display for DatabaseDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Table-driven mapping assumes a clean relational shape; larger or looser
/// graphs go through the assisted reasoning pass instead.
pub const MAX_DIRECT_RELATIONSHIPS: usize = 10;
pub const MAX_DIRECT_ENTITIES: usize = 15;

/// One per-attribute record of how a logical type was resolved
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MappingExplanation {
    pub entity: String,
    pub attribute: String,
    pub source_type: String,
    pub target_type: String,
    pub reason: String,
}

/// DDL text plus the per-attribute mapping explanations
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct ConversionOutput {
    pub ddl: String,
    pub explanations: Vec<MappingExplanation>,
}

/// Conversion engine with an optional generative collaborator.
///
/// Without a collaborator every conversion runs the deterministic path.
pub struct ConversionEngine {
    collaborator: Option<Box<dyn GenerativeCollaborator>>,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionEngine {
    pub fn new() -> Self {
        Self { collaborator: None }
    }

    pub fn with_collaborator(collaborator: Box<dyn GenerativeCollaborator>) -> Self {
        Self {
            collaborator: Some(collaborator),
        }
    }

    /// Convert a canonical model into the target dialect's DDL.
    ///
    /// The dialect tags are normalized first; `source == target` and
    /// unknown tags fail with `InvalidRequest`. An empty model yields empty
    /// DDL, not an error.
    pub async fn convert(
        &self,
        model: &CanonicalModel,
        source: &str,
        target: &str,
    ) -> Result<ConversionOutput, SchemaError> {
        validate(model)?;
        let source = DatabaseDialect::parse(source)
            .ok_or_else(|| SchemaError::InvalidRequest(format!("unsupported dialect '{source}'")))?;
        let target = DatabaseDialect::parse(target)
            .ok_or_else(|| SchemaError::InvalidRequest(format!("unsupported dialect '{target}'")))?;
        if source == target {
            return Err(SchemaError::InvalidRequest(
                "source and target dialects must differ".into(),
            ));
        }
        if model.is_empty() {
            return Ok(ConversionOutput::default());
        }

        if needs_assist(model, source, target) {
            if let Some(collaborator) = &self.collaborator {
                tracing::info!(%source, %target, "running AI-assisted conversion");
                match assisted(model, target, collaborator.as_ref()).await {
                    Ok(output) => return Ok(output),
                    Err(reason) => {
                        tracing::warn!(%reason, "collaborator failed, falling back to deterministic mapping");
                    }
                }
            }
        }

        deterministic(model, source, target)
    }
}

/// The assisted pass handles the structurally lossy document dialect and
/// models past the complexity threshold.
fn needs_assist(model: &CanonicalModel, source: DatabaseDialect, target: DatabaseDialect) -> bool {
    source.is_document()
        || target.is_document()
        || model.relationships.len() > MAX_DIRECT_RELATIONSHIPS
        || model.entities.len() > MAX_DIRECT_ENTITIES
}

/// One-shot collaborator call with response shape validation. Any failure
/// is reported as a reason string for the fallback log line.
async fn assisted(
    model: &CanonicalModel,
    target: DatabaseDialect,
    collaborator: &dyn GenerativeCollaborator,
) -> Result<ConversionOutput, String> {
    let response = collaborator
        .generate_ddl(model, target.as_str())
        .await
        .map_err(|e| e.to_string())?;
    let ddl = response
        .get("ddl_text")
        .and_then(|v| v.as_str())
        .ok_or("response missing string field 'ddl_text'")?
        .to_string();
    let raw = response
        .get("mapping_explanations")
        .and_then(|v| v.as_array())
        .ok_or("response missing array field 'mapping_explanations'")?;
    let explanations = raw
        .iter()
        .cloned()
        .map(serde_json::from_value::<MappingExplanation>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("malformed mapping explanation: {e}"))?;
    Ok(ConversionOutput { ddl, explanations })
}

/// Table-driven DDL synthesis
fn deterministic(
    model: &CanonicalModel,
    source: DatabaseDialect,
    target: DatabaseDialect,
) -> Result<ConversionOutput, SchemaError> {
    let table = typemap::table_for(source, target).ok_or_else(|| SchemaError::UnsupportedPair {
        src: source.to_string(),
        target: target.to_string(),
    })?;

    let mut ddl = String::new();
    let mut explanations = Vec::new();
    for entity in &model.entities {
        if target.is_document() {
            render_collection(entity, source, target, table, &mut ddl, &mut explanations);
        } else {
            render_table(
                model,
                entity,
                source,
                target,
                table,
                &mut ddl,
                &mut explanations,
            );
        }
    }
    tracing::debug!(
        entities = model.entities.len(),
        explanations = explanations.len(),
        "deterministic conversion complete"
    );
    Ok(ConversionOutput { ddl, explanations })
}

fn render_table(
    model: &CanonicalModel,
    entity: &Entity,
    source: DatabaseDialect,
    target: DatabaseDialect,
    table: &typemap::TypeTable,
    ddl: &mut String,
    explanations: &mut Vec<MappingExplanation>,
) {
    let mut lines = Vec::new();
    for attribute in &entity.attributes {
        if attribute.is_primary_key {
            let idiom = target.identity_column();
            lines.push(format!("    {} {}", attribute.name, idiom));
            explanations.push(MappingExplanation {
                entity: entity.name.clone(),
                attribute: attribute.name.clone(),
                source_type: attribute.logical_type.to_string(),
                target_type: idiom.to_string(),
                reason: format!("primary key rendered with the {target} identity idiom"),
            });
            continue;
        }

        let (target_type, reason) = match table.get(&attribute.logical_type) {
            Some(mapped) => (
                *mapped,
                format!("direct mapping in the {source} -> {target} table"),
            ),
            None => (
                typemap::generic_string(target),
                format!(
                    "no {source} -> {target} mapping for {}, fell back to the generic string type",
                    attribute.logical_type
                ),
            ),
        };
        let mut line = format!("    {} {}", attribute.name, target_type);
        if !attribute.is_nullable {
            line.push_str(" NOT NULL");
        }
        if attribute.is_unique {
            line.push_str(" UNIQUE");
        }
        lines.push(line);
        explanations.push(MappingExplanation {
            entity: entity.name.clone(),
            attribute: attribute.name.clone(),
            source_type: attribute.logical_type.to_string(),
            target_type: target_type.to_string(),
            reason,
        });
    }

    for relationship in model
        .relationships
        .iter()
        .filter(|r| r.source_entity == entity.id)
    {
        let Some(referenced) = model.entity(&relationship.target_entity) else {
            continue;
        };
        lines.push(format!(
            "    CONSTRAINT fk_{}_{} FOREIGN KEY ({}) REFERENCES {} ({})",
            entity.name.to_lowercase(),
            relationship.source_attribute.to_lowercase(),
            relationship.source_attribute,
            referenced.name,
            relationship.target_attribute
        ));
    }

    ddl.push_str(&format!(
        "CREATE TABLE {} (\n{}\n);\n\n",
        entity.name,
        lines.join(",\n")
    ));
}

/// Document-dialect rendering: a collection with a `$jsonSchema` validator
/// plus unique indexes. Used when the assisted path is unavailable.
fn render_collection(
    entity: &Entity,
    source: DatabaseDialect,
    target: DatabaseDialect,
    table: &typemap::TypeTable,
    ddl: &mut String,
    explanations: &mut Vec<MappingExplanation>,
) {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for attribute in &entity.attributes {
        let (bson_type, reason) = if attribute.is_primary_key {
            (
                target.identity_column(),
                "primary key rendered as an objectId".to_string(),
            )
        } else {
            match table.get(&attribute.logical_type) {
                Some(mapped) => (
                    *mapped,
                    format!("direct mapping in the {source} -> {target} table"),
                ),
                None => (
                    typemap::generic_string(target),
                    format!(
                        "no {source} -> {target} mapping for {}, fell back to the generic string type",
                        attribute.logical_type
                    ),
                ),
            }
        };
        properties.insert(
            attribute.name.clone(),
            serde_json::json!({ "bsonType": bson_type }),
        );
        if !attribute.is_nullable {
            required.push(attribute.name.clone());
        }
        explanations.push(MappingExplanation {
            entity: entity.name.clone(),
            attribute: attribute.name.clone(),
            source_type: attribute.logical_type.to_string(),
            target_type: bson_type.to_string(),
            reason,
        });
    }

    let options = serde_json::json!({
        "validator": {
            "$jsonSchema": {
                "bsonType": "object",
                "required": required,
                "properties": properties,
            }
        }
    });
    ddl.push_str(&format!(
        "db.createCollection(\"{}\", {});\n",
        entity.name,
        serde_json::to_string_pretty(&options).expect("collection options serialize")
    ));
    for attribute in entity
        .attributes
        .iter()
        .filter(|a| a.is_unique && !a.is_primary_key)
    {
        ddl.push_str(&format!(
            "db.{}.createIndex({{ \"{}\": 1 }}, {{ unique: true }});\n",
            entity.name, attribute.name
        ));
    }
    ddl.push('\n');
}
