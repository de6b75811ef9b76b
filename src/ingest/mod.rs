//! Source-model ingestion: best-effort extraction of entities and
//! relationships from declarative model-definition files.
//!
//! Each dialect parser is a text scanner over declaration blocks, not a
//! grammar front end: fields it cannot confidently extract are skipped, and
//! a relationship is only recorded when the dialect's own relation metadata
//! is present. Under-extraction is preferred over fabrication.

mod mongoose;
mod prisma;
mod sequelize;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchemaError;
use crate::schema::{Attribute, CanonicalModel, Cardinality, Entity, Relationship};
use crate::validation::validate;

/// Supported source-model dialects, detected by token heuristics.
///
/// A closed set with a pure dispatch function; new dialects extend the enum
/// and the dispatch table.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum SourceDialect {
    Prisma,
    Mongoose,
    Sequelize,
}

impl std::fmt::Display for SourceDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceDialect::Prisma => write!(f, "prisma"),
            SourceDialect::Mongoose => write!(f, "mongoose"),
            SourceDialect::Sequelize => write!(f, "sequelize"),
        }
    }
}

/// Inspect raw text for dialect-distinguishing tokens.
///
/// Returns `None` for unrecognized content; callers skip such files with a
/// warning rather than failing the batch.
pub fn detect_dialect(text: &str) -> Option<SourceDialect> {
    if text.contains("mongoose.Schema")
        || text.contains("new Schema(")
        || text.contains("mongoose.model(")
    {
        return Some(SourceDialect::Mongoose);
    }
    if text.contains("DataTypes.") || text.contains("sequelize.define(") {
        return Some(SourceDialect::Sequelize);
    }
    if prisma::looks_like_prisma(text) {
        return Some(SourceDialect::Prisma);
    }
    None
}

/// Entity candidate extracted from one declaration block; ids are allocated
/// later, during merge.
#[derive(Clone, Debug)]
pub(crate) struct EntityDraft {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

/// Relationship candidate; endpoints are display names until merge resolves
/// them to allocated entity ids.
#[derive(Clone, Debug)]
pub(crate) struct RelationDraft {
    pub source_entity: String,
    pub target_entity: String,
    pub source_attribute: String,
    pub target_attribute: String,
    pub cardinality: Cardinality,
}

/// Output of one file's extraction
#[derive(Clone, Debug, Default)]
pub(crate) struct Fragment {
    pub entities: Vec<EntityDraft>,
    pub relations: Vec<RelationDraft>,
    /// Per-block extraction notes, surfaced as ingest warnings
    pub notes: Vec<String>,
}

/// Pure dispatch over the dialect tag
pub(crate) fn parse(dialect: SourceDialect, text: &str) -> Fragment {
    match dialect {
        SourceDialect::Prisma => prisma::parse(text),
        SourceDialect::Mongoose => mongoose::parse(text),
        SourceDialect::Sequelize => sequelize::parse(text),
    }
}

/// Non-fatal note about a file or block excluded from ingestion
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IngestWarning {
    pub path: String,
    pub reason: String,
}

/// Result of ingesting a batch of model-definition files
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestReport {
    pub model: CanonicalModel,
    /// Number of files that actually contributed entities
    pub files_ingested: usize,
    pub warnings: Vec<IngestWarning>,
}

/// Ingest an ordered batch of `(path, content)` files into one canonical
/// model.
///
/// Entities are de-duplicated by display name (first occurrence wins) and
/// receive freshly allocated ids during merge; relationship endpoints are
/// re-resolved from display names to those ids once all files have merged.
/// A file that cannot be recognized or parsed is skipped with a warning;
/// the batch never aborts because of one bad file.
pub fn ingest_files(files: &[(String, String)]) -> Result<IngestReport, SchemaError> {
    let mut drafts: Vec<EntityDraft> = Vec::new();
    let mut relations: Vec<(String, RelationDraft)> = Vec::new();
    let mut warnings: Vec<IngestWarning> = Vec::new();
    let mut files_ingested = 0;

    for (path, content) in files {
        let Some(dialect) = detect_dialect(content) else {
            tracing::warn!(path = %path, "unrecognized model dialect, file skipped");
            warnings.push(IngestWarning {
                path: path.clone(),
                reason: "unrecognized model dialect".into(),
            });
            continue;
        };
        let fragment = parse(dialect, content);
        for note in &fragment.notes {
            tracing::warn!(path = %path, dialect = %dialect, "{note}");
            warnings.push(IngestWarning {
                path: path.clone(),
                reason: note.clone(),
            });
        }
        if fragment.entities.is_empty() {
            tracing::warn!(path = %path, dialect = %dialect, "no entity declarations extracted");
            warnings.push(IngestWarning {
                path: path.clone(),
                reason: format!("no entity declarations extracted ({dialect})"),
            });
            continue;
        }
        files_ingested += 1;
        for draft in fragment.entities {
            if drafts.iter().any(|d| d.name == draft.name) {
                warnings.push(IngestWarning {
                    path: path.clone(),
                    reason: format!(
                        "duplicate entity '{}' ignored, first occurrence wins",
                        draft.name
                    ),
                });
                continue;
            }
            drafts.push(draft);
        }
        relations.extend(fragment.relations.into_iter().map(|r| (path.clone(), r)));
    }

    // Merge: allocate ids, then re-resolve relationship endpoints
    let mut model = CanonicalModel::new();
    let mut ids: HashMap<String, String> = HashMap::new();
    for (i, draft) in drafts.into_iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        ids.insert(draft.name.clone(), id.clone());
        let position = (100.0 + 350.0 * (i % 4) as f64, 100.0 + 250.0 * (i / 4) as f64);
        model.entities.push(Entity {
            id,
            name: draft.name,
            attributes: draft.attributes,
            position,
        });
    }

    for (path, relation) in relations {
        let (Some(source_id), Some(target_id)) = (
            ids.get(&relation.source_entity),
            ids.get(&relation.target_entity),
        ) else {
            warnings.push(IngestWarning {
                path,
                reason: format!(
                    "relationship {} -> {} dropped, endpoint entity not found",
                    relation.source_entity, relation.target_entity
                ),
            });
            continue;
        };
        let resolvable = model
            .entity(source_id)
            .is_some_and(|e| e.attribute(&relation.source_attribute).is_some())
            && model
                .entity(target_id)
                .is_some_and(|e| e.attribute(&relation.target_attribute).is_some());
        if !resolvable {
            warnings.push(IngestWarning {
                path,
                reason: format!(
                    "relationship {}.{} -> {}.{} dropped, endpoint attribute not found",
                    relation.source_entity,
                    relation.source_attribute,
                    relation.target_entity,
                    relation.target_attribute
                ),
            });
            continue;
        }
        model.relationships.push(Relationship::new(
            source_id.clone(),
            target_id.clone(),
            relation.source_attribute,
            relation.target_attribute,
            relation.cardinality,
        ));
    }

    validate(&model)?;
    tracing::info!(
        files = files.len(),
        files_ingested,
        entities = model.entities.len(),
        relationships = model.relationships.len(),
        "ingestion merge complete"
    );
    Ok(IngestReport {
        model,
        files_ingested,
        warnings,
    })
}

/// Slice out the content between the brace at `open` and its balanced
/// closing brace. Best-effort: braces inside string literals count too.
pub(crate) fn balanced_block(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an object-literal body into top-level `key: value` entries,
/// ignoring commas nested inside braces, brackets, or parens.
pub(crate) fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < body.len() {
        parts.push(&body[start..]);
    }
    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Strip surrounding quote characters from an identifier
pub(crate) fn unquote(name: &str) -> &str {
    name.trim_matches(|c| c == '\'' || c == '"' || c == '`')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRISMA_SRC: &str = r#"
model User {
  id    Int     @id @default(autoincrement())
  email String  @unique
}
"#;

    const MONGOOSE_SRC: &str = r#"
const userSchema = new mongoose.Schema({
  name: { type: String, required: true }
});
module.exports = mongoose.model('User', userSchema);
"#;

    const SEQUELIZE_SRC: &str = r#"
const User = sequelize.define('User', {
  id: { type: DataTypes.INTEGER, primaryKey: true }
});
"#;

    #[test]
    fn detects_each_dialect() {
        assert_eq!(detect_dialect(PRISMA_SRC), Some(SourceDialect::Prisma));
        assert_eq!(detect_dialect(MONGOOSE_SRC), Some(SourceDialect::Mongoose));
        assert_eq!(detect_dialect(SEQUELIZE_SRC), Some(SourceDialect::Sequelize));
        assert_eq!(detect_dialect("SELECT * FROM users;"), None);
        assert_eq!(detect_dialect(""), None);
    }

    #[test]
    fn unrecognized_file_is_skipped_with_warning() {
        let files = vec![
            ("user.prisma".to_string(), PRISMA_SRC.to_string()),
            ("notes.txt".to_string(), "just some notes".to_string()),
        ];
        let report = ingest_files(&files).unwrap();
        assert_eq!(report.files_ingested, 1);
        assert_eq!(report.model.entities.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, "notes.txt");
    }

    #[test]
    fn duplicate_display_names_first_occurrence_wins() {
        let first = r#"
model User {
  id    Int    @id
  email String
}
"#;
        let second = r#"
model User {
  id   Int @id
  name String
}
"#;
        let files = vec![
            ("a.prisma".to_string(), first.to_string()),
            ("b.prisma".to_string(), second.to_string()),
        ];
        let report = ingest_files(&files).unwrap();
        assert_eq!(report.model.entities.len(), 1);
        let user = report.model.entity_by_name("User").unwrap();
        assert!(user.attribute("email").is_some());
        assert!(user.attribute("name").is_none());
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.reason.contains("duplicate entity 'User'"))
        );
    }

    #[test]
    fn cross_file_relationships_resolve_after_merge() {
        let users = r#"
model User {
  id Int @id
}
"#;
        let posts = r#"
model Post {
  id       Int  @id
  author   User @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;
        let files = vec![
            ("post.prisma".to_string(), posts.to_string()),
            ("user.prisma".to_string(), users.to_string()),
        ];
        let report = ingest_files(&files).unwrap();
        assert_eq!(report.model.relationships.len(), 1);
        let rel = &report.model.relationships[0];
        let post = report.model.entity_by_name("Post").unwrap();
        let user = report.model.entity_by_name("User").unwrap();
        assert_eq!(rel.source_entity, post.id);
        assert_eq!(rel.target_entity, user.id);
        assert_eq!(rel.source_attribute, "authorId");
        assert_eq!(rel.target_attribute, "id");
    }

    #[test]
    fn unresolvable_relationship_is_dropped_not_fatal() {
        let posts = r#"
model Post {
  id       Int  @id
  author   User @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;
        let files = vec![("post.prisma".to_string(), posts.to_string())];
        let report = ingest_files(&files).unwrap();
        assert!(report.model.relationships.is_empty());
        assert!(report.warnings.iter().any(|w| w.reason.contains("dropped")));
    }

    #[test]
    fn merge_is_order_independent() {
        let users = r#"
model User {
  id Int @id
}
"#;
        let posts = r#"
model Post {
  id       Int  @id
  author   User @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;
        let forward = vec![
            ("u.prisma".to_string(), users.to_string()),
            ("p.prisma".to_string(), posts.to_string()),
        ];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();

        let a = ingest_files(&forward).unwrap();
        let b = ingest_files(&reversed).unwrap();

        let mut names_a: Vec<_> = a.model.entities.iter().map(|e| e.name.clone()).collect();
        let mut names_b: Vec<_> = b.model.entities.iter().map(|e| e.name.clone()).collect();
        names_a.sort();
        names_b.sort();
        assert_eq!(names_a, names_b);

        let pair = |report: &IngestReport| {
            let model = &report.model;
            model
                .relationships
                .iter()
                .map(|r| {
                    (
                        model.entity(&r.source_entity).unwrap().name.clone(),
                        model.entity(&r.target_entity).unwrap().name.clone(),
                        r.source_attribute.clone(),
                        r.target_attribute.clone(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(pair(&a), pair(&b));
    }

    #[test]
    fn split_top_level_respects_nesting() {
        let body = "a: { x: 1, y: 2 }, b: [1, 2], c: String";
        let parts = split_top_level(body);
        assert_eq!(parts, vec!["a: { x: 1, y: 2 }", "b: [1, 2]", "c: String"]);
    }

    #[test]
    fn balanced_block_extracts_inner_text() {
        let text = "model User { id Int { nested } ok }";
        let open = text.find('{').unwrap();
        assert_eq!(balanced_block(text, open), Some(" id Int { nested } ok "));
        assert_eq!(balanced_block("no brace", 0), None);
        assert_eq!(balanced_block("{ unterminated", 0), None);
    }
}
