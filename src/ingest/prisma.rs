//! Prisma schema scanner.
//!
//! Walks `model` declaration blocks and extracts field lines. Relation
//! fields are turned into relationship candidates only when the
//! `@relation(fields: ..., references: ...)` metadata is present; a bare
//! back-reference stays a plain attribute.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{Attribute, Cardinality, LogicalType};

use super::{EntityDraft, Fragment, RelationDraft, balanced_block};

static MODEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*model\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{").expect("valid model regex")
});

static FIELDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"fields\s*:\s*\[\s*([A-Za-z_][A-Za-z0-9_]*)").expect("valid fields regex")
});

static REFERENCES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"references\s*:\s*\[\s*([A-Za-z_][A-Za-z0-9_]*)").expect("valid references regex")
});

pub(crate) fn looks_like_prisma(text: &str) -> bool {
    MODEL_RE.is_match(text)
        && (text.contains('@') || text.contains("datasource") || text.contains("generator"))
}

/// Map a Prisma scalar type to its logical type. Unknown names (enums
/// declared elsewhere) degrade to text.
fn scalar_type(name: &str) -> LogicalType {
    match name {
        "String" => LogicalType::Text,
        "Int" | "BigInt" => LogicalType::Integer,
        "Float" | "Decimal" => LogicalType::Float,
        "Boolean" => LogicalType::Boolean,
        "DateTime" => LogicalType::DateTime,
        "Json" => LogicalType::Object,
        "Bytes" => LogicalType::Binary,
        "Unsupported" => LogicalType::Unstructured,
        _ => LogicalType::Text,
    }
}

pub(crate) fn parse(text: &str) -> Fragment {
    let mut fragment = Fragment::default();

    // First pass: declared model names, so metadata-less relation fields
    // (back-references) can be told apart from scalars.
    let model_names: HashSet<String> = MODEL_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();

    for capture in MODEL_RE.captures_iter(text) {
        let name = capture[1].to_string();
        let whole = capture.get(0).expect("whole match");
        let Some(body) = balanced_block(text, whole.end() - 1) else {
            fragment
                .notes
                .push(format!("model '{name}' has an unterminated block, skipped"));
            continue;
        };

        let mut attributes = Vec::new();
        for raw_line in body.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("//") || line.starts_with("@@") {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let (Some(field), Some(ty)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            let is_list = ty.ends_with("[]");
            let is_optional = ty.ends_with('?');
            let base = ty.trim_end_matches("[]").trim_end_matches('?');

            if line.contains("@relation") {
                // Enough metadata to resolve the owning foreign-key column?
                let columns = (
                    FIELDS_RE.captures(line).map(|c| c[1].to_string()),
                    REFERENCES_RE.captures(line).map(|c| c[1].to_string()),
                );
                if let (Some(source_attribute), Some(target_attribute)) = columns {
                    fragment.relations.push(RelationDraft {
                        source_entity: name.clone(),
                        target_entity: base.to_string(),
                        source_attribute,
                        target_attribute,
                        cardinality: if is_list {
                            Cardinality::OneToMany
                        } else {
                            Cardinality::ManyToOne
                        },
                    });
                    // The relation field itself is not a stored column; the
                    // referenced fields: [...] attribute is.
                    continue;
                }
            }

            let logical_type = if model_names.contains(base) {
                // Back-reference without relation metadata: keep as a plain
                // attribute rather than fabricating a relationship.
                if is_list {
                    LogicalType::Array
                } else {
                    LogicalType::Object
                }
            } else if is_list {
                LogicalType::Array
            } else {
                scalar_type(base)
            };

            let mut attribute = Attribute::new(field, logical_type);
            // Prisma fields are required unless marked optional
            attribute.is_nullable = is_optional;
            if line.contains("@id") {
                attribute.is_primary_key = true;
                attribute.is_nullable = false;
            }
            if line.contains("@unique") {
                attribute.is_unique = true;
            }
            attributes.push(attribute);
        }

        if attributes.is_empty() {
            fragment
                .notes
                .push(format!("model '{name}' has no extractable fields, skipped"));
            continue;
        }
        fragment.entities.push(EntityDraft { name, attributes });
    }

    fragment
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"
datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

model User {
  id      Int      @id @default(autoincrement())
  email   String   @unique
  bio     String?
  posts   Post[]
}

model Post {
  id       Int      @id @default(autoincrement())
  title    String
  tags     String[]
  author   User     @relation(fields: [authorId], references: [id])
  authorId Int
}
"#;

    #[test]
    fn extracts_models_and_scalar_fields() {
        let fragment = parse(BLOG);
        assert_eq!(fragment.entities.len(), 2);

        let user = &fragment.entities[0];
        assert_eq!(user.name, "User");
        let id = user.attributes.iter().find(|a| a.name == "id").unwrap();
        assert!(id.is_primary_key);
        assert!(!id.is_nullable);
        assert_eq!(id.logical_type, LogicalType::Integer);

        let email = user.attributes.iter().find(|a| a.name == "email").unwrap();
        assert!(email.is_unique);
        assert!(!email.is_nullable);

        let bio = user.attributes.iter().find(|a| a.name == "bio").unwrap();
        assert!(bio.is_nullable);
    }

    #[test]
    fn optionality_follows_the_question_mark() {
        let fragment = parse(BLOG);
        let post = &fragment.entities[1];
        let title = post.attributes.iter().find(|a| a.name == "title").unwrap();
        assert!(!title.is_nullable);
    }

    #[test]
    fn scalar_list_becomes_array() {
        let fragment = parse(BLOG);
        let post = &fragment.entities[1];
        let tags = post.attributes.iter().find(|a| a.name == "tags").unwrap();
        assert_eq!(tags.logical_type, LogicalType::Array);
    }

    #[test]
    fn relation_with_metadata_is_recorded_and_field_skipped() {
        let fragment = parse(BLOG);
        assert_eq!(fragment.relations.len(), 1);
        let rel = &fragment.relations[0];
        assert_eq!(rel.source_entity, "Post");
        assert_eq!(rel.target_entity, "User");
        assert_eq!(rel.source_attribute, "authorId");
        assert_eq!(rel.target_attribute, "id");
        assert_eq!(rel.cardinality, Cardinality::ManyToOne);

        let post = &fragment.entities[1];
        assert!(post.attributes.iter().all(|a| a.name != "author"));
        assert!(post.attributes.iter().any(|a| a.name == "authorId"));
    }

    #[test]
    fn back_reference_without_metadata_stays_an_attribute() {
        let fragment = parse(BLOG);
        let user = &fragment.entities[0];
        let posts = user.attributes.iter().find(|a| a.name == "posts").unwrap();
        assert_eq!(posts.logical_type, LogicalType::Array);
        // No fabricated relationship from the bare back-reference
        assert!(fragment.relations.iter().all(|r| r.source_entity != "User"));
    }

    #[test]
    fn empty_model_is_skipped_with_note() {
        let fragment = parse("model Ghost {\n}\n generator client {}");
        assert!(fragment.entities.is_empty());
        assert_eq!(fragment.notes.len(), 1);
        assert!(fragment.notes[0].contains("Ghost"));
    }

    #[test]
    fn unknown_scalar_degrades_to_text() {
        let src = r#"
model Ticket {
  id     Int    @id
  status Status
}
"#;
        let fragment = parse(src);
        let ticket = &fragment.entities[0];
        let status = ticket.attributes.iter().find(|a| a.name == "status").unwrap();
        assert_eq!(status.logical_type, LogicalType::Text);
    }
}
