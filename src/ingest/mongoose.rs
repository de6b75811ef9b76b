//! Mongoose schema scanner.
//!
//! Finds `new Schema({...})` object literals and the `mongoose.model(...)`
//! bindings that name them. Relationship candidates require an ObjectId
//! field carrying a `ref:` hint; anything less stays a plain attribute.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{Attribute, Cardinality, LogicalType};

use super::{EntityDraft, Fragment, RelationDraft, balanced_block, split_top_level, unquote};

static SCHEMA_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:const|let|var)\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*new\s+(?:mongoose\.)?Schema\s*\(")
        .expect("valid schema regex")
});

static MODEL_BIND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:mongoose\.)?model\s*\(\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]\s*,\s*([A-Za-z_][A-Za-z0-9_]*)\s*[,)]"#,
    )
    .expect("valid model binding regex")
});

static MODEL_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:mongoose\.)?model\s*\(\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]\s*,\s*new\s+(?:mongoose\.)?Schema\s*\("#,
    )
    .expect("valid inline model regex")
});

static TYPE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"type\s*:\s*([A-Za-z_][A-Za-z0-9_.]*)").expect("valid type key regex")
});

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ref\s*:\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#).expect("valid ref regex")
});

static REQUIRED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"required\s*:\s*true").expect("valid required regex"));

static UNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"unique\s*:\s*true").expect("valid unique regex"));

/// Map a Mongoose type token (last path segment) to its logical type
fn field_type(token: &str) -> LogicalType {
    let short = token.rsplit('.').next().unwrap_or(token);
    match short {
        "String" => LogicalType::Text,
        "Number" | "Decimal128" => LogicalType::Float,
        "BigInt" => LogicalType::Integer,
        "Boolean" => LogicalType::Boolean,
        "Date" => LogicalType::DateTime,
        "Buffer" => LogicalType::Binary,
        "ObjectId" | "UUID" => LogicalType::Id,
        "Map" => LogicalType::Object,
        "Array" => LogicalType::Array,
        _ => LogicalType::Unstructured,
    }
}

/// Derive a display name from a schema variable when no `mongoose.model`
/// binding names it: `userSchema` becomes `User`.
fn derive_name(variable: &str) -> String {
    let base = variable
        .strip_suffix("Schema")
        .or_else(|| variable.strip_suffix("schema"))
        .unwrap_or(variable);
    let base = base.trim_end_matches('_');
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => variable.to_string(),
    }
}

pub(crate) fn parse(text: &str) -> Fragment {
    let mut fragment = Fragment::default();

    let bindings: HashMap<String, String> = MODEL_BIND_RE
        .captures_iter(text)
        .map(|c| (c[2].to_string(), c[1].to_string()))
        .collect();

    let mut declarations: Vec<(String, usize)> = Vec::new();
    for capture in SCHEMA_VAR_RE.captures_iter(text) {
        let variable = &capture[1];
        let name = bindings
            .get(variable)
            .cloned()
            .unwrap_or_else(|| derive_name(variable));
        declarations.push((name, capture.get(0).expect("whole match").end()));
    }
    for capture in MODEL_INLINE_RE.captures_iter(text) {
        declarations.push((
            capture[1].to_string(),
            capture.get(0).expect("whole match").end(),
        ));
    }

    for (name, after_paren) in declarations {
        let Some(open) = text[after_paren..].find('{').map(|i| after_paren + i) else {
            fragment
                .notes
                .push(format!("schema '{name}' has no field object, skipped"));
            continue;
        };
        let Some(body) = balanced_block(text, open) else {
            fragment
                .notes
                .push(format!("schema '{name}' has an unterminated block, skipped"));
            continue;
        };

        let mut attributes = Vec::new();
        for entry in split_top_level(body) {
            let Some((key, value)) = entry.split_once(':') else {
                continue;
            };
            let field = unquote(key.trim()).to_string();
            let value = value.trim();
            if field.is_empty() {
                continue;
            }

            let (logical_type, required, is_unique, reference) = classify_value(value);
            let mut attribute = Attribute::new(field.as_str(), logical_type);
            attribute.is_nullable = !required;
            attribute.is_unique = is_unique;
            if field == "_id" {
                attribute.is_primary_key = true;
                attribute.is_nullable = false;
            }

            if let Some(target) = reference {
                fragment.relations.push(RelationDraft {
                    source_entity: name.clone(),
                    target_entity: target,
                    source_attribute: field.clone(),
                    target_attribute: "_id".to_string(),
                    cardinality: if logical_type == LogicalType::Array {
                        Cardinality::OneToMany
                    } else {
                        Cardinality::ManyToOne
                    },
                });
            }

            attributes.push(attribute);
        }

        if attributes.is_empty() {
            fragment
                .notes
                .push(format!("schema '{name}' has no extractable fields, skipped"));
            continue;
        }

        // Every document carries an implicit _id identity
        if attributes.iter().all(|a| a.name != "_id") {
            attributes.insert(0, Attribute::new("_id", LogicalType::Id).primary_key());
        }

        fragment.entities.push(EntityDraft { name, attributes });
    }

    fragment
}

/// Inspect one field value and return (logical type, required, unique,
/// relationship target if the ref metadata is present).
fn classify_value(value: &str) -> (LogicalType, bool, bool, Option<String>) {
    if let Some(inner) = value.strip_prefix('[') {
        // Array field; a ref on the element type links to the target's _id
        let inner = inner.trim_end_matches(']').trim();
        let reference = element_reference(inner);
        return (LogicalType::Array, false, false, reference);
    }
    if value.starts_with('{') {
        let required = REQUIRED_RE.is_match(value);
        let is_unique = UNIQUE_RE.is_match(value);
        let logical_type = TYPE_KEY_RE
            .captures(value)
            .map(|c| field_type(&c[1]))
            // Object literal without a type key is an embedded document
            .unwrap_or(LogicalType::Object);
        let reference = element_reference(value);
        return (logical_type, required, is_unique, reference);
    }
    (field_type(value), false, false, None)
}

/// A relationship candidate needs both an ObjectId type and a ref hint
fn element_reference(value: &str) -> Option<String> {
    if !value.contains("ObjectId") {
        return None;
    }
    REF_RE.captures(value).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"
const mongoose = require('mongoose');

const userSchema = new mongoose.Schema({
  name: { type: String, required: true },
  email: { type: String, required: true, unique: true },
  age: Number,
  posts: [{ type: mongoose.Schema.Types.ObjectId, ref: 'Post' }]
}, { timestamps: true });

const postSchema = new mongoose.Schema({
  title: { type: String, required: true },
  author: { type: mongoose.Schema.Types.ObjectId, ref: 'User' },
  body: String
});

module.exports = {
  User: mongoose.model('User', userSchema),
  Post: mongoose.model('Post', postSchema)
};
"#;

    #[test]
    fn extracts_schemas_with_model_names() {
        let fragment = parse(BLOG);
        assert_eq!(fragment.entities.len(), 2);
        assert_eq!(fragment.entities[0].name, "User");
        assert_eq!(fragment.entities[1].name, "Post");
    }

    #[test]
    fn infers_flags_from_field_modifiers() {
        let fragment = parse(BLOG);
        let user = &fragment.entities[0];

        let email = user.attributes.iter().find(|a| a.name == "email").unwrap();
        assert!(!email.is_nullable);
        assert!(email.is_unique);
        assert_eq!(email.logical_type, LogicalType::Text);

        let age = user.attributes.iter().find(|a| a.name == "age").unwrap();
        assert!(age.is_nullable);
        assert_eq!(age.logical_type, LogicalType::Float);
    }

    #[test]
    fn injects_implicit_id_primary_key() {
        let fragment = parse(BLOG);
        let user = &fragment.entities[0];
        let id = user.attributes.iter().find(|a| a.name == "_id").unwrap();
        assert!(id.is_primary_key);
        assert_eq!(id.logical_type, LogicalType::Id);
    }

    #[test]
    fn ref_fields_become_relationships() {
        let fragment = parse(BLOG);
        assert_eq!(fragment.relations.len(), 2);

        let posts = fragment
            .relations
            .iter()
            .find(|r| r.source_attribute == "posts")
            .unwrap();
        assert_eq!(posts.source_entity, "User");
        assert_eq!(posts.target_entity, "Post");
        assert_eq!(posts.target_attribute, "_id");
        assert_eq!(posts.cardinality, Cardinality::OneToMany);

        let author = fragment
            .relations
            .iter()
            .find(|r| r.source_attribute == "author")
            .unwrap();
        assert_eq!(author.source_entity, "Post");
        assert_eq!(author.target_entity, "User");
        assert_eq!(author.cardinality, Cardinality::ManyToOne);
    }

    #[test]
    fn unbound_schema_derives_its_name() {
        let src = r#"
const commentSchema = new Schema({
  text: String
});
"#;
        let fragment = parse(src);
        assert_eq!(fragment.entities.len(), 1);
        assert_eq!(fragment.entities[0].name, "Comment");
    }

    #[test]
    fn ambiguous_reference_stays_plain_attribute() {
        // ref without ObjectId type is not enough relation metadata
        let src = r#"
const noteSchema = new Schema({
  owner: { type: String, ref: 'User' }
});
"#;
        let fragment = parse(src);
        assert!(fragment.relations.is_empty());
        let note = &fragment.entities[0];
        assert!(note.attributes.iter().any(|a| a.name == "owner"));
    }

    #[test]
    fn embedded_object_without_type_key_is_object() {
        let src = r#"
const profileSchema = new Schema({
  address: { street: String, city: String }
});
"#;
        let fragment = parse(src);
        let profile = &fragment.entities[0];
        let address = profile
            .attributes
            .iter()
            .find(|a| a.name == "address")
            .unwrap();
        assert_eq!(address.logical_type, LogicalType::Object);
    }
}
