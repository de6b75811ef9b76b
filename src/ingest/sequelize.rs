//! Sequelize model scanner.
//!
//! Handles both `sequelize.define('Name', {...})` and the class-based
//! `Name.init({...})` declaration styles. A relationship candidate requires
//! an explicit `references: { model, key }` block on the field.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{Attribute, Cardinality, LogicalType};

use super::{EntityDraft, Fragment, RelationDraft, balanced_block, split_top_level, unquote};

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.define\s*\(\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]\s*,\s*\{"#)
        .expect("valid define regex")
});

static INIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\.init\s*\(\s*\{").expect("valid init regex")
});

static DATA_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DataTypes\.([A-Za-z0-9]+)").expect("valid data type regex"));

static PRIMARY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"primaryKey\s*:\s*true").expect("valid primary key regex"));

static ALLOW_NULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"allowNull\s*:\s*false").expect("valid allow null regex"));

static UNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"unique\s*:\s*(?:true|['"])"#).expect("valid unique regex"));

static REFERENCES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"references\s*:\s*\{([^}]*)\}").expect("valid references regex"));

static REF_MODEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"model\s*:\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#).expect("valid ref model regex")
});

static REF_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"key\s*:\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#).expect("valid ref key regex")
});

/// Map a `DataTypes.*` name to its logical type
fn data_type(name: &str) -> LogicalType {
    match name {
        "STRING" | "CHAR" | "TEXT" | "CITEXT" | "ENUM" => LogicalType::Text,
        "INTEGER" | "BIGINT" | "SMALLINT" | "MEDIUMINT" | "TINYINT" => LogicalType::Integer,
        "FLOAT" | "REAL" | "DOUBLE" | "DECIMAL" => LogicalType::Float,
        "BOOLEAN" => LogicalType::Boolean,
        "DATE" | "DATEONLY" | "TIME" | "NOW" => LogicalType::DateTime,
        "UUID" | "UUIDV1" | "UUIDV4" => LogicalType::Id,
        "JSON" | "JSONB" | "HSTORE" => LogicalType::Object,
        "BLOB" => LogicalType::Binary,
        "ARRAY" | "RANGE" => LogicalType::Array,
        _ => LogicalType::Text,
    }
}

pub(crate) fn parse(text: &str) -> Fragment {
    let mut fragment = Fragment::default();

    let mut declarations: Vec<(String, usize)> = Vec::new();
    for capture in DEFINE_RE.captures_iter(text) {
        let whole = capture.get(0).expect("whole match");
        declarations.push((capture[1].to_string(), whole.end() - 1));
    }
    for capture in INIT_RE.captures_iter(text) {
        let whole = capture.get(0).expect("whole match");
        declarations.push((capture[1].to_string(), whole.end() - 1));
    }

    for (name, open) in declarations {
        let Some(body) = balanced_block(text, open) else {
            fragment
                .notes
                .push(format!("model '{name}' has an unterminated block, skipped"));
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

            let Some(type_name) = DATA_TYPE_RE.captures(value).map(|c| c[1].to_string()) else {
                // Field without a DataTypes tag (associations block, options)
                // cannot be extracted confidently
                continue;
            };

            let mut attribute = Attribute::new(field.as_str(), data_type(&type_name));
            if PRIMARY_KEY_RE.is_match(value) {
                attribute.is_primary_key = true;
                attribute.is_nullable = false;
            } else if ALLOW_NULL_RE.is_match(value) {
                attribute.is_nullable = false;
            }
            if UNIQUE_RE.is_match(value) {
                attribute.is_unique = true;
            }

            if let Some(reference) = REFERENCES_RE.captures(value) {
                let inner = reference[1].to_string();
                if let Some(model) = REF_MODEL_RE.captures(&inner) {
                    let target_attribute = REF_KEY_RE
                        .captures(&inner)
                        .map(|c| c[1].to_string())
                        .unwrap_or_else(|| "id".to_string());
                    fragment.relations.push(RelationDraft {
                        source_entity: name.clone(),
                        target_entity: model[1].to_string(),
                        source_attribute: field.clone(),
                        target_attribute,
                        cardinality: Cardinality::ManyToOne,
                    });
                }
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
