//! Immutable dialect-pair type tables, loaded once at first use.
//!
//! Tables are keyed by the ordered (source, target) pair so that
//! pair-specific representation choices stay local to that pair instead of
//! leaking into a shared target table. Relational tables carry no entry for
//! unstructured data; those attributes take the generic string fallback.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::schema::LogicalType;

use super::DatabaseDialect;

pub(crate) type TypeTable = HashMap<LogicalType, &'static str>;

fn postgres_types() -> TypeTable {
    HashMap::from([
        (LogicalType::Text, "TEXT"),
        (LogicalType::Integer, "INTEGER"),
        (LogicalType::Float, "DOUBLE PRECISION"),
        (LogicalType::Boolean, "BOOLEAN"),
        (LogicalType::DateTime, "TIMESTAMPTZ"),
        (LogicalType::Id, "UUID"),
        (LogicalType::Array, "JSONB"),
        (LogicalType::Object, "JSONB"),
        (LogicalType::Binary, "BYTEA"),
    ])
}

fn mysql_types() -> TypeTable {
    HashMap::from([
        (LogicalType::Text, "VARCHAR(255)"),
        (LogicalType::Integer, "INT"),
        (LogicalType::Float, "DOUBLE"),
        (LogicalType::Boolean, "TINYINT(1)"),
        (LogicalType::DateTime, "DATETIME"),
        (LogicalType::Id, "CHAR(36)"),
        (LogicalType::Array, "JSON"),
        (LogicalType::Object, "JSON"),
        (LogicalType::Binary, "BLOB"),
    ])
}

fn sqlite_types() -> TypeTable {
    HashMap::from([
        (LogicalType::Text, "TEXT"),
        (LogicalType::Integer, "INTEGER"),
        (LogicalType::Float, "REAL"),
        (LogicalType::Boolean, "INTEGER"),
        (LogicalType::DateTime, "TEXT"),
        (LogicalType::Id, "TEXT"),
        (LogicalType::Array, "TEXT"),
        (LogicalType::Object, "TEXT"),
        (LogicalType::Binary, "BLOB"),
    ])
}

/// BSON type names for `$jsonSchema` validators
fn mongodb_types() -> TypeTable {
    HashMap::from([
        (LogicalType::Text, "string"),
        (LogicalType::Integer, "long"),
        (LogicalType::Float, "double"),
        (LogicalType::Boolean, "bool"),
        (LogicalType::DateTime, "date"),
        (LogicalType::Id, "objectId"),
        (LogicalType::Array, "array"),
        (LogicalType::Object, "object"),
        (LogicalType::Binary, "binData"),
        (LogicalType::Unstructured, "object"),
    ])
}

static TABLES: LazyLock<HashMap<(DatabaseDialect, DatabaseDialect), TypeTable>> =
    LazyLock::new(|| {
        use DatabaseDialect::*;
        let mut tables = HashMap::new();
        for source in [MongoDb, MySql, Postgres, Sqlite] {
            for target in [MongoDb, MySql, Postgres, Sqlite] {
                if source == target {
                    continue;
                }
                let mut table = match target {
                    MongoDb => mongodb_types(),
                    MySql => mysql_types(),
                    Postgres => postgres_types(),
                    Sqlite => sqlite_types(),
                };
                // ObjectId identifiers arrive as 24-char hex strings, not
                // native UUIDs
                if source == MongoDb {
                    match target {
                        Postgres => {
                            table.insert(LogicalType::Id, "VARCHAR(24)");
                        }
                        MySql => {
                            table.insert(LogicalType::Id, "CHAR(24)");
                        }
                        _ => {}
                    }
                }
                tables.insert((source, target), table);
            }
        }
        tables
    });

/// The type table for an ordered dialect pair, if one exists
pub(crate) fn table_for(
    source: DatabaseDialect,
    target: DatabaseDialect,
) -> Option<&'static TypeTable> {
    TABLES.get(&(source, target))
}

/// Generic variable-length-string fallback for unmapped logical types
pub(crate) fn generic_string(target: DatabaseDialect) -> &'static str {
    match target {
        DatabaseDialect::MySql => "VARCHAR(255)",
        DatabaseDialect::Postgres | DatabaseDialect::Sqlite => "TEXT",
        DatabaseDialect::MongoDb => "string",
    }
}
