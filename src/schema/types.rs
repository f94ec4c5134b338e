//! Semantic column types.
//!
//! `DataType` is the backend-independent category a column belongs to,
//! carrying the length/precision hints that dialects need when they map it
//! to a native keyword (see `Dialect::sql_type`). Introspection goes the other
//! way: native type strings reported by a catalog are parsed back with
//! [`DataType::parse`].

use serde::{Deserialize, Serialize};

/// Semantic SQL type of a column.
///
/// # Examples
///
/// ```
/// use dialectic::schema::DataType;
///
/// assert_eq!(DataType::parse("varchar(255)"), Some(DataType::Varchar(255)));
/// assert_eq!(DataType::parse("decimal(18,2)"), Some(DataType::Decimal(18, 2)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type.
    Bool,

    /// 8-bit signed integer (TINYINT in most databases).
    Int8,

    /// 16-bit signed integer (SMALLINT).
    Int16,

    /// 32-bit signed integer (INT/INTEGER).
    Int32,

    /// 64-bit signed integer (BIGINT).
    Int64,

    /// 32-bit floating point (REAL/FLOAT4).
    Float32,

    /// 64-bit floating point (DOUBLE PRECISION/FLOAT8).
    Float64,

    /// Fixed-precision decimal: precision, scale.
    Decimal(u8, u8),

    /// Variable-length string without a declared limit.
    String,

    /// Fixed-length character string.
    Char(u16),

    /// Variable-length character string with maximum length.
    Varchar(u16),

    /// Date without time.
    Date,

    /// Time without date or timezone.
    Time,

    /// Timestamp without timezone.
    Timestamp,

    /// Timestamp with timezone.
    TimestampTz,

    /// Binary data (BLOB, BYTEA, VARBINARY).
    Binary,

    /// JSON document.
    Json,

    /// UUID/GUID.
    Uuid,
}

impl DataType {
    /// Parse a native SQL type name as reported by a catalog.
    ///
    /// Unknown names return `None`; introspection callers fall back to
    /// [`DataType::String`] so a column is never dropped.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();

        // MySQL reports display widths and modifiers, e.g. "int(11) unsigned"
        let s = s
            .trim_end_matches(" unsigned")
            .trim_end_matches(" zerofill")
            .to_string();

        if let Some(inner) = extract_parens(&s, "decimal")
            .or_else(|| extract_parens(&s, "numeric"))
        {
            return parse_decimal_params(&inner);
        }

        if let Some(inner) = extract_parens(&s, "varchar")
            .or_else(|| extract_parens(&s, "character varying"))
            .or_else(|| extract_parens(&s, "nvarchar"))
        {
            return parse_length_param(&inner).map(DataType::Varchar);
        }

        if let Some(inner) = extract_parens(&s, "char")
            .or_else(|| extract_parens(&s, "character"))
            .or_else(|| extract_parens(&s, "nchar"))
        {
            return parse_length_param(&inner).map(DataType::Char);
        }

        if s == "tinyint(1)" {
            return Some(DataType::Bool);
        }

        // Integer display widths carry no semantic meaning
        let base = match s.find('(') {
            Some(pos) if is_integer_name(s[..pos].trim()) => s[..pos].trim().to_string(),
            _ => s,
        };

        match base.as_str() {
            "bool" | "boolean" | "bit" => Some(DataType::Bool),

            "tinyint" => Some(DataType::Int8),
            "smallint" | "int2" | "smallserial" => Some(DataType::Int16),
            "int" | "integer" | "int4" | "mediumint" | "serial" => Some(DataType::Int32),
            "bigint" | "int8" | "bigserial" => Some(DataType::Int64),

            "real" | "float4" => Some(DataType::Float32),
            "double" | "float8" | "double precision" | "float" => Some(DataType::Float64),

            "decimal" | "numeric" | "number" => Some(DataType::Decimal(18, 2)),

            "text" | "clob" | "ntext" | "longtext" | "mediumtext" | "tinytext" => {
                Some(DataType::String)
            }
            "varchar" | "nvarchar" | "character varying" => Some(DataType::String),

            "date" => Some(DataType::Date),
            "time" | "time without time zone" => Some(DataType::Time),
            "timestamp" | "datetime" | "datetime2" | "timestamp without time zone" => {
                Some(DataType::Timestamp)
            }
            "timestamptz" | "timestamp with time zone" | "datetimeoffset" => {
                Some(DataType::TimestampTz)
            }

            "binary" | "blob" | "bytea" | "varbinary" | "image" | "longblob" => {
                Some(DataType::Binary)
            }

            "json" | "jsonb" => Some(DataType::Json),

            "uuid" | "guid" | "uniqueidentifier" => Some(DataType::Uuid),

            _ => None,
        }
    }
}

fn is_integer_name(name: &str) -> bool {
    matches!(
        name,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint"
    )
}

/// Extract content inside parentheses for a given type prefix.
/// e.g., extract_parens("decimal(10,2)", "decimal") returns Some("10,2")
fn extract_parens(s: &str, prefix: &str) -> Option<String> {
    let s = s.trim();
    let rest = s.strip_prefix(prefix)?.trim();
    if !rest.starts_with('(') || !rest.ends_with(')') {
        return None;
    }

    Some(rest[1..rest.len() - 1].to_string())
}

/// Parse decimal parameters "precision,scale" or "precision, scale".
fn parse_decimal_params(inner: &str) -> Option<DataType> {
    let parts: Vec<&str> = inner.split(',').map(|s| s.trim()).collect();
    match parts.as_slice() {
        [p] => Some(DataType::Decimal(p.parse().ok()?, 0)),
        [p, s] => Some(DataType::Decimal(p.parse().ok()?, s.parse().ok()?)),
        _ => None,
    }
}

/// Parse a single length parameter.
fn parse_length_param(inner: &str) -> Option<u16> {
    let inner = inner.trim();
    // T-SQL "max"
    if inner.eq_ignore_ascii_case("max") {
        return Some(u16::MAX);
    }
    inner.parse().ok()
}
