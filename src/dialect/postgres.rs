//! PostgreSQL dialect.
//!
//! PostgreSQL differences from the shared defaults:
//! - Double-quote identifier quoting
//! - Auto-increment through SERIAL/BIGSERIAL column types
//! - `$1, $2, ...` placeholders
//! - Index names are schema-scoped: `DROP INDEX IF EXISTS <name>`
//! - `ALTER TABLE ... ALTER COLUMN ... TYPE ...`
//! - Table inheritance with `INHERITS (...)`

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{base, helpers, Base, DbType, Dialect};
use crate::db::{Connection, DbResult, Value};
use crate::schema::{Column, DataType, Index, IndexKind, Table};
use crate::sql::filter::{Filter, IdFilter, QuoteFilter, SeqFilter};
use crate::sql::token::{Token, TokenStream};

const DEFAULT_SCHEMA: &str = "public";

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    helpers::reserved_set(&[
        "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH",
        "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_CATALOG",
        "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
        "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE",
        "FETCH", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY",
        "INTERSECT", "INTO", "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT",
        "NULL", "OFFSET", "ON", "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES",
        "RETURNING", "SELECT", "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO",
        "TRAILING", "TRUE", "UNION", "UNIQUE", "USER", "USING", "VARIADIC", "WHEN", "WHERE",
        "WINDOW", "WITH",
    ])
});

// CREATE [UNIQUE] INDEX name ON [ONLY] schema.table [USING method] (cols)
static INDEX_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^CREATE\s+(UNIQUE\s+)?INDEX\s+\S+\s+ON\s+.*?\((.*)\)\s*$")
        .expect("index definition pattern is valid")
});

/// PostgreSQL dialect.
#[derive(Debug, Clone, Default)]
pub struct Postgres {
    base: Base,
}

impl Postgres {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema(&self) -> Value {
        Value::from(DEFAULT_SCHEMA)
    }
}

impl Dialect for Postgres {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn db_type(&self) -> DbType {
        DbType::POSTGRES
    }

    fn quote_str(&self) -> &'static str {
        "\""
    }

    fn quote(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn is_reserved(&self, ident: &str) -> bool {
        helpers::is_reserved_in(&RESERVED, ident)
    }

    fn sql_type(&self, col: &Column) -> String {
        match &col.data_type {
            DataType::Int8 | DataType::Int16 | DataType::Int32 if col.is_auto_increment => {
                "SERIAL".into()
            }
            DataType::Int64 if col.is_auto_increment => "BIGSERIAL".into(),
            DataType::Bool => "BOOLEAN".into(),
            DataType::Int8 | DataType::Int16 => "SMALLINT".into(),
            DataType::Int32 => "INTEGER".into(),
            DataType::Int64 => "BIGINT".into(),
            DataType::Float32 => "REAL".into(),
            DataType::Float64 => "DOUBLE PRECISION".into(),
            DataType::Decimal(p, s) => format!("NUMERIC({},{})", p, s),
            DataType::String => "TEXT".into(),
            DataType::Char(n) => format!("CHAR({})", n),
            DataType::Varchar(n) if *n == u16::MAX => "TEXT".into(),
            DataType::Varchar(n) => format!("VARCHAR({})", n),
            DataType::Date => "DATE".into(),
            DataType::Time => "TIME".into(),
            DataType::Timestamp => "TIMESTAMP".into(),
            DataType::TimestampTz => "TIMESTAMPTZ".into(),
            DataType::Binary => "BYTEA".into(),
            DataType::Json => "JSONB".into(),
            DataType::Uuid => "UUID".into(),
        }
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("E'\\\\x{}'", &helpers::format_bytes_hex(bytes)[2..])
    }

    // Serial types carry the auto-increment.
    fn auto_incr_str(&self) -> &'static str {
        ""
    }

    fn supports_inherits(&self) -> bool {
        true
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> String {
        base::drop_index_standalone_sql(self, table_name, index)
    }

    fn modify_column_sql(&self, table_name: &str, col: &Column) -> String {
        let mut ts = TokenStream::new();
        ts.keywords([Token::Alter, Token::Table])
            .space()
            .push(Token::Ident(table_name.to_string()))
            .space()
            .keywords([Token::Alter, Token::Column])
            .space()
            .push(Token::Ident(col.name.clone()))
            .space()
            .push(Token::Raw("TYPE".into()))
            .space()
            .push(Token::Raw(self.sql_type(col)));
        ts.serialize(self)
    }

    fn table_check_sql(&self, table_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT tablename FROM pg_tables WHERE schemaname = ? AND tablename = ?".into(),
            vec![self.schema(), Value::from(table_name)],
        )
    }

    fn index_check_sql(&self, table_name: &str, index_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT indexname FROM pg_indexes WHERE schemaname = ? AND tablename = ? AND indexname = ?".into(),
            vec![self.schema(), Value::from(table_name), Value::from(index_name)],
        )
    }

    // Unquoted catalog identifiers are folded to lowercase, so the shared
    // INFORMATION_SCHEMA query cannot be requoted here.
    fn is_column_exist(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
        col_name: &str,
    ) -> DbResult<bool> {
        let sql = "SELECT column_name FROM information_schema.columns \
                   WHERE table_schema = ? AND table_name = ? AND column_name = ?";
        let args = [self.schema(), Value::from(table_name), Value::from(col_name)];
        base::has_records(self, conn, sql, &args)
    }

    fn get_columns(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<Vec<Column>> {
        let sql = "SELECT column_name, column_default, is_nullable, data_type, \
                   character_maximum_length, numeric_precision, numeric_scale \
                   FROM information_schema.columns WHERE table_schema = ? AND table_name = ? \
                   ORDER BY ordinal_position";
        let rows = base::query(self, conn, sql, &[self.schema(), Value::from(table_name)])?;

        let pk_sql = "SELECT kcu.column_name FROM information_schema.table_constraints tc \
                      JOIN information_schema.key_column_usage kcu \
                      ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
                      WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = ? AND tc.table_name = ? \
                      ORDER BY kcu.ordinal_position";
        let pk_rows = base::query(self, conn, pk_sql, &[self.schema(), Value::from(table_name)])?;
        let mut pks = Vec::with_capacity(pk_rows.len());
        for row in pk_rows.iter() {
            pks.extend(row.get_string("column_name")?);
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let name = row.get_string("column_name")?.unwrap_or_default();
            let data_type = row.get_string("data_type")?.unwrap_or_default();
            let data_type = match data_type.as_str() {
                "character varying" | "character" => {
                    let len = row.require("character_maximum_length")?.as_i64();
                    match (data_type.as_str(), len) {
                        ("character varying", Some(n)) => helpers::sized_char_type(n, false),
                        ("character", Some(n)) => helpers::sized_char_type(n, true),
                        _ => DataType::String,
                    }
                }
                "numeric" => {
                    let p = row.require("numeric_precision")?.as_i64();
                    let s = row.require("numeric_scale")?.as_i64();
                    match (p, s) {
                        (Some(p), Some(s)) => helpers::decimal_type(p, s),
                        _ => DataType::Decimal(18, 2),
                    }
                }
                other => DataType::parse(other).unwrap_or(DataType::String),
            };

            let mut col = Column::new(name, data_type);
            col.nullable = row.require("is_nullable")?.as_bool().unwrap_or(true);
            col.default = row.get_string("column_default")?;
            if col
                .default
                .as_deref()
                .is_some_and(|d| d.starts_with("nextval("))
            {
                col.is_auto_increment = true;
                col.default = None;
            }
            col.is_primary_key = pks.contains(&col.name);
            columns.push(col);
        }
        Ok(columns)
    }

    fn get_tables(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>> {
        let sql = "SELECT tablename FROM pg_tables WHERE schemaname = ? ORDER BY tablename";
        let rows = base::query(self, conn, sql, &[self.schema()])?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            tables.push(Table::new(row.get_string("tablename")?.unwrap_or_default()));
        }
        Ok(tables)
    }

    fn get_indexes(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> DbResult<BTreeMap<String, Index>> {
        let sql = "SELECT indexname, indexdef FROM pg_indexes WHERE schemaname = ? AND tablename = ?";
        let rows = base::query(self, conn, sql, &[self.schema(), Value::from(table_name)])?;

        let mut indexes = BTreeMap::new();
        for row in rows.iter() {
            let stored = row.get_string("indexname")?.unwrap_or_default();
            if stored.ends_with("_pkey") {
                continue;
            }
            let def = row.get_string("indexdef")?.unwrap_or_default();
            let Some(caps) = INDEX_DEF.captures(&def) else {
                continue;
            };

            let kind = if caps.get(1).is_some() {
                IndexKind::Unique
            } else {
                IndexKind::Index
            };
            let (name, regular) = Index::split_storage_name(&stored, table_name);
            let mut index = if regular {
                Index::new_regular(name, kind)
            } else {
                Index::new_named(name, kind)
            };
            for col in helpers::split_index_columns(&caps[2]) {
                index.add_column(col);
            }
            indexes.insert(index.name.clone(), index);
        }
        Ok(indexes)
    }

    fn filters(&self) -> Vec<Box<dyn Filter>> {
        vec![
            Box::new(IdFilter),
            Box::new(QuoteFilter),
            Box::new(SeqFilter { prefix: "$", start: 1 }),
        ]
    }
}
