//! SQLite dialect.
//!
//! SQLite has type affinity rather than strict types, so the mapping is
//! coarse: every integer is INTEGER, every string TEXT. Catalog data comes
//! from `sqlite_master` and `PRAGMA table_info`.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{base, helpers, Base, DbType, Dialect};
use crate::db::{Connection, DbResult, Value};
use crate::schema::{Column, DataType, Index, IndexKind, Table};

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    helpers::reserved_set(&[
        "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC",
        "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
        "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
        "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT", "DEFERRABLE",
        "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DROP", "EACH", "ELSE", "END",
        "ESCAPE", "EXCEPT", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL", "FOR", "FOREIGN", "FROM",
        "FULL", "GLOB", "GROUP", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
        "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
        "KEY", "LEFT", "LIKE", "LIMIT", "MATCH", "NATURAL", "NO", "NOT", "NOTNULL", "NULL", "OF",
        "OFFSET", "ON", "OR", "ORDER", "OUTER", "PLAN", "PRAGMA", "PRIMARY", "QUERY", "RAISE",
        "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
        "RESTRICT", "RIGHT", "ROLLBACK", "ROW", "SAVEPOINT", "SELECT", "SET", "TABLE", "TEMP",
        "TEMPORARY", "THEN", "TO", "TRANSACTION", "TRIGGER", "UNION", "UNIQUE", "UPDATE", "USING",
        "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN", "WHERE", "WITH", "WITHOUT",
    ])
});

static INDEX_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE\s+(UNIQUE\s+)?INDEX\s+.*?\((.*)\)\s*;?\s*$")
        .expect("index definition pattern is valid")
});

/// SQLite dialect.
#[derive(Debug, Clone, Default)]
pub struct Sqlite {
    base: Base,
}

impl Sqlite {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for Sqlite {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn db_type(&self) -> DbType {
        DbType::SQLITE
    }

    fn quote_str(&self) -> &'static str {
        "`"
    }

    fn quote(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn is_reserved(&self, ident: &str) -> bool {
        helpers::is_reserved_in(&RESERVED, ident)
    }

    fn sql_type(&self, col: &Column) -> String {
        match &col.data_type {
            DataType::Bool
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64 => "INTEGER".into(),
            DataType::Float32 | DataType::Float64 => "REAL".into(),
            DataType::Decimal(_, _) => "NUMERIC".into(),
            DataType::String | DataType::Char(_) | DataType::Varchar(_) => "TEXT".into(),
            DataType::Date => "DATE".into(),
            DataType::Time => "TIME".into(),
            DataType::Timestamp | DataType::TimestampTz => "DATETIME".into(),
            DataType::Binary => "BLOB".into(),
            DataType::Json | DataType::Uuid => "TEXT".into(),
        }
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("X'{}'", &helpers::format_bytes_hex(bytes)[2..])
    }

    fn auto_incr_str(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> String {
        base::drop_index_standalone_sql(self, table_name, index)
    }

    // No row locks: the whole database is locked by the writer.
    fn for_update_sql(&self, query: &str) -> String {
        query.to_string()
    }

    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        helpers::limit_offset_with_unbounded(self, limit, offset, "-1")
    }

    fn table_check_sql(&self, table_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?".into(),
            vec![Value::from(table_name)],
        )
    }

    fn index_check_sql(&self, _table_name: &str, index_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?".into(),
            vec![Value::from(index_name)],
        )
    }

    fn is_column_exist(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
        col_name: &str,
    ) -> DbResult<bool> {
        let sql = format!("PRAGMA table_info({})", self.quote(table_name));
        let rows = base::query(self, conn, &sql, &[])?;
        for row in rows.iter() {
            if let Some(name) = row.get_string("name")? {
                if name.eq_ignore_ascii_case(col_name) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn get_columns(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<Vec<Column>> {
        let create_sql = base::query(
            self,
            conn,
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[Value::from(table_name)],
        )?;
        let has_autoincrement = match create_sql.first() {
            Some(row) => row
                .get_string("sql")?
                .is_some_and(|s| s.to_uppercase().contains("AUTOINCREMENT")),
            None => false,
        };

        let sql = format!("PRAGMA table_info({})", self.quote(table_name));
        let rows = base::query(self, conn, &sql, &[])?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let name = row.get_string("name")?.unwrap_or_default();
            let col_type = row.get_string("type")?.unwrap_or_default();
            let data_type = match col_type.to_uppercase().as_str() {
                // INTEGER PRIMARY KEY is a rowid alias; keep it 64-bit
                "INTEGER" => DataType::Int64,
                "" => DataType::String,
                _ => DataType::parse(&col_type).unwrap_or(DataType::String),
            };

            let mut col = Column::new(name, data_type);
            col.nullable = !row.require("notnull")?.as_bool().unwrap_or(false);
            col.default = row.get_string("dflt_value")?;
            let pk = row.require("pk")?.as_i64().unwrap_or(0);
            if pk > 0 {
                col.is_primary_key = true;
                col.nullable = false;
                col.is_auto_increment = has_autoincrement;
            }
            columns.push(col);
        }

        // A composite key cannot be an AUTOINCREMENT rowid alias.
        if columns.iter().filter(|c| c.is_primary_key).count() > 1 {
            for col in &mut columns {
                col.is_auto_increment = false;
            }
        }
        Ok(columns)
    }

    fn get_tables(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>> {
        let sql = "SELECT name FROM sqlite_master WHERE type = 'table' \
                   AND name NOT LIKE 'sqlite_%' ORDER BY name";
        let rows = base::query(self, conn, sql, &[])?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            tables.push(Table::new(row.get_string("name")?.unwrap_or_default()));
        }
        Ok(tables)
    }

    fn get_indexes(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> DbResult<BTreeMap<String, Index>> {
        let sql = "SELECT name, sql FROM sqlite_master WHERE type = 'index' AND tbl_name = ?";
        let rows = base::query(self, conn, sql, &[Value::from(table_name)])?;

        let mut indexes = BTreeMap::new();
        for row in rows.iter() {
            // Automatic indexes (primary keys, UNIQUE constraints) have no SQL
            let Some(def) = row.get_string("sql")? else {
                continue;
            };
            let Some(caps) = INDEX_DEF.captures(&def) else {
                continue;
            };
            let stored = row.get_string("name")?.unwrap_or_default();

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
}
