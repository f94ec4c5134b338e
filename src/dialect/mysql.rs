//! MySQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1)
//! - `ENGINE=` and `DEFAULT CHARSET` table options
//! - `DROP INDEX ... ON <table>` (index names are table-scoped)
//! - `ALTER TABLE ... MODIFY COLUMN`
//! - OFFSET requires a LIMIT

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;

use super::{base, helpers, Base, DbType, Dialect};
use crate::db::{Connection, DbResult, Value};
use crate::schema::{Column, DataType, Index, Table};

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    helpers::reserved_set(&[
        "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "BETWEEN", "BIGINT", "BINARY",
        "BLOB", "BOTH", "BY", "CASCADE", "CASE", "CHANGE", "CHAR", "CHARACTER", "CHECK",
        "COLLATE", "COLUMN", "CONSTRAINT", "CONVERT", "CREATE", "CROSS", "CURRENT_DATE",
        "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DATABASE", "DATABASES", "DEC",
        "DECIMAL", "DEFAULT", "DELETE", "DESC", "DESCRIBE", "DISTINCT", "DIV", "DOUBLE", "DROP",
        "ELSE", "EXISTS", "EXPLAIN", "FALSE", "FLOAT", "FOR", "FOREIGN", "FROM", "FULLTEXT",
        "GRANT", "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IN", "INDEX", "INNER", "INSERT",
        "INT", "INTEGER", "INTERVAL", "INTO", "IS", "JOIN", "KEY", "KEYS", "KILL", "LEFT",
        "LIKE", "LIMIT", "LOCK", "LONG", "MATCH", "MOD", "NATURAL", "NOT", "NULL", "NUMERIC",
        "ON", "OPTION", "OR", "ORDER", "OUTER", "PRIMARY", "PROCEDURE", "RANGE", "RANK", "READ",
        "REFERENCES", "REGEXP", "RENAME", "REPLACE", "RIGHT", "ROW", "ROWS", "SCHEMA", "SELECT",
        "SET", "SHOW", "SMALLINT", "SQL", "TABLE", "THEN", "TINYINT", "TO", "TRIGGER", "TRUE",
        "UNION", "UNIQUE", "UNSIGNED", "UPDATE", "USAGE", "USE", "USING", "VALUES", "VARCHAR",
        "WHEN", "WHERE", "WITH", "WRITE",
    ])
});

/// MySQL dialect.
#[derive(Debug, Clone, Default)]
pub struct MySql {
    base: Base,
}

impl MySql {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialect for MySql {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn db_type(&self) -> DbType {
        DbType::MYSQL
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
            DataType::Bool => "TINYINT(1)".into(),
            DataType::Int8 => "TINYINT".into(),
            DataType::Int16 => "SMALLINT".into(),
            DataType::Int32 => "INT".into(),
            DataType::Int64 => "BIGINT".into(),
            DataType::Float32 => "FLOAT".into(),
            DataType::Float64 => "DOUBLE".into(),
            DataType::Decimal(p, s) => format!("DECIMAL({},{})", p, s),
            DataType::String => "TEXT".into(),
            DataType::Char(n) => format!("CHAR({})", n),
            DataType::Varchar(n) if *n == u16::MAX => "LONGTEXT".into(),
            DataType::Varchar(n) => format!("VARCHAR({})", n),
            DataType::Date => "DATE".into(),
            DataType::Time => "TIME".into(),
            DataType::Timestamp => "DATETIME".into(),
            DataType::TimestampTz => "TIMESTAMP".into(),
            DataType::Binary => "BLOB".into(),
            DataType::Json => "JSON".into(),
            DataType::Uuid => "CHAR(36)".into(),
        }
    }

    fn auto_incr_str(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn supports_engine(&self) -> bool {
        true
    }

    fn supports_charset(&self) -> bool {
        true
    }

    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        helpers::limit_offset_with_unbounded(self, limit, offset, "18446744073709551615")
    }

    fn table_check_sql(&self, table_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT `TABLE_NAME` FROM `INFORMATION_SCHEMA`.`TABLES` WHERE `TABLE_SCHEMA` = ? AND `TABLE_NAME` = ?".into(),
            vec![Value::from(self.uri().db_name.as_str()), Value::from(table_name)],
        )
    }

    fn index_check_sql(&self, table_name: &str, index_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT `INDEX_NAME` FROM `INFORMATION_SCHEMA`.`STATISTICS` WHERE `TABLE_SCHEMA` = ? AND `TABLE_NAME` = ? AND `INDEX_NAME` = ?".into(),
            vec![
                Value::from(self.uri().db_name.as_str()),
                Value::from(table_name),
                Value::from(index_name),
            ],
        )
    }

    fn get_columns(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<Vec<Column>> {
        let sql = "SELECT `COLUMN_NAME`, `IS_NULLABLE`, `COLUMN_DEFAULT`, `COLUMN_TYPE`, `COLUMN_KEY`, `EXTRA` \
                   FROM `INFORMATION_SCHEMA`.`COLUMNS` WHERE `TABLE_SCHEMA` = ? AND `TABLE_NAME` = ? \
                   ORDER BY `ORDINAL_POSITION`";
        let args = [
            Value::from(self.uri().db_name.as_str()),
            Value::from(table_name),
        ];
        let rows = base::query(self, conn, sql, &args)?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let name = row.get_string("COLUMN_NAME")?.unwrap_or_default();
            let col_type = row.get_string("COLUMN_TYPE")?.unwrap_or_default();
            let mut col = Column::new(name, DataType::parse(&col_type).unwrap_or(DataType::String));
            col.nullable = row.require("IS_NULLABLE")?.as_bool().unwrap_or(true);
            col.default = row.get_string("COLUMN_DEFAULT")?;

            if row.get_string("COLUMN_KEY")?.as_deref() == Some("PRI") {
                col.is_primary_key = true;
            }
            let extra = row.get_string("EXTRA")?.unwrap_or_default();
            if extra.to_lowercase().contains("auto_increment") {
                col.is_auto_increment = true;
            }
            columns.push(col);
        }
        Ok(columns)
    }

    fn get_tables(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>> {
        let sql = "SELECT `TABLE_NAME`, `ENGINE` FROM `INFORMATION_SCHEMA`.`TABLES` \
                   WHERE `TABLE_SCHEMA` = ? AND `TABLE_TYPE` = 'BASE TABLE' ORDER BY `TABLE_NAME`";
        let rows = base::query(self, conn, sql, &[Value::from(self.uri().db_name.as_str())])?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let mut table = Table::new(row.get_string("TABLE_NAME")?.unwrap_or_default());
            table.store_engine = row.get_string("ENGINE")?;
            tables.push(table);
        }
        Ok(tables)
    }

    fn get_indexes(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> DbResult<BTreeMap<String, Index>> {
        let sql = "SELECT `INDEX_NAME`, `NON_UNIQUE`, `COLUMN_NAME` FROM `INFORMATION_SCHEMA`.`STATISTICS` \
                   WHERE `TABLE_SCHEMA` = ? AND `TABLE_NAME` = ? ORDER BY `INDEX_NAME`, `SEQ_IN_INDEX`";
        let args = [
            Value::from(self.uri().db_name.as_str()),
            Value::from(table_name),
        ];
        let rows = base::query(self, conn, sql, &args)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let name = row.get_string("INDEX_NAME")?.unwrap_or_default();
            if name == "PRIMARY" {
                continue;
            }
            let non_unique = row.require("NON_UNIQUE")?.as_bool().unwrap_or(true);
            let column = row.get_string("COLUMN_NAME")?.unwrap_or_default();
            entries.push((name, !non_unique, column));
        }
        Ok(helpers::collect_indexes(table_name, entries))
    }
}
