//! SQL Server dialect.
//!
//! SQL Server differences from the shared defaults:
//! - Bracket identifier quoting (`[name]`)
//! - No `CREATE TABLE IF NOT EXISTS`: creation is guarded by a `sys.tables` lookup
//! - `IDENTITY(1,1)` auto-increment
//! - `@p1, @p2, ...` placeholders
//! - Pagination with `OFFSET ... ROWS FETCH NEXT ... ROWS ONLY`
//! - No `SELECT ... FOR UPDATE`

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;

use super::{base, helpers, Base, DbType, Dialect};
use crate::db::{Connection, DbResult, Value};
use crate::schema::{Column, DataType, Index, Table};
use crate::sql::filter::{Filter, IdFilter, QuoteFilter, SeqFilter};
use crate::sql::token::{Token, TokenStream};

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    helpers::reserved_set(&[
        "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUTHORIZATION", "BACKUP", "BEGIN",
        "BETWEEN", "BREAK", "BROWSE", "BULK", "BY", "CASCADE", "CASE", "CHECK", "CHECKPOINT",
        "CLOSE", "CLUSTERED", "COALESCE", "COLLATE", "COLUMN", "COMMIT", "COMPUTE", "CONSTRAINT",
        "CONTAINS", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE",
        "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE", "DBCC",
        "DEALLOCATE", "DECLARE", "DEFAULT", "DELETE", "DENY", "DESC", "DISTINCT", "DISTRIBUTED",
        "DOUBLE", "DROP", "ELSE", "END", "ERRLVL", "ESCAPE", "EXCEPT", "EXEC", "EXECUTE",
        "EXISTS", "EXIT", "FETCH", "FILE", "FOR", "FOREIGN", "FROM", "FULL", "FUNCTION", "GOTO",
        "GRANT", "GROUP", "HAVING", "HOLDLOCK", "IDENTITY", "IF", "IN", "INDEX", "INNER",
        "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "KILL", "LEFT", "LIKE", "MERGE",
        "NATIONAL", "NOCHECK", "NONCLUSTERED", "NOT", "NULL", "NULLIF", "OF", "OFF", "OFFSETS",
        "ON", "OPEN", "OPTION", "OR", "ORDER", "OUTER", "OVER", "PERCENT", "PIVOT", "PLAN",
        "PRIMARY", "PRINT", "PROC", "PROCEDURE", "PUBLIC", "RAISERROR", "READ", "REFERENCES",
        "REPLICATION", "RESTORE", "RETURN", "REVERT", "REVOKE", "RIGHT", "ROLLBACK", "ROWCOUNT",
        "RULE", "SAVE", "SCHEMA", "SELECT", "SESSION_USER", "SET", "SHUTDOWN", "SOME",
        "STATISTICS", "SYSTEM_USER", "TABLE", "THEN", "TO", "TOP", "TRAN", "TRANSACTION",
        "TRIGGER", "TRUNCATE", "UNION", "UNIQUE", "UNPIVOT", "UPDATE", "USE", "USER", "VALUES",
        "VARYING", "VIEW", "WAITFOR", "WHEN", "WHERE", "WHILE", "WITH",
    ])
});

/// SQL Server dialect.
#[derive(Debug, Clone, Default)]
pub struct MsSql {
    base: Base,
}

impl MsSql {
    pub fn new() -> Self {
        Self::default()
    }

    fn catalog(&self) -> Value {
        Value::from(self.uri().db_name.as_str())
    }
}

impl Dialect for MsSql {
    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn db_type(&self) -> DbType {
        DbType::MSSQL
    }

    fn quote_str(&self) -> &'static str {
        "["
    }

    fn quote(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn is_reserved(&self, ident: &str) -> bool {
        helpers::is_reserved_in(&RESERVED, ident)
    }

    fn sql_type(&self, col: &Column) -> String {
        match &col.data_type {
            DataType::Bool => "BIT".into(),
            DataType::Int8 => "TINYINT".into(),
            DataType::Int16 => "SMALLINT".into(),
            DataType::Int32 => "INT".into(),
            DataType::Int64 => "BIGINT".into(),
            DataType::Float32 => "REAL".into(),
            DataType::Float64 => "FLOAT".into(),
            DataType::Decimal(p, s) => format!("DECIMAL({},{})", p, s),
            DataType::String => "NVARCHAR(MAX)".into(),
            DataType::Char(n) => format!("NCHAR({})", n),
            // NVARCHAR tops out at 4000 before MAX
            DataType::Varchar(n) if *n > 4000 => "NVARCHAR(MAX)".into(),
            DataType::Varchar(n) => format!("NVARCHAR({})", n),
            DataType::Date => "DATE".into(),
            DataType::Time => "TIME".into(),
            DataType::Timestamp => "DATETIME2".into(),
            DataType::TimestampTz => "DATETIMEOFFSET".into(),
            DataType::Binary => "VARBINARY(MAX)".into(),
            DataType::Json => "NVARCHAR(MAX)".into(),
            DataType::Uuid => "UNIQUEIDENTIFIER".into(),
        }
    }

    fn auto_incr_str(&self) -> &'static str {
        "IDENTITY(1,1)"
    }

    fn supports_if_not_exists(&self) -> bool {
        false
    }

    /// `IF NOT EXISTS (SELECT [name] FROM sys.tables WHERE [name] = '<t>') CREATE TABLE ...`
    fn create_table_sql(
        &self,
        table: &Table,
        table_name: &str,
        store_engine: &str,
        charset: &str,
    ) -> String {
        let name = if table_name.is_empty() {
            table.name.as_str()
        } else {
            table_name
        };

        let mut ts = TokenStream::new();
        ts.keywords([Token::If, Token::Not, Token::Exists])
            .space()
            .lparen()
            .push(Token::Select)
            .space()
            .push(Token::Ident("name".into()))
            .space()
            .push(Token::From)
            .space()
            .push(Token::Raw("sys.tables".into()))
            .space()
            .push(Token::Where)
            .space()
            .push(Token::Ident("name".into()))
            .space()
            .push(Token::Eq)
            .space()
            .push(Token::LitString(name.to_string()))
            .rparen()
            .space();

        let guard = ts.serialize(self);
        let create = base::create_table_sql(self, table, table_name, store_engine, charset);
        format!("{}{}", guard, create)
    }

    fn modify_column_sql(&self, table_name: &str, col: &Column) -> String {
        let mut ts = TokenStream::new();
        ts.keywords([Token::Alter, Token::Table])
            .space()
            .push(Token::Ident(table_name.to_string()))
            .space()
            .keywords([Token::Alter, Token::Column])
            .space()
            .append(&base::column_tokens(self, col, false));
        ts.serialize(self)
    }

    // Row locks are table hints in SQL Server, not a trailing clause.
    fn for_update_sql(&self, query: &str) -> String {
        query.to_string()
    }

    fn requires_order_by_for_limit(&self) -> bool {
        true
    }

    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        helpers::limit_offset_fetch(self, limit, offset)
    }

    fn table_check_sql(&self, table_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT `name` FROM sys.tables WHERE `name` = ?".into(),
            vec![Value::from(table_name)],
        )
    }

    fn index_check_sql(&self, table_name: &str, index_name: &str) -> (String, Vec<Value>) {
        (
            "SELECT i.`name` FROM sys.indexes i JOIN sys.tables t ON i.object_id = t.object_id \
             WHERE t.`name` = ? AND i.`name` = ?"
                .into(),
            vec![Value::from(table_name), Value::from(index_name)],
        )
    }

    fn is_column_exist(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
        col_name: &str,
    ) -> DbResult<bool> {
        let sql = "SELECT `COLUMN_NAME` FROM `INFORMATION_SCHEMA`.`COLUMNS` \
                   WHERE `TABLE_CATALOG` = ? AND `TABLE_NAME` = ? AND `COLUMN_NAME` = ?";
        let args = [self.catalog(), Value::from(table_name), Value::from(col_name)];
        base::has_records(self, conn, sql, &args)
    }

    fn get_columns(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<Vec<Column>> {
        let sql = "SELECT c.`name` AS name, ty.`name` AS type_name, c.max_length, c.`precision`, \
                   c.scale, c.is_nullable, c.is_identity, dc.definition AS default_value, \
                   CASE WHEN pk.column_id IS NULL THEN 0 ELSE 1 END AS is_pk \
                   FROM sys.columns c \
                   JOIN sys.tables t ON c.object_id = t.object_id \
                   JOIN sys.types ty ON c.user_type_id = ty.user_type_id \
                   LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id \
                   LEFT JOIN (SELECT ic.object_id, ic.column_id FROM sys.index_columns ic \
                   JOIN sys.indexes i ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
                   WHERE i.is_primary_key = 1) pk \
                   ON pk.object_id = c.object_id AND pk.column_id = c.column_id \
                   WHERE t.`name` = ? ORDER BY c.column_id";
        let rows = base::query(self, conn, sql, &[Value::from(table_name)])?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let name = row.get_string("name")?.unwrap_or_default();
            let type_name = row.get_string("type_name")?.unwrap_or_default().to_lowercase();
            // max_length is in bytes; N-types use two per character, -1 is MAX
            let max_length = row.require("max_length")?.as_i64().unwrap_or(0);
            let chars = match type_name.as_str() {
                "nvarchar" | "nchar" if max_length > 0 => max_length / 2,
                _ => max_length,
            };
            let data_type = match type_name.as_str() {
                "nvarchar" | "varchar" => helpers::sized_char_type(chars, false),
                "nchar" | "char" => helpers::sized_char_type(chars.max(1), true),
                "decimal" | "numeric" => {
                    let p = row.require("precision")?.as_i64().unwrap_or(18);
                    let s = row.require("scale")?.as_i64().unwrap_or(2);
                    helpers::decimal_type(p, s)
                }
                other => DataType::parse(other).unwrap_or(DataType::String),
            };

            let mut col = Column::new(name, data_type);
            col.nullable = row.require("is_nullable")?.as_bool().unwrap_or(true);
            col.default = row.get_string("default_value")?;
            col.is_auto_increment = row.require("is_identity")?.as_bool().unwrap_or(false);
            col.is_primary_key = row.require("is_pk")?.as_bool().unwrap_or(false);
            columns.push(col);
        }
        Ok(columns)
    }

    fn get_tables(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>> {
        let sql = "SELECT `name` FROM sys.tables WHERE is_ms_shipped = 0 ORDER BY `name`";
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
        let sql = "SELECT i.`name` AS index_name, i.is_unique, c.`name` AS column_name \
                   FROM sys.indexes i \
                   JOIN sys.tables t ON i.object_id = t.object_id \
                   JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                   JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
                   WHERE t.`name` = ? AND i.is_primary_key = 0 AND i.`name` IS NOT NULL \
                   ORDER BY i.`name`, ic.key_ordinal";
        let rows = base::query(self, conn, sql, &[Value::from(table_name)])?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let name = row.get_string("index_name")?.unwrap_or_default();
            let unique = row.require("is_unique")?.as_bool().unwrap_or(false);
            let column = row.get_string("column_name")?.unwrap_or_default();
            entries.push((name, unique, column));
        }
        Ok(helpers::collect_indexes(table_name, entries))
    }

    fn filters(&self) -> Vec<Box<dyn Filter>> {
        vec![
            Box::new(IdFilter),
            Box::new(QuoteFilter),
            Box::new(SeqFilter {
                prefix: "@p",
                start: 1,
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexKind;

    #[test]
    fn test_guarded_create_table() {
        let d = MsSql::new();
        let table = Table::new("user")
            .column(Column::new("id", DataType::Int64).primary_key().auto_increment())
            .unwrap()
            .column(Column::new("name", DataType::Varchar(64)))
            .unwrap();
        assert_eq!(
            d.create_table_sql(&table, "", "InnoDB", "utf8"),
            "IF NOT EXISTS (SELECT [name] FROM sys.tables WHERE [name] = 'user') \
             CREATE TABLE [user] ([id] BIGINT NOT NULL PRIMARY KEY IDENTITY(1,1), [name] NVARCHAR(64) NULL)"
        );
    }

    #[test]
    fn test_guard_escapes_table_name() {
        let d = MsSql::new();
        let sql = d.create_table_sql(&Table::new("o'brien"), "", "", "");
        assert!(sql.starts_with("IF NOT EXISTS (SELECT [name] FROM sys.tables WHERE [name] = 'o''brien')"));
    }

    #[test]
    fn test_alter_column() {
        let d = MsSql::new();
        let col = Column::new("name", DataType::Varchar(128)).not_null();
        assert_eq!(
            d.modify_column_sql("user", &col),
            "ALTER TABLE [user] ALTER COLUMN [name] NVARCHAR(128) NOT NULL"
        );
    }

    #[test]
    fn test_offset_fetch() {
        let d = MsSql::new();
        assert_eq!(d.limit_sql(Some(10), Some(20)), "OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY");
        assert_eq!(d.limit_sql(None, Some(5)), "OFFSET 5 ROWS");
        assert_eq!(d.limit_sql(None, None), "");
    }

    #[test]
    fn test_filters() {
        let d = MsSql::new();
        assert_eq!(
            d.filter_sql("SELECT `name` FROM sys.tables WHERE `name` = ? AND x = '?' AND y = ?", None),
            "SELECT [name] FROM sys.tables WHERE [name] = @p1 AND x = '?' AND y = @p2"
        );
    }

    #[test]
    fn test_drop_index_on_table() {
        let d = MsSql::new();
        let idx = Index::new_named("by_name", IndexKind::Index).column("name");
        assert_eq!(d.drop_index_sql("user", &idx), "DROP INDEX [by_name] ON [user]");
    }

    #[test]
    fn test_quote_escapes_bracket() {
        let d = MsSql::new();
        assert_eq!(d.quote("a]b"), "[a]]b]");
        assert_eq!(d.quote(&d.quote("x")), "[[x]]]");
    }
}
