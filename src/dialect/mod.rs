//! Database dialects.
//!
//! Every backend implements [`Dialect`]: quoting, type mapping, capability
//! flags, DDL generation and schema introspection. DDL generation has shared
//! default implementations in [`base`]; a backend overrides only what differs.
//!
//! | Capability | MySQL | PostgreSQL | SQLite | SQL Server |
//! |------------|-------|------------|--------|------------|
//! | Identifier quote | `` ` `` | `"` | `` ` `` | `[]` |
//! | ENGINE clause | ✓ | ❌ | ❌ | ❌ |
//! | DEFAULT CHARSET | ✓ | ❌ | ❌ | ❌ |
//! | Multi-row INSERT | ✓ | ✓ | ✓ | ✓ |
//! | CREATE TABLE IF NOT EXISTS | ✓ | ✓ | ✓ | guarded |
//! | DROP ... IF EXISTS | ✓ | ✓ | ✓ | ✓ |
//! | INHERITS | ❌ | ✓ | ❌ | ❌ |
//! | Placeholders | `?` | `$1` | `?` | `@p1` |
//!
//! SQL-producing methods never touch the database and cannot fail. Only the
//! introspection methods take a [`Connection`] and return [`DbResult`].
//!
//! # Usage
//!
//! ```
//! use dialectic::dialect::{Dialect, DialectRegistry, DbType};
//! use dialectic::schema::{Column, DataType, Table};
//!
//! let registry = DialectRegistry::with_builtin();
//! let dialect = registry.query_dialect(&DbType::POSTGRES).unwrap();
//!
//! let table = Table::new("user")
//!     .column(Column::new("id", DataType::Int64).primary_key().auto_increment())
//!     .unwrap();
//! assert_eq!(
//!     dialect.create_table_sql(&table, "", "", ""),
//!     r#"CREATE TABLE IF NOT EXISTS "user" ("id" BIGSERIAL NOT NULL PRIMARY KEY)"#
//! );
//! ```

pub mod base;
pub mod helpers;
mod mssql;
mod mysql;
mod postgres;
mod registry;
mod sqlite;

pub use mssql::MsSql;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use registry::{ctor, DialectCtor, DialectRegistry};
pub use sqlite::Sqlite;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::Uri;
use crate::db::{Connection, DbResult, Value};
use crate::schema::{Column, Index, Table};
use crate::sql::filter::{Filter, IdFilter};

/// Backend tag, e.g. `mysql`. Open-ended so plugins can add their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbType(Cow<'static, str>);

impl DbType {
    pub const MYSQL: DbType = DbType(Cow::Borrowed("mysql"));
    pub const POSTGRES: DbType = DbType(Cow::Borrowed("postgres"));
    pub const SQLITE: DbType = DbType(Cow::Borrowed("sqlite"));
    pub const MSSQL: DbType = DbType(Cow::Borrowed("mssql"));

    pub fn new(name: impl Into<String>) -> Self {
        DbType(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map a URI scheme, accepting the usual aliases.
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.to_lowercase().as_str() {
            "mysql" => DbType::MYSQL,
            "postgres" | "postgresql" | "pg" => DbType::POSTGRES,
            "sqlite" | "sqlite3" | "file" => DbType::SQLITE,
            "mssql" | "sqlserver" => DbType::MSSQL,
            other => DbType::new(other),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DbType {
    fn from(s: &str) -> Self {
        DbType::new(s)
    }
}

/// Connection-level state every dialect carries after [`Dialect::init`].
#[derive(Debug, Clone, Default)]
pub struct Base {
    uri: Uri,
    driver_name: String,
    data_source_name: String,
}

/// Backend-specific SQL generation, quoting, type mapping and introspection.
///
/// Defaults follow the shared algorithms in [`base`]. Implementations must be
/// `Send + Sync`: after startup they are only read.
pub trait Dialect: fmt::Debug + Send + Sync {
    fn base(&self) -> &Base;
    fn base_mut(&mut self) -> &mut Base;

    fn db_type(&self) -> DbType;

    fn init(&mut self, uri: Uri, driver_name: &str, data_source_name: &str) {
        let base = self.base_mut();
        base.uri = uri;
        base.driver_name = driver_name.to_string();
        base.data_source_name = data_source_name.to_string();
    }

    fn uri(&self) -> &Uri {
        &self.base().uri
    }

    fn driver_name(&self) -> &str {
        &self.base().driver_name
    }

    fn data_source_name(&self) -> &str {
        &self.base().data_source_name
    }

    // =========================================================================
    // Quoting
    // =========================================================================

    /// The opening identifier quote.
    fn quote_str(&self) -> &'static str;

    /// Quote an identifier unconditionally.
    fn quote(&self, ident: &str) -> String;

    fn is_reserved(&self, _ident: &str) -> bool {
        false
    }

    /// Quote only when needed: reserved words and identifiers that are not
    /// plain `[A-Za-z_][A-Za-z0-9_]*`.
    fn checked_quote(&self, ident: &str) -> String {
        if self.is_reserved(ident) || !helpers::is_plain_identifier(ident) {
            self.quote(ident)
        } else {
            ident.to_string()
        }
    }

    // =========================================================================
    // Types and literals
    // =========================================================================

    /// Native type keyword for a column. Total over [`DataType`](crate::schema::DataType).
    fn sql_type(&self, col: &Column) -> String;

    fn format_bytes(&self, bytes: &[u8]) -> String {
        helpers::format_bytes_hex(bytes)
    }

    fn and_str(&self) -> &'static str {
        "AND"
    }

    fn or_str(&self) -> &'static str {
        "OR"
    }

    fn eq_str(&self) -> &'static str {
        "="
    }

    fn roll_back_str(&self) -> &'static str {
        "ROLLBACK"
    }

    /// Keyword appended to an inline auto-increment primary key; may be empty.
    fn auto_incr_str(&self) -> &'static str;

    // =========================================================================
    // Capabilities
    // =========================================================================

    fn supports_insert_many(&self) -> bool {
        true
    }

    fn supports_engine(&self) -> bool {
        false
    }

    fn supports_charset(&self) -> bool {
        false
    }

    fn supports_drop_if_exists(&self) -> bool {
        true
    }

    fn supports_if_not_exists(&self) -> bool {
        true
    }

    fn supports_inherits(&self) -> bool {
        false
    }

    /// Whether indexes are declared inside CREATE TABLE.
    fn index_on_table(&self) -> bool {
        false
    }

    /// Whether nullable columns render an explicit `NULL`.
    fn show_create_null(&self) -> bool {
        true
    }

    // =========================================================================
    // DDL
    // =========================================================================

    /// Column definition, with or without the inline key markers.
    fn column_string(&self, col: &Column, include_pk: bool) -> String {
        base::column_string(self, col, include_pk)
    }

    /// An empty `table_name` means `table.name`; empty `store_engine` or
    /// `charset` fall back as described in [`base::create_table_sql`].
    fn create_table_sql(
        &self,
        table: &Table,
        table_name: &str,
        store_engine: &str,
        charset: &str,
    ) -> String {
        base::create_table_sql(self, table, table_name, store_engine, charset)
    }

    fn drop_table_sql(&self, table_name: &str) -> String {
        base::drop_table_sql(self, table_name)
    }

    fn create_index_sql(&self, table_name: &str, index: &Index) -> String {
        base::create_index_sql(self, table_name, index)
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> String {
        base::drop_index_sql(self, table_name, index)
    }

    fn modify_column_sql(&self, table_name: &str, col: &Column) -> String {
        base::modify_column_sql(self, table_name, col)
    }

    /// Append the row-lock clause; dialects without one return `query` as is.
    fn for_update_sql(&self, query: &str) -> String {
        format!("{} FOR UPDATE", query)
    }

    /// Whether [`Dialect::limit_sql`] output is only valid after an ORDER BY.
    fn requires_order_by_for_limit(&self) -> bool {
        false
    }

    /// Pagination clause for a SELECT.
    fn limit_sql(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        helpers::limit_offset_standard(self, limit, offset)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Query (with `?` placeholders) and arguments that return a row iff the
    /// table exists.
    fn table_check_sql(&self, table_name: &str) -> (String, Vec<Value>);

    /// Same as [`Dialect::table_check_sql`] for a stored index name.
    fn index_check_sql(&self, table_name: &str, index_name: &str) -> (String, Vec<Value>);

    fn is_table_exist(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<bool> {
        let (sql, args) = self.table_check_sql(table_name);
        base::has_records(self, conn, &sql, &args)
    }

    fn is_index_exist(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
        index: &Index,
    ) -> DbResult<bool> {
        let (sql, args) = self.index_check_sql(table_name, &index.storage_name(table_name));
        base::has_records(self, conn, &sql, &args)
    }

    fn is_column_exist(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
        col_name: &str,
    ) -> DbResult<bool> {
        base::is_column_exist(self, conn, table_name, col_name)
    }

    /// Columns of a live table in ordinal order.
    fn get_columns(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<Vec<Column>>;

    /// User tables, with name and engine only; see `Engine::db_metas` for the
    /// fully populated form.
    fn get_tables(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>>;

    /// Secondary indexes keyed by logical name; primary keys are excluded.
    fn get_indexes(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> DbResult<BTreeMap<String, Index>>;

    // =========================================================================
    // Filters
    // =========================================================================

    fn filters(&self) -> Vec<Box<dyn Filter>> {
        vec![Box::new(IdFilter)]
    }

    /// Run `sql` through [`Dialect::filters`] in order.
    fn filter_sql(&self, sql: &str, table: Option<&Table>) -> String {
        base::filter_sql(self, sql, table)
    }
}
