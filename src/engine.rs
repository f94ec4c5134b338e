//! Engine: one dialect plus the shared settings every session reads.
//!
//! An engine is built once per database and shared by reference. It owns no
//! connection; sessions borrow one for their lifetime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::Cacher;
use crate::config::{Settings, SettingsError};
use crate::db::{Connection, DbResult, Value};
use crate::dialect::{Dialect, DialectRegistry};
use crate::log::{SqlLogger, TracingLogger};
use crate::mapper::{NameMapper, SnakeMapper};
use crate::schema::{Column, Table};
use crate::session::{Session, SessionResult};

pub struct Engine {
    dialect: Box<dyn Dialect>,
    logger: Option<Arc<dyn SqlLogger>>,
    show_sql: bool,
    default_cacher: Option<Arc<dyn Cacher>>,
    cachers: HashMap<String, Arc<dyn Cacher>>,
    table_mapper: Arc<dyn NameMapper>,
    column_mapper: Arc<dyn NameMapper>,
    store_engine: String,
    charset: String,
}

impl Engine {
    /// An engine over an initialized dialect, logging through `tracing` with
    /// `show_sql` off and snake_case name mapping.
    pub fn new(dialect: Box<dyn Dialect>) -> Self {
        Self {
            dialect,
            logger: Some(Arc::new(TracingLogger)),
            show_sql: false,
            default_cacher: None,
            cachers: HashMap::new(),
            table_mapper: Arc::new(SnakeMapper),
            column_mapper: Arc::new(SnakeMapper),
            store_engine: String::new(),
            charset: String::new(),
        }
    }

    /// Build an engine for the named connection of `settings`.
    pub fn from_settings(
        registry: &DialectRegistry,
        settings: &Settings,
        name: &str,
    ) -> Result<Self, SettingsError> {
        let conn = settings.get_connection(name)?;
        let uri = conn.resolved_uri()?;
        let driver = conn.driver_name(&uri);
        let dsn = conn.resolved_uri_string()?;
        let db_type = uri.db_type.clone();

        let dialect = registry
            .open(uri, &driver, &dsn)
            .ok_or_else(|| SettingsError::UnknownDialect(db_type.to_string()))?;

        let mut engine = Engine::new(dialect);
        engine.show_sql(settings.logging.show_sql);
        if let Some(store_engine) = &conn.store_engine {
            engine.set_store_engine(store_engine);
        }
        if let Some(charset) = &conn.charset {
            engine.set_charset(charset);
        }
        tracing::debug!(connection = name, db_type = %db_type, "engine ready");
        Ok(engine)
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    // =========================================================================
    // Logging
    // =========================================================================

    pub fn show_sql(&mut self, show: bool) -> &mut Self {
        self.show_sql = show;
        self
    }

    pub fn set_logger(&mut self, logger: Arc<dyn SqlLogger>) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    pub fn clear_logger(&mut self) -> &mut Self {
        self.logger = None;
        self
    }

    pub(crate) fn log_sql(&self, message: &str, sql: &str, args: &[Value]) {
        if !self.show_sql {
            return;
        }
        if let Some(logger) = &self.logger {
            logger.log_sql(message, sql, args);
        }
    }

    pub(crate) fn warn(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.warn(message);
        }
    }

    // =========================================================================
    // Caching
    // =========================================================================

    /// Cacher used by tables without one of their own.
    pub fn set_default_cacher(&mut self, cacher: Option<Arc<dyn Cacher>>) -> &mut Self {
        self.default_cacher = cacher;
        self
    }

    /// Cacher for one table, overriding the default.
    pub fn map_cacher(&mut self, table: &str, cacher: Arc<dyn Cacher>) -> &mut Self {
        self.cachers.insert(table.to_string(), cacher);
        self
    }

    /// Table's own cacher, then the per-table mapping, then the default.
    pub fn cacher_for(&self, table: &Table) -> Option<Arc<dyn Cacher>> {
        table
            .cacher
            .clone()
            .or_else(|| self.cachers.get(&table.name).cloned())
            .or_else(|| self.default_cacher.clone())
    }

    // =========================================================================
    // Names and types
    // =========================================================================

    pub fn set_table_mapper(&mut self, mapper: Arc<dyn NameMapper>) -> &mut Self {
        self.table_mapper = mapper;
        self
    }

    pub fn set_column_mapper(&mut self, mapper: Arc<dyn NameMapper>) -> &mut Self {
        self.column_mapper = mapper;
        self
    }

    /// Table name for a source type name, e.g. `UserGroup` -> `user_group`.
    pub fn table_name_of(&self, type_name: &str) -> String {
        self.table_mapper.obj_to_table(type_name)
    }

    pub fn column_name_of(&self, field: &str) -> String {
        self.column_mapper.obj_to_table(field)
    }

    pub fn quote(&self, ident: &str) -> String {
        self.dialect.quote(ident)
    }

    pub fn sql_type(&self, col: &Column) -> String {
        self.dialect.sql_type(col)
    }

    pub fn supports_insert_many(&self) -> bool {
        self.dialect.supports_insert_many()
    }

    /// Default storage engine for created tables.
    pub fn set_store_engine(&mut self, store_engine: &str) -> &mut Self {
        self.store_engine = store_engine.to_string();
        self
    }

    pub fn store_engine(&self) -> &str {
        &self.store_engine
    }

    /// Default charset for created tables; empty defers to the URI.
    pub fn set_charset(&mut self, charset: &str) -> &mut Self {
        self.charset = charset.to_string();
        self
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    // =========================================================================
    // Sessions and schema
    // =========================================================================

    pub fn new_session<'a>(&'a self, conn: &'a mut dyn Connection) -> Session<'a> {
        Session::new(self, conn)
    }

    /// Every user table with its columns and indexes filled in.
    pub fn db_metas(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>> {
        let mut tables = self.dialect.get_tables(conn)?;
        for table in &mut tables {
            for col in self.dialect.get_columns(conn, &table.name)? {
                table.add_column(col)?;
            }
            for (_, index) in self.dialect.get_indexes(conn, &table.name)? {
                table.add_index(index);
            }
        }
        Ok(tables)
    }

    /// Create each table with its indexes, in order, in one session.
    pub fn create_tables(&self, conn: &mut dyn Connection, tables: &[Table]) -> SessionResult<()> {
        let mut session = self.new_session(conn);
        for table in tables {
            session.create_table(table)?;
            session.create_indexes(table)?;
            session.create_uniques(table)?;
        }
        Ok(())
    }

    pub fn drop_tables(&self, conn: &mut dyn Connection, tables: &[Table]) -> SessionResult<()> {
        let mut session = self.new_session(conn);
        for table in tables {
            session.drop_table(table)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("dialect", &self.dialect.db_type())
            .field("show_sql", &self.show_sql)
            .field("table_mapper", &self.table_mapper)
            .field("column_mapper", &self.column_mapper)
            .finish_non_exhaustive()
    }
}
