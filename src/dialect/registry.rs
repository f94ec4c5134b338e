//! Explicit registry of dialect constructors.
//!
//! There is no process-wide table: callers build a [`DialectRegistry`] at
//! startup, register what they need and hand it to whoever resolves dialects.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{DbType, Dialect, MsSql, MySql, Postgres, Sqlite};
use crate::config::Uri;

/// Produces a fresh, uninitialized dialect instance.
pub type DialectCtor = Arc<dyn Fn() -> Box<dyn Dialect> + Send + Sync>;

/// Constructor for a dialect type with a `Default` instance.
pub fn ctor<D: Dialect + Default + 'static>() -> DialectCtor {
    Arc::new(|| -> Box<dyn Dialect> { Box::new(D::default()) })
}

/// Map from backend tag to dialect constructor.
///
/// Every lookup builds a new instance, so a dialect initialized for one
/// connection never leaks into another.
#[derive(Clone, Default)]
pub struct DialectRegistry {
    ctors: HashMap<DbType, DialectCtor>,
}

impl DialectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with MySQL, PostgreSQL, SQLite and SQL Server registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_dialect(DbType::MYSQL, ctor::<MySql>());
        registry.register_dialect(DbType::POSTGRES, ctor::<Postgres>());
        registry.register_dialect(DbType::SQLITE, ctor::<Sqlite>());
        registry.register_dialect(DbType::MSSQL, ctor::<MsSql>());
        registry
    }

    /// Register `ctor` for `db_type`, replacing any previous registration.
    pub fn register_dialect(&mut self, db_type: DbType, ctor: DialectCtor) {
        if self.ctors.insert(db_type.clone(), ctor).is_some() {
            tracing::debug!(db_type = %db_type, "replaced dialect registration");
        }
    }

    /// A fresh instance for `db_type`, or `None` if nothing is registered.
    pub fn query_dialect(&self, db_type: &DbType) -> Option<Box<dyn Dialect>> {
        self.ctors.get(db_type).map(|ctor| ctor())
    }

    /// A fresh instance initialized with the connection details.
    pub fn open(
        &self,
        uri: Uri,
        driver_name: &str,
        data_source_name: &str,
    ) -> Option<Box<dyn Dialect>> {
        let mut dialect = self.query_dialect(&uri.db_type)?;
        dialect.init(uri, driver_name, data_source_name);
        Some(dialect)
    }

    pub fn contains(&self, db_type: &DbType) -> bool {
        self.ctors.contains_key(db_type)
    }

    /// Registered tags, sorted.
    pub fn db_types(&self) -> Vec<DbType> {
        let mut types: Vec<_> = self.ctors.keys().cloned().collect();
        types.sort();
        types
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("db_types", &self.db_types())
            .finish()
    }
}
