//! # Dialectic
//!
//! Dialect-portable SQL generation and session state for an
//! object-relational mapping layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            Table metadata (schema::Table)                │
//! │  (columns, indexes, keys, audit and version markers)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [session]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Session: chained clauses, transactions, operations     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dialect + filters]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Native SQL for MySQL, PostgreSQL, SQLite, SQL Server   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [db::Connection]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Caller-supplied handle                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! An [`Engine`] pairs one initialized dialect with shared settings
//! (logger, cachers, name mappers). Dialects are looked up by database
//! type in a [`DialectRegistry`].

pub mod cache;
pub mod config;
pub mod db;
pub mod dialect;
pub mod engine;
pub mod log;
pub mod mapper;
pub mod schema;
pub mod session;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{Cacher, MemoryCacher};
    pub use crate::config::{Settings, Uri};
    pub use crate::db::{Connection, ExecResult, Record, Rows, Value};
    pub use crate::dialect::{DbType, Dialect, DialectRegistry};
    pub use crate::engine::Engine;
    pub use crate::schema::{Column, DataType, Index, IndexKind, Table};
    pub use crate::session::{Session, SessionError, SessionResult, SessionState};
}

pub use db::{Connection, Record, Value};
pub use dialect::{DbType, Dialect, DialectRegistry};
pub use engine::Engine;
pub use schema::{Column, DataType, Index, IndexKind, Table};
pub use session::{Session, SessionError};
