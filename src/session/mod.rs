//! Sessions: accumulated per-operation state plus transaction scope.
//!
//! A session borrows an [`Engine`] and a [`Connection`]. Chained calls
//! configure the next operation; the operation executes, records
//! [`Session::last_sql`] and clears the configuration again, whether it
//! succeeded or not.
//!
//! ```text
//! Init --chain--> Building --operation--> Init
//!   \                                      ^
//!    begin --> InTransaction --commit/rollback
//! ```
//!
//! A session is single-owner: it holds `&mut` to its connection, so sharing
//! one across threads does not compile.

mod ops;
mod statement;

pub use statement::Statement;

use std::mem;

use crate::db::{Connection, DbError, ExecResult, Record, Rows, Value};
use crate::engine::Engine;
use crate::schema::Table;
use crate::sql::Cond;

use statement::{Join, Order, SetExpr};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transaction already in progress")]
    AlreadyInTransaction,

    #[error("no transaction in progress")]
    NotInTransaction,

    #[error("no table name: set one on the metadata or with `table()`")]
    NoTable,

    #[error("table `{table}` has no column `{column}`")]
    UnknownColumn { table: String, column: String },

    #[error("table `{table}` has {expected} primary-key column(s) but the id has {got} value(s)")]
    IdMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("nothing to write for table `{0}`")]
    EmptyRecord(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing configured, no transaction.
    Init,
    /// Chained configuration is waiting for an operation.
    Building,
    /// Between `begin` and `commit`/`rollback`.
    InTransaction,
}

pub struct Session<'a> {
    engine: &'a Engine,
    conn: &'a mut dyn Connection,
    stmt: Statement,
    in_tx: bool,
    last_sql: Option<(String, Vec<Value>)>,
}

impl<'a> Session<'a> {
    pub fn new(engine: &'a Engine, conn: &'a mut dyn Connection) -> Self {
        Self {
            engine,
            conn,
            stmt: Statement::default(),
            in_tx: false,
            last_sql: None,
        }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn state(&self) -> SessionState {
        if self.in_tx {
            SessionState::InTransaction
        } else if self.stmt.touched {
            SessionState::Building
        } else {
            SessionState::Init
        }
    }

    pub fn is_in_transaction(&self) -> bool {
        self.in_tx
    }

    /// The last statement sent to the connection and its arguments, until
    /// the next operation starts.
    pub fn last_sql(&self) -> Option<(&str, &[Value])> {
        self.last_sql
            .as_ref()
            .map(|(sql, args)| (sql.as_str(), args.as_slice()))
    }

    /// Discard any configuration without running an operation.
    pub fn reset(&mut self) -> &mut Self {
        self.stmt = Statement::default();
        self
    }

    // =========================================================================
    // Chained configuration
    // =========================================================================

    fn stmt(&mut self) -> &mut Statement {
        self.stmt.touched = true;
        &mut self.stmt
    }

    /// Run `sql` verbatim for the next query operation instead of building one.
    pub fn sql(&mut self, sql: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.stmt().raw_sql = Some((sql.into(), args));
        self
    }

    /// Same as [`Session::and`].
    pub fn where_(&mut self, sql: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.and(sql, args)
    }

    pub fn and(&mut self, sql: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.stmt().and(Cond::expr(sql, args));
        self
    }

    pub fn or(&mut self, sql: impl Into<String>, args: Vec<Value>) -> &mut Self {
        self.stmt().or(Cond::expr(sql, args));
        self
    }

    /// Primary-key values, in key order.
    pub fn id<I, V>(&mut self, pk: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.stmt().id = Some(pk.into_iter().map(Into::into).collect());
        self
    }

    pub fn in_<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.stmt().and(Cond::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn not_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.stmt().and(Cond::NotIn {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// `SET column = column + value` on the next update.
    pub fn incr(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.stmt()
            .sets
            .push((column.to_string(), SetExpr::Incr(value.into())));
        self
    }

    pub fn decr(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.stmt()
            .sets
            .push((column.to_string(), SetExpr::Decr(value.into())));
        self
    }

    /// `SET column = <expr>` with `expr` rendered verbatim.
    pub fn set_expr(&mut self, column: &str, expr: impl Into<String>) -> &mut Self {
        self.stmt()
            .sets
            .push((column.to_string(), SetExpr::Raw(expr.into())));
        self
    }

    /// Raw select list.
    pub fn select(&mut self, select: impl Into<String>) -> &mut Self {
        self.stmt().select = Some(select.into());
        self
    }

    /// Restrict the columns read or written.
    pub fn cols(&mut self, columns: &[&str]) -> &mut Self {
        let stmt = self.stmt();
        stmt.cols.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Exclude columns from reads and writes.
    pub fn omit(&mut self, columns: &[&str]) -> &mut Self {
        let stmt = self.stmt();
        stmt.omit.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn distinct(&mut self, columns: &[&str]) -> &mut Self {
        let stmt = self.stmt();
        stmt.distinct.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn for_update(&mut self) -> &mut Self {
        self.stmt().for_update = true;
        self
    }

    pub fn limit(&mut self, limit: u64, offset: impl Into<Option<u64>>) -> &mut Self {
        let stmt = self.stmt();
        stmt.limit = Some(limit);
        stmt.offset = offset.into();
        self
    }

    /// Raw ORDER BY fragment.
    pub fn order_by(&mut self, order: impl Into<String>) -> &mut Self {
        self.stmt().order.push(Order::Raw(order.into()));
        self
    }

    pub fn asc(&mut self, columns: &[&str]) -> &mut Self {
        let stmt = self.stmt();
        stmt.order
            .extend(columns.iter().map(|c| Order::Asc(c.to_string())));
        self
    }

    pub fn desc(&mut self, columns: &[&str]) -> &mut Self {
        let stmt = self.stmt();
        stmt.order
            .extend(columns.iter().map(|c| Order::Desc(c.to_string())));
        self
    }

    pub fn group_by(&mut self, keys: impl Into<String>) -> &mut Self {
        self.stmt().group_by = Some(keys.into());
        self
    }

    pub fn having(&mut self, cond: impl Into<String>) -> &mut Self {
        self.stmt().having = Some(cond.into());
        self
    }

    /// `<op> JOIN <table> ON <on>`, e.g. `join("LEFT", "group", "group.id = user.group_id")`.
    pub fn join(&mut self, op: &str, table: &str, on: impl Into<String>) -> &mut Self {
        self.stmt().joins.push(Join {
            op: op.to_string(),
            table: table.to_string(),
            on: on.into(),
        });
        self
    }

    /// Operate on `name` instead of the metadata's table name.
    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.stmt().table_name = Some(name.into());
        self
    }

    pub fn alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.stmt().alias = Some(alias.into());
        self
    }

    pub fn store_engine(&mut self, store_engine: impl Into<String>) -> &mut Self {
        self.stmt().store_engine = Some(store_engine.into());
        self
    }

    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.stmt().charset = Some(charset.into());
        self
    }

    /// Bypass the table cacher for the next operation.
    pub fn no_cache(&mut self) -> &mut Self {
        self.stmt().no_cache = true;
        self
    }

    /// Include soft-deleted rows, and make `delete` a real DELETE.
    pub fn unscoped(&mut self) -> &mut Self {
        self.stmt().unscoped = true;
        self
    }

    /// Leave created/updated columns alone.
    pub fn no_auto_time(&mut self) -> &mut Self {
        self.stmt().no_auto_time = true;
        self
    }

    /// Hook run on each record before it is inserted or updated.
    pub fn before(&mut self, hook: impl FnMut(&mut Record) + 'static) -> &mut Self {
        self.stmt().before.push(Box::new(hook));
        self
    }

    /// Hook run on each record written or read by the next operation.
    pub fn after(&mut self, hook: impl FnMut(&Record) + 'static) -> &mut Self {
        self.stmt().after.push(Box::new(hook));
        self
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn begin(&mut self) -> SessionResult<()> {
        if self.in_tx {
            return Err(SessionError::AlreadyInTransaction);
        }
        self.engine.log_sql("begin", "BEGIN", &[]);
        self.conn.begin()?;
        self.in_tx = true;
        Ok(())
    }

    pub fn commit(&mut self) -> SessionResult<()> {
        if !self.in_tx {
            return Err(SessionError::NotInTransaction);
        }
        self.engine.log_sql("commit", "COMMIT", &[]);
        self.conn.commit()?;
        self.in_tx = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> SessionResult<()> {
        if !self.in_tx {
            return Err(SessionError::NotInTransaction);
        }
        let engine = self.engine;
        engine.log_sql("rollback", engine.dialect().roll_back_str(), &[]);
        self.conn.rollback()?;
        self.in_tx = false;
        Ok(())
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Start an operation: hand over the configuration and forget the
    /// previous statement.
    fn take_statement(&mut self) -> Statement {
        self.last_sql = None;
        mem::take(&mut self.stmt)
    }

    fn run_query(&mut self, sql: &str, args: Vec<Value>, table: Option<&Table>) -> SessionResult<Rows> {
        let sql = self.engine.dialect().filter_sql(sql, table);
        self.engine.log_sql("query", &sql, &args);
        let result = self.conn.query(&sql, &args);
        self.last_sql = Some((sql, args));
        Ok(result?)
    }

    fn run_exec(&mut self, sql: &str, args: Vec<Value>, table: Option<&Table>) -> SessionResult<ExecResult> {
        let sql = self.engine.dialect().filter_sql(sql, table);
        self.run_native(sql, args)
    }

    /// Execute SQL that is already in the backend's native form.
    fn run_native(&mut self, sql: String, args: Vec<Value>) -> SessionResult<ExecResult> {
        self.engine.log_sql("exec", &sql, &args);
        let result = self.conn.exec(&sql, &args);
        self.last_sql = Some((sql, args));
        Ok(result?)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if !self.in_tx {
            return;
        }
        self.engine.warn("session dropped inside a transaction; rolling back");
        if let Err(err) = self.conn.rollback() {
            self.engine.warn(&format!("rollback on drop failed: {}", err));
        }
    }
}
