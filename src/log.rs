//! SQL logging boundary.

use std::fmt;

use crate::db::Value;

/// Receives every statement a session executes.
///
/// Leaving the logger unset only suppresses output; execution is unchanged.
pub trait SqlLogger: fmt::Debug + Send + Sync {
    fn log_sql(&self, message: &str, sql: &str, args: &[Value]);

    fn warn(&self, message: &str);
}

/// Default logger, forwarding to `tracing` under the `dialectic::sql` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl SqlLogger for TracingLogger {
    fn log_sql(&self, message: &str, sql: &str, args: &[Value]) {
        tracing::debug!(target: "dialectic::sql", sql, args = ?args, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "dialectic::sql", "{}", message);
    }
}
