//! Test utilities for SQL emission validation.
//!
//! Provides helpers for validating that emitted SQL is syntactically correct
//! using sqlparser-rs for roundtrip validation.

use sqlparser::dialect::{GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::dialect::DbType;

/// Validates that a SQL string is syntactically valid for the given backend.
///
/// # Example
///
/// ```ignore
/// use crate::sql::test_utils::validate_sql;
/// use crate::dialect::DbType;
///
/// validate_sql("DROP TABLE IF EXISTS \"user\"", &DbType::POSTGRES).unwrap();
/// ```
pub fn validate_sql(sql: &str, db_type: &DbType) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match db_type.as_str() {
        "postgres" => Box::new(PostgreSqlDialect {}),
        "mysql" => Box::new(MySqlDialect {}),
        "sqlite" => Box::new(SQLiteDialect {}),
        "mssql" => Box::new(MsSqlDialect {}),
        _ => Box::new(GenericDialect {}),
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {}: {}\nSQL: {}", db_type, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql("SELECT * FROM users", &DbType::POSTGRES).unwrap();
        validate_sql("SELECT * FROM users", &DbType::MYSQL).unwrap();
        validate_sql("SELECT * FROM users", &DbType::SQLITE).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM users", &DbType::POSTGRES);
        assert!(result.is_err());
    }
}
