//! Shared DDL-generation algorithms.
//!
//! These are the defaults behind the [`Dialect`] trait methods. Concrete
//! dialects call them directly when they override a method but still want
//! part of the shared behavior.
//!
//! All `*_sql` functions are pure: they never touch a connection and cannot
//! fail. Output carries no trailing semicolon.

use crate::db::{Connection, DbResult, Rows, Value};
use crate::schema::{Column, Index, Table};
use crate::sql::filter::FilterContext;
use crate::sql::token::{Token, TokenStream};

use super::Dialect;

/// Column definition tokens:
/// `<name> <type>[ NULL| NOT NULL][ DEFAULT <expr>][ PRIMARY KEY[ <auto-incr>]]`.
///
/// The key markers trail everything else, so the without-PK form is exactly
/// the with-PK form with that suffix removed.
pub fn column_tokens<D: Dialect + ?Sized>(d: &D, col: &Column, include_pk: bool) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Ident(col.name.clone()))
        .space()
        .push(Token::Raw(d.sql_type(col)));

    if !col.nullable {
        ts.space().push(Token::NotNull);
    } else if d.show_create_null() {
        ts.space().push(Token::Null);
    }

    if let Some(default) = &col.default {
        ts.space()
            .push(Token::Default)
            .space()
            .push(Token::Raw(default.clone()));
    }

    if include_pk && col.is_primary_key {
        ts.space().keywords([Token::Primary, Token::Key]);
        let auto_incr = d.auto_incr_str();
        if col.is_auto_increment && !auto_incr.is_empty() {
            ts.space().push(Token::Raw(auto_incr.to_string()));
        }
    }

    ts
}

pub fn column_string<D: Dialect + ?Sized>(d: &D, col: &Column, include_pk: bool) -> String {
    column_tokens(d, col, include_pk).serialize(d)
}

/// Body of a CREATE TABLE: `(<col-defs>[, PRIMARY KEY (<cols>)])`.
///
/// Exactly one primary key is inlined on its column; two or more become a
/// trailing composite clause and no column carries key markers.
pub fn table_body_tokens<D: Dialect + ?Sized>(d: &D, table: &Table) -> TokenStream {
    let inline_pk = table.primary_keys.len() == 1;

    let mut ts = TokenStream::new();
    ts.lparen();
    ts.separated(table.columns(), &[Token::Comma, Token::Space], |ts, col| {
        ts.append(&column_tokens(d, col, inline_pk));
    });

    if table.primary_keys.len() > 1 {
        if !table.columns().is_empty() {
            ts.comma().space();
        }
        ts.keywords([Token::Primary, Token::Key])
            .space()
            .lparen()
            .ident_list(&table.primary_keys)
            .rparen();
    }

    ts.rparen();
    ts
}

/// `CREATE TABLE [IF NOT EXISTS] <t> (...)[ INHERITS (...)][ ENGINE=<e>][ DEFAULT CHARSET <c>]`
///
/// - `table_name` empty: use `table.name`.
/// - ENGINE only when the dialect supports it and `store_engine` is non-empty.
/// - DEFAULT CHARSET only when the dialect supports it; an empty `charset`
///   falls back to the connection charset, and no clause is emitted if that
///   is empty too.
/// - INHERITS only when the dialect supports it and the table has parents.
pub fn create_table_sql<D: Dialect + ?Sized>(
    d: &D,
    table: &Table,
    table_name: &str,
    store_engine: &str,
    charset: &str,
) -> String {
    let table_name = if table_name.is_empty() {
        table.name.as_str()
    } else {
        table_name
    };

    let mut ts = TokenStream::new();
    ts.keywords([Token::Create, Token::Table]);
    if d.supports_if_not_exists() {
        ts.space().keywords([Token::If, Token::Not, Token::Exists]);
    }
    ts.space()
        .push(Token::Ident(table_name.to_string()))
        .space()
        .append(&table_body_tokens(d, table));

    if d.supports_inherits() && !table.inherits.is_empty() {
        ts.space()
            .push(Token::Raw("INHERITS".into()))
            .space()
            .lparen()
            .ident_list(&table.inherits)
            .rparen();
    }

    if d.supports_engine() && !store_engine.is_empty() {
        ts.space().push(Token::Raw(format!("ENGINE={}", store_engine)));
    }

    if d.supports_charset() {
        let charset = if charset.is_empty() {
            d.uri().charset.as_str()
        } else {
            charset
        };
        if !charset.is_empty() {
            ts.space()
                .keywords([Token::Default, Token::Raw("CHARSET".into())])
                .space()
                .push(Token::Raw(charset.to_string()));
        }
    }

    ts.serialize(d)
}

/// `DROP TABLE [IF EXISTS] <t>`
///
/// Without IF EXISTS support, dropping a missing table is an error the
/// caller has to tolerate.
pub fn drop_table_sql<D: Dialect + ?Sized>(d: &D, table_name: &str) -> String {
    let mut ts = TokenStream::new();
    ts.keywords([Token::Drop, Token::Table]);
    if d.supports_drop_if_exists() {
        ts.space().keywords([Token::If, Token::Exists]);
    }
    ts.space().push(Token::Ident(table_name.to_string()));
    ts.serialize(d)
}

/// `CREATE [UNIQUE ]INDEX <name> ON <t> (<cols>)` with the storage name
/// from [`Index::storage_name`].
pub fn create_index_sql<D: Dialect + ?Sized>(d: &D, table_name: &str, index: &Index) -> String {
    let mut ts = TokenStream::new();
    ts.push(Token::Create).space();
    if index.is_unique() {
        ts.push(Token::Unique).space();
    }
    ts.push(Token::Index)
        .space()
        .push(Token::Ident(index.storage_name(table_name)))
        .space()
        .push(Token::On)
        .space()
        .push(Token::Ident(table_name.to_string()))
        .space()
        .lparen()
        .ident_list(&index.cols)
        .rparen();
    ts.serialize(d)
}

/// `DROP INDEX <name> ON <t>`
///
/// A regular index is dropped by its derived name, a named one by its
/// literal name.
pub fn drop_index_sql<D: Dialect + ?Sized>(d: &D, table_name: &str, index: &Index) -> String {
    let mut ts = TokenStream::new();
    ts.keywords([Token::Drop, Token::Index])
        .space()
        .push(Token::Ident(index.storage_name(table_name)))
        .space()
        .push(Token::On)
        .space()
        .push(Token::Ident(table_name.to_string()));
    ts.serialize(d)
}

/// `DROP INDEX [IF EXISTS] <name>` for backends where index names are
/// schema-scoped.
pub fn drop_index_standalone_sql<D: Dialect + ?Sized>(
    d: &D,
    table_name: &str,
    index: &Index,
) -> String {
    let mut ts = TokenStream::new();
    ts.keywords([Token::Drop, Token::Index]);
    if d.supports_drop_if_exists() {
        ts.space().keywords([Token::If, Token::Exists]);
    }
    ts.space().push(Token::Ident(index.storage_name(table_name)));
    ts.serialize(d)
}

/// `ALTER TABLE <t> MODIFY COLUMN <col-def-without-pk>`
pub fn modify_column_sql<D: Dialect + ?Sized>(d: &D, table_name: &str, col: &Column) -> String {
    let mut ts = TokenStream::new();
    ts.keywords([Token::Alter, Token::Table])
        .space()
        .push(Token::Ident(table_name.to_string()))
        .space()
        .keywords([Token::Modify, Token::Column])
        .space()
        .append(&column_tokens(d, col, false));
    ts.serialize(d)
}

// =============================================================================
// Execution helpers
// =============================================================================

pub fn filter_sql<D: Dialect + ?Sized>(d: &D, sql: &str, table: Option<&Table>) -> String {
    let quote = |ident: &str| d.quote(ident);
    let ctx = FilterContext {
        quote: &quote,
        table,
    };
    d.filters()
        .iter()
        .fold(sql.to_string(), |sql, filter| filter.apply(&sql, &ctx))
}

/// Filter and run a catalog query. Errors are returned unchanged.
pub fn query<D: Dialect + ?Sized>(
    d: &D,
    conn: &mut dyn Connection,
    sql: &str,
    args: &[Value],
) -> DbResult<Rows> {
    let sql = filter_sql(d, sql, None);
    tracing::trace!(target: "dialectic::introspect", dialect = %d.db_type(), sql = %sql, "catalog query");
    conn.query(&sql, args)
}

/// True iff the query returns at least one row.
pub fn has_records<D: Dialect + ?Sized>(
    d: &D,
    conn: &mut dyn Connection,
    sql: &str,
    args: &[Value],
) -> DbResult<bool> {
    Ok(!query(d, conn, sql, args)?.is_empty())
}

const COLUMN_EXISTS_SQL: &str = "SELECT `COLUMN_NAME` FROM `INFORMATION_SCHEMA`.`COLUMNS` WHERE `TABLE_SCHEMA` = ? AND `TABLE_NAME` = ? AND `COLUMN_NAME` = ?";

/// Column check against `INFORMATION_SCHEMA.COLUMNS`, scoped to the
/// connection's database.
pub fn is_column_exist<D: Dialect + ?Sized>(
    d: &D,
    conn: &mut dyn Connection,
    table_name: &str,
    col_name: &str,
) -> DbResult<bool> {
    let sql = requote(d, COLUMN_EXISTS_SQL);
    let args = [
        Value::from(d.uri().db_name.as_str()),
        Value::from(table_name),
        Value::from(col_name),
    ];
    has_records(d, conn, &sql, &args)
}

/// Rewrite backtick-quoted identifiers in canned SQL with the dialect's quote.
pub fn requote<D: Dialect + ?Sized>(d: &D, sql: &str) -> String {
    use crate::sql::filter::{Filter, QuoteFilter};

    let quote = |ident: &str| d.quote(ident);
    QuoteFilter.apply(
        sql,
        &FilterContext {
            quote: &quote,
            table: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};
    use crate::schema::{DataType, IndexKind};

    #[test]
    fn test_column_forms_share_prefix() {
        let d = MySql::new();
        let col = Column::new("id", DataType::Int64)
            .primary_key()
            .auto_increment()
            .default_value("0");

        let with_pk = column_string(&d, &col, true);
        let without_pk = column_string(&d, &col, false);
        assert_eq!(with_pk, "`id` BIGINT NOT NULL DEFAULT 0 PRIMARY KEY AUTO_INCREMENT");
        assert_eq!(
            with_pk.strip_suffix(" PRIMARY KEY AUTO_INCREMENT"),
            Some(without_pk.as_str())
        );
    }

    #[test]
    fn test_nullable_column_shows_null() {
        let d = MySql::new();
        let col = Column::new("name", DataType::Varchar(64));
        assert_eq!(column_string(&d, &col, true), "`name` VARCHAR(64) NULL");
    }

    #[test]
    fn test_empty_table_is_still_valid_shape() {
        let d = MySql::new();
        assert_eq!(
            create_table_sql(&d, &Table::new("t"), "", "", ""),
            "CREATE TABLE IF NOT EXISTS `t` ()"
        );
    }

    #[test]
    fn test_explicit_table_name_wins() {
        let d = Postgres::new();
        let table = Table::new("user")
            .column(Column::new("id", DataType::Int32).not_null())
            .unwrap();
        assert_eq!(
            create_table_sql(&d, &table, "user_archive", "", ""),
            "CREATE TABLE IF NOT EXISTS \"user_archive\" (\"id\" INTEGER NOT NULL)"
        );
    }

    #[test]
    fn test_requote() {
        let d = Postgres::new();
        assert_eq!(
            requote(&d, "SELECT `a` FROM `b`"),
            "SELECT \"a\" FROM \"b\""
        );
    }

    #[test]
    fn test_index_statements() {
        let d = MySql::new();
        let idx = Index::new_regular("email", IndexKind::Unique).column("email");
        assert_eq!(
            create_index_sql(&d, "user", &idx),
            "CREATE UNIQUE INDEX `UQE_user_email` ON `user` (`email`)"
        );
        assert_eq!(
            drop_index_sql(&d, "user", &idx),
            "DROP INDEX `UQE_user_email` ON `user`"
        );
    }
}
