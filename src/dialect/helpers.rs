//! Shared helper functions for dialect implementations.
//!
//! Reusable building blocks that dialects compose to implement the
//! [`Dialect`] trait with minimal duplication.

use std::collections::{BTreeMap, HashSet};

use super::Dialect;
use crate::schema::{DataType, Index, IndexKind};
use crate::sql::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: PostgreSQL
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL, SQLite
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: SQL Server
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build a case-insensitive reserved-word set from an uppercase word list.
pub fn reserved_set(words: &[&'static str]) -> HashSet<&'static str> {
    words.iter().copied().collect()
}

/// Look `ident` up in an uppercase reserved-word set.
pub fn is_reserved_in(set: &HashSet<&'static str>, ident: &str) -> bool {
    set.contains(ident.to_ascii_uppercase().as_str())
}

// =============================================================================
// Literals
// =============================================================================

/// `0x` followed by lowercase hex digits.
pub fn format_bytes_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Single-quoted string literal for SQL embedded in generated statements.
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ... (standard SQL).
/// Used by: PostgreSQL
pub fn limit_offset_standard<D: Dialect + ?Sized>(
    dialect: &D,
    limit: Option<u64>,
    offset: Option<u64>,
) -> String {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Raw("LIMIT".into()))
            .space()
            .push(Token::LitInt(lim as i64));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Raw("OFFSET".into()))
            .space()
            .push(Token::LitInt(off as i64));
    }

    ts.serialize(dialect)
}

/// LIMIT ... OFFSET ... where OFFSET alone is not accepted and an
/// "unbounded" limit literal has to stand in.
/// Used by: MySQL (`18446744073709551615`), SQLite (`-1`)
pub fn limit_offset_with_unbounded<D: Dialect + ?Sized>(
    dialect: &D,
    limit: Option<u64>,
    offset: Option<u64>,
    unbounded: &str,
) -> String {
    match (limit, offset) {
        (None, Some(off)) => format!("LIMIT {} OFFSET {}", unbounded, off),
        _ => limit_offset_standard(dialect, limit, offset),
    }
}

/// Emit OFFSET ... ROWS FETCH NEXT ... ROWS ONLY.
/// Used by: SQL Server. Requires an ORDER BY in the enclosing query.
pub fn limit_offset_fetch<D: Dialect + ?Sized>(
    dialect: &D,
    limit: Option<u64>,
    offset: Option<u64>,
) -> String {
    if limit.is_none() && offset.is_none() {
        return String::new();
    }

    let mut ts = TokenStream::new();
    ts.push(Token::Raw("OFFSET".into()))
        .space()
        .push(Token::LitInt(offset.unwrap_or(0) as i64))
        .space()
        .push(Token::Raw("ROWS".into()));

    if let Some(lim) = limit {
        ts.space()
            .push(Token::Raw("FETCH NEXT".into()))
            .space()
            .push(Token::LitInt(lim as i64))
            .space()
            .push(Token::Raw("ROWS ONLY".into()));
    }

    ts.serialize(dialect)
}

// =============================================================================
// Introspection
// =============================================================================

/// Group `(stored name, unique, column)` catalog rows into indexes keyed by
/// logical name, keeping column order as listed.
pub fn collect_indexes<I>(table_name: &str, rows: I) -> BTreeMap<String, Index>
where
    I: IntoIterator<Item = (String, bool, String)>,
{
    let mut indexes: BTreeMap<String, Index> = BTreeMap::new();
    for (stored, unique, column) in rows {
        let (name, regular) = Index::split_storage_name(&stored, table_name);
        indexes
            .entry(name.clone())
            .or_insert_with(|| {
                let kind = if unique { IndexKind::Unique } else { IndexKind::Index };
                if regular {
                    Index::new_regular(name, kind)
                } else {
                    Index::new_named(name, kind)
                }
            })
            .add_column(column);
    }
    indexes
}

/// Split a parenthesized column list from an index definition, dropping any
/// identifier quotes: `("a", "b")` -> `["a", "b"]`.
pub fn split_index_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(|c| {
            c.trim()
                .trim_matches(|ch| matches!(ch, '"' | '`' | '[' | ']'))
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

// =============================================================================
// Catalog Types
// =============================================================================

/// `VARCHAR(n)`/`CHAR(n)` from a catalog length, or unbounded `String` when
/// the length does not fit the metadata model.
pub fn sized_char_type(len: i64, fixed: bool) -> DataType {
    match u16::try_from(len) {
        Ok(n) if n > 0 && fixed => DataType::Char(n),
        Ok(n) if n > 0 => DataType::Varchar(n),
        _ => DataType::String,
    }
}

/// `DECIMAL(p,s)` from catalog precision and scale. Precision beyond the
/// metadata model reads back as `String` so no digits are lost.
pub fn decimal_type(precision: i64, scale: i64) -> DataType {
    match (u8::try_from(precision), u8::try_from(scale)) {
        (Ok(p), Ok(s)) if s <= p => DataType::Decimal(p, s),
        _ => DataType::String,
    }
}
