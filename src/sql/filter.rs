//! Text-substitution filters applied to SQL before execution.
//!
//! Statements are written with backtick-quoted identifiers, `(id)` as a
//! stand-in for the primary key and `?` placeholders. Each dialect lists the
//! filters that turn that text into its native form.

use std::fmt;

use crate::schema::Table;

/// What a filter may need from the dialect and the current table.
pub struct FilterContext<'a> {
    pub quote: &'a dyn Fn(&str) -> String,
    pub table: Option<&'a Table>,
}

pub trait Filter: fmt::Debug + Send + Sync {
    fn apply(&self, sql: &str, ctx: &FilterContext<'_>) -> String;
}

/// Replace `` `name` `` with the dialect's quoting of `name`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuoteFilter;

impl Filter for QuoteFilter {
    fn apply(&self, sql: &str, ctx: &FilterContext<'_>) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut rest = sql;
        while let Some(start) = rest.find('`') {
            let Some(len) = rest[start + 1..].find('`') else {
                break;
            };
            out.push_str(&rest[..start]);
            out.push_str(&(ctx.quote)(&rest[start + 1..start + 1 + len]));
            rest = &rest[start + len + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// Replace the `(id)` marker with the quoted primary-key column.
///
/// Only applies to tables with exactly one primary key.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdFilter;

impl Filter for IdFilter {
    fn apply(&self, sql: &str, ctx: &FilterContext<'_>) -> String {
        let pk = match ctx.table.map(|t| t.primary_keys.as_slice()) {
            Some([pk]) => pk,
            _ => return sql.to_string(),
        };
        let quoted = (ctx.quote)(pk);
        sql.replace("`(id)`", &quoted)
            .replace(" (id) ", &format!(" {} ", quoted))
    }
}

/// Number `?` placeholders: `$1, $2, ...` or `@p1, @p2, ...`.
///
/// Question marks inside single-quoted string literals are left alone.
#[derive(Debug, Clone)]
pub struct SeqFilter {
    pub prefix: &'static str,
    pub start: usize,
}

impl Filter for SeqFilter {
    fn apply(&self, sql: &str, _ctx: &FilterContext<'_>) -> String {
        let mut out = String::with_capacity(sql.len() + 8);
        let mut n = self.start;
        let mut in_string = false;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_string = !in_string;
                    out.push(ch);
                }
                '?' if !in_string => {
                    out.push_str(self.prefix);
                    out.push_str(&n.to_string());
                    n += 1;
                }
                _ => out.push(ch),
            }
        }
        out
    }
}
