//! Composable WHERE condition tree.
//!
//! Condition text is passed through as written; only `IN`/`NOT IN`/`IS NULL`
//! leaves are structured, because they need quoting and argument expansion.

use super::token::{Token, TokenStream};
use crate::db::Value;

/// A node of a WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// Raw condition text with `?` placeholders and their arguments.
    Expr { sql: String, args: Vec<Value> },
    And(Vec<Cond>),
    Or(Vec<Cond>),
    In { column: String, values: Vec<Value> },
    NotIn { column: String, values: Vec<Value> },
    IsNull(String),
}

impl Cond {
    pub fn expr(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Cond::Expr {
            sql: sql.into(),
            args,
        }
    }

    /// `column = ?`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::In {
            column: column.into(),
            values: vec![value.into()],
        }
    }

    /// Combine with AND, flattening nested ANDs.
    pub fn and(self, other: Cond) -> Cond {
        match self {
            Cond::And(mut items) => {
                items.push(other);
                Cond::And(items)
            }
            lhs => Cond::And(vec![lhs, other]),
        }
    }

    /// Combine with OR, flattening nested ORs.
    pub fn or(self, other: Cond) -> Cond {
        match self {
            Cond::Or(mut items) => {
                items.push(other);
                Cond::Or(items)
            }
            lhs => Cond::Or(vec![lhs, other]),
        }
    }

    /// Append tokens for this condition and collect its arguments in order.
    pub fn to_tokens(&self, ts: &mut TokenStream, args: &mut Vec<Value>) {
        match self {
            Cond::Expr { sql, args: a } => {
                ts.push(Token::Raw(sql.clone()));
                args.extend(a.iter().cloned());
            }
            Cond::And(items) => emit_joined(ts, args, items, Token::And),
            Cond::Or(items) => emit_joined(ts, args, items, Token::Or),
            Cond::In { column, values } => emit_in(ts, args, column, values, false),
            Cond::NotIn { column, values } => emit_in(ts, args, column, values, true),
            Cond::IsNull(column) => {
                ts.push(Token::Ident(column.clone()))
                    .space()
                    .push(Token::IsNull);
            }
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(self, Cond::Expr { .. } | Cond::And(_) | Cond::Or(_))
    }
}

fn emit_joined(ts: &mut TokenStream, args: &mut Vec<Value>, items: &[Cond], op: Token) {
    let wrap = items.len() > 1;
    ts.separated(items, &[Token::Space, op, Token::Space], |ts, item| {
        if wrap && item.needs_parens() {
            ts.lparen();
            item.to_tokens(ts, args);
            ts.rparen();
        } else {
            item.to_tokens(ts, args);
        }
    });
}

fn emit_in(ts: &mut TokenStream, args: &mut Vec<Value>, column: &str, values: &[Value], negate: bool) {
    // Empty IN matches nothing, empty NOT IN matches everything.
    if values.is_empty() {
        ts.push(Token::Raw(if negate { "1=1" } else { "1=0" }.into()));
        return;
    }

    ts.push(Token::Ident(column.to_string())).space();
    if values.len() == 1 {
        if negate {
            ts.push(Token::Raw("<>".into()));
        } else {
            ts.push(Token::Eq);
        }
        ts.space().push(Token::Placeholder);
    } else {
        if negate {
            ts.push(Token::Not).space();
        }
        ts.push(Token::In).space().lparen();
        ts.separated(values, &[Token::Comma], |ts, _| {
            ts.push(Token::Placeholder);
        });
        ts.rparen();
    }
    args.extend(values.iter().cloned());
}
