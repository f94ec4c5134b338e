//! Per-operation state accumulated by chained session calls, and the SELECT
//! rendering that reads it.
//!
//! Everything is written with `?` placeholders and backtick-free identifiers
//! quoted through the dialect; the dialect's filters run later, at execution.

use super::{SessionError, SessionResult};
use crate::db::{Record, Value};
use crate::dialect::Dialect;
use crate::schema::Table;
use crate::sql::{Cond, Token, TokenStream};

pub(crate) type BeforeHook = Box<dyn FnMut(&mut Record)>;
pub(crate) type AfterHook = Box<dyn FnMut(&Record)>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Order {
    Raw(String),
    Asc(String),
    Desc(String),
}

/// Right-hand side of an explicit `SET` entry on update.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SetExpr {
    Incr(Value),
    Decr(Value),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Join {
    pub op: String,
    pub table: String,
    pub on: String,
}

/// What a SELECT returns.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Projection<'a> {
    /// Row data: explicit selection, `cols`, or every non-omitted column.
    Rows,
    /// A single aggregate row; ordering, paging and locking are dropped.
    Aggregate(&'a str),
}

/// Accumulated clauses for the next operation. Taken (and so reset) by
/// every operation, on success and on error alike.
#[derive(Default)]
pub struct Statement {
    pub(crate) touched: bool,
    pub(crate) raw_sql: Option<(String, Vec<Value>)>,
    pub(crate) cond: Option<Cond>,
    pub(crate) id: Option<Vec<Value>>,
    pub(crate) select: Option<String>,
    pub(crate) cols: Vec<String>,
    pub(crate) omit: Vec<String>,
    pub(crate) distinct: Vec<String>,
    pub(crate) for_update: bool,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) order: Vec<Order>,
    pub(crate) group_by: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) joins: Vec<Join>,
    pub(crate) table_name: Option<String>,
    pub(crate) alias: Option<String>,
    pub(crate) store_engine: Option<String>,
    pub(crate) charset: Option<String>,
    pub(crate) no_cache: bool,
    pub(crate) unscoped: bool,
    pub(crate) no_auto_time: bool,
    pub(crate) sets: Vec<(String, SetExpr)>,
    pub(crate) before: Vec<BeforeHook>,
    pub(crate) after: Vec<AfterHook>,
}

impl Statement {
    pub(crate) fn and(&mut self, cond: Cond) {
        self.cond = Some(match self.cond.take() {
            Some(existing) => existing.and(cond),
            None => cond,
        });
    }

    pub(crate) fn or(&mut self, cond: Cond) {
        self.cond = Some(match self.cond.take() {
            Some(existing) => existing.or(cond),
            None => cond,
        });
    }

    /// Target table name: the `table()` override, else the metadata name.
    pub(crate) fn table_name<'t>(&'t self, table: &'t Table) -> &'t str {
        self.table_name.as_deref().unwrap_or(&table.name)
    }

    /// Whether `cols`/`omit` let `column` through.
    pub(crate) fn includes(&self, column: &str) -> bool {
        let listed = |names: &[String]| names.iter().any(|n| n.eq_ignore_ascii_case(column));
        (self.cols.is_empty() || listed(&self.cols)) && !listed(&self.omit)
    }

    /// True when nothing but an id lookup was configured, so a cached row
    /// answers the query exactly.
    pub(crate) fn is_plain(&self) -> bool {
        self.raw_sql.is_none()
            && self.select.is_none()
            && self.cols.is_empty()
            && self.omit.is_empty()
            && self.distinct.is_empty()
            && self.joins.is_empty()
            && self.group_by.is_none()
            && !self.for_update
            && !self.unscoped
    }

    /// The WHERE tree: user conditions, then the id, then the soft-delete
    /// filter unless unscoped.
    ///
    /// An id must carry exactly one value per primary-key column.
    pub(crate) fn where_cond(&self, table: &Table) -> SessionResult<Option<Cond>> {
        let mut conds = Vec::new();
        if let Some(cond) = &self.cond {
            conds.push(cond.clone());
        }
        if let Some(id) = &self.id {
            if id.len() != table.primary_keys.len() {
                return Err(SessionError::IdMismatch {
                    table: self.table_name(table).to_string(),
                    expected: table.primary_keys.len(),
                    got: id.len(),
                });
            }
            for (pk, value) in table.primary_keys.iter().zip(id) {
                conds.push(Cond::eq(pk.clone(), value.clone()));
            }
        }
        if let (Some(deleted), false) = (&table.deleted, self.unscoped) {
            conds.push(Cond::IsNull(deleted.clone()));
        }

        // A user OR stays one grouped operand; only ANDs flatten.
        let mut conds = conds.into_iter();
        Ok(conds.next().map(|first| conds.fold(first, Cond::and)))
    }

    pub(crate) fn where_tokens(
        &self,
        ts: &mut TokenStream,
        args: &mut Vec<Value>,
        cond: Option<&Cond>,
    ) {
        if let Some(cond) = cond {
            ts.space().push(Token::Where).space();
            cond.to_tokens(ts, args);
        }
    }

    /// Columns a row SELECT names, or empty for `*`.
    pub(crate) fn select_columns(&self, table: &Table) -> Vec<String> {
        if !self.cols.is_empty() {
            return self
                .cols
                .iter()
                .filter(|c| self.includes(c))
                .cloned()
                .collect();
        }
        if self.omit.is_empty() {
            return Vec::new();
        }
        table
            .columns()
            .iter()
            .filter(|c| self.includes(&c.name))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Render the SELECT for this statement against `table`.
    pub(crate) fn select_sql<D: Dialect + ?Sized>(
        &self,
        d: &D,
        table: &Table,
        projection: Projection<'_>,
    ) -> SessionResult<(String, Vec<Value>)> {
        let mut ts = TokenStream::new();
        let mut args = Vec::new();

        ts.push(Token::Select).space();
        match projection {
            Projection::Aggregate(expr) => {
                ts.push(Token::Raw(expr.to_string()));
            }
            Projection::Rows => self.projection_tokens(&mut ts, table),
        }

        ts.space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.table_name(table).to_string()));
        if let Some(alias) = &self.alias {
            ts.space().push(Token::As).space().push(Token::Ident(alias.clone()));
        }

        for join in &self.joins {
            ts.space()
                .push(Token::Raw(join.op.to_uppercase()))
                .space()
                .push(Token::Join)
                .space()
                .push(Token::Ident(join.table.clone()))
                .space()
                .push(Token::On)
                .space()
                .push(Token::Raw(join.on.clone()));
        }

        let cond = self.where_cond(table)?;
        self.where_tokens(&mut ts, &mut args, cond.as_ref());

        if let Some(group_by) = &self.group_by {
            ts.space().push(Token::GroupBy).space().push(Token::Raw(group_by.clone()));
        }
        if let Some(having) = &self.having {
            ts.space().push(Token::Having).space().push(Token::Raw(having.clone()));
        }

        if let Projection::Aggregate(_) = projection {
            return Ok((ts.serialize(d), args));
        }

        if !self.order.is_empty() {
            ts.space().push(Token::OrderBy).space();
            ts.separated(&self.order, &[Token::Comma, Token::Space], |ts, order| {
                match order {
                    Order::Raw(raw) => ts.push(Token::Raw(raw.clone())),
                    Order::Asc(col) => ts
                        .push(Token::Ident(col.clone()))
                        .space()
                        .push(Token::Raw("ASC".into())),
                    Order::Desc(col) => ts
                        .push(Token::Ident(col.clone()))
                        .space()
                        .push(Token::Raw("DESC".into())),
                };
            });
        }

        let mut sql = ts.serialize(d);

        if self.limit.is_some() || self.offset.is_some() {
            if self.order.is_empty() && d.requires_order_by_for_limit() {
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            let limit = d.limit_sql(self.limit, self.offset);
            if !limit.is_empty() {
                sql.push(' ');
                sql.push_str(&limit);
            }
        }

        if self.for_update {
            sql = d.for_update_sql(&sql);
        }

        Ok((sql, args))
    }

    fn projection_tokens(&self, ts: &mut TokenStream, table: &Table) {
        if let Some(select) = &self.select {
            ts.push(Token::Raw(select.clone()));
            return;
        }
        if !self.distinct.is_empty() {
            ts.push(Token::Distinct).space();
            ts.separated(&self.distinct, &[Token::Comma, Token::Space], |ts, col| {
                ts.push(Token::Ident(col.clone()));
            });
            return;
        }
        let columns = self.select_columns(table);
        if columns.is_empty() {
            ts.push(Token::Star);
        } else {
            ts.separated(&columns, &[Token::Comma, Token::Space], |ts, col| {
                ts.push(Token::Ident(col.clone()));
            });
        }
    }
}
