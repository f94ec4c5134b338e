//! Session operations. Each one takes the accumulated statement, so the
//! session is back to its unconfigured state however the call ends.

use std::sync::Arc;

use super::statement::{Projection, SetExpr, Statement};
use super::{Session, SessionError, SessionResult};
use crate::cache::{pk_key, Cacher};
use crate::db::{ExecResult, Record, Value};
use crate::schema::{Column, Table};
use crate::sql::{Cond, Token, TokenStream};

const NOW: &str = "CURRENT_TIMESTAMP";

/// One value position of an INSERT.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Arg(Value),
    Now,
}

impl Session<'_> {
    // =========================================================================
    // Raw SQL
    // =========================================================================

    pub fn exec(&mut self, sql: &str, args: Vec<Value>) -> SessionResult<ExecResult> {
        self.take_statement();
        self.run_exec(sql, args, None)
    }

    pub fn query(&mut self, sql: &str, args: Vec<Value>) -> SessionResult<Vec<Record>> {
        self.take_statement();
        Ok(self.run_query(sql, args, None)?.into_records())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// First matching row. A lookup configured only with [`Session::id`]
    /// reads through the table's cacher.
    pub fn get(&mut self, table: &Table) -> SessionResult<Option<Record>> {
        let mut stmt = self.take_statement();
        let name = target_name(&stmt, table)?;

        let cacher = self.cacher(&stmt, table);
        let cache_key = match (&cacher, &stmt.id) {
            (Some(_), Some(id)) if stmt.is_plain() && stmt.cond.is_none() => Some(pk_key(id)),
            _ => None,
        };
        if let (Some(cacher), Some(key)) = (&cacher, &cache_key) {
            if let Some(bean) = cacher.get_bean(&name, key) {
                tracing::trace!(table = %name, id = %key, "cache hit");
                run_after(&mut stmt, std::slice::from_ref(&bean));
                return Ok(Some(bean));
            }
        }

        let (sql, args) = match stmt.raw_sql.take() {
            Some(raw) => raw,
            None => {
                if stmt.limit.is_none() {
                    stmt.limit = Some(1);
                }
                stmt.select_sql(self.engine.dialect(), table, Projection::Rows)?
            }
        };
        let bean = self.run_query(&sql, args, Some(table))?.into_records().into_iter().next();

        if let (Some(cacher), Some(key), Some(bean)) = (&cacher, &cache_key, &bean) {
            cacher.put_bean(&name, key, bean.clone());
        }
        if let Some(bean) = &bean {
            run_after(&mut stmt, std::slice::from_ref(bean));
        }
        Ok(bean)
    }

    /// Every matching row. Plain queries on keyed tables cache the id list
    /// and the rows.
    pub fn find(&mut self, table: &Table) -> SessionResult<Vec<Record>> {
        let mut stmt = self.take_statement();
        let name = target_name(&stmt, table)?;

        let (sql, args) = match stmt.raw_sql.take() {
            Some(raw) => raw,
            None => stmt.select_sql(self.engine.dialect(), table, Projection::Rows)?,
        };

        let cacher = match self.cacher(&stmt, table) {
            Some(c) if stmt.is_plain() && !table.primary_keys.is_empty() => Some(c),
            _ => None,
        };
        let ids_key = format!("{} {}", sql, pk_key(&args));

        if let Some(cacher) = &cacher {
            if let Some(beans) = cached_beans(cacher.as_ref(), &name, &ids_key) {
                tracing::trace!(table = %name, rows = beans.len(), "cache hit");
                run_after(&mut stmt, &beans);
                return Ok(beans);
            }
        }

        let beans = self.run_query(&sql, args, Some(table))?.into_records();

        if let Some(cacher) = &cacher {
            let mut ids = Vec::with_capacity(beans.len());
            for bean in &beans {
                let id = pk_key(&pk_values(table, bean));
                cacher.put_bean(&name, &id, bean.clone());
                ids.push(id);
            }
            cacher.put_ids(&name, &ids_key, ids);
        }
        run_after(&mut stmt, &beans);
        Ok(beans)
    }

    pub fn count(&mut self, table: &Table) -> SessionResult<i64> {
        let row = self.aggregate(table, "COUNT(*)".to_string())?;
        Ok(row.first().and_then(Value::as_i64).unwrap_or(0))
    }

    /// `SUM(column)`; zero when no row matches.
    pub fn sum(&mut self, table: &Table, column: &str) -> SessionResult<f64> {
        Ok(self.sums(table, &[column])?.first().copied().unwrap_or(0.0))
    }

    pub fn sums(&mut self, table: &Table, columns: &[&str]) -> SessionResult<Vec<f64>> {
        let d = self.engine.dialect();
        let expr = columns
            .iter()
            .map(|c| format!("SUM({})", d.quote(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let row = self.aggregate(table, expr)?;
        Ok((0..columns.len())
            .map(|i| row.get(i).and_then(Value::as_f64).unwrap_or(0.0))
            .collect())
    }

    fn aggregate(&mut self, table: &Table, expr: String) -> SessionResult<Vec<Value>> {
        let stmt = self.take_statement();
        target_name(&stmt, table)?;
        let (sql, args) =
            stmt.select_sql(self.engine.dialect(), table, Projection::Aggregate(&expr))?;
        let rows = self.run_query(&sql, args, Some(table))?;
        Ok(rows.first().map(|r| r.values().to_vec()).unwrap_or_default())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert one record. Created and updated columns missing from it get
    /// the current time and a version column starts at 1.
    pub fn insert(&mut self, table: &Table, record: &Record) -> SessionResult<ExecResult> {
        let mut stmt = self.take_statement();
        let name = target_name(&stmt, table)?;

        let mut record = record.clone();
        run_before(&mut stmt, &mut record);
        check_columns(table, &name, &record)?;

        let layout = insert_layout(&stmt, table, &record);
        if layout.is_empty() {
            return Err(SessionError::EmptyRecord(name));
        }
        let names: Vec<&str> = layout.iter().map(|(n, _)| n.as_str()).collect();
        let slots: Vec<Slot> = layout.iter().map(|(_, s)| s.clone()).collect();
        let (sql, args) = self.insert_sql(&name, &names, std::slice::from_ref(&slots));

        let result = self.run_exec(&sql, args, Some(table))?;
        self.invalidate(table, &name, false);
        run_after(&mut stmt, std::slice::from_ref(&record));
        Ok(result)
    }

    /// Insert several records: one multi-row statement when the dialect
    /// supports it, otherwise one statement per record. Every column any
    /// record writes is listed; records without it write NULL.
    pub fn insert_multi(&mut self, table: &Table, records: &[Record]) -> SessionResult<u64> {
        let mut stmt = self.take_statement();
        let name = target_name(&stmt, table)?;
        if records.is_empty() {
            return Ok(0);
        }

        let mut records = records.to_vec();
        for record in &mut records {
            run_before(&mut stmt, record);
            check_columns(table, &name, record)?;
        }

        let layouts: Vec<_> = records
            .iter()
            .map(|record| insert_layout(&stmt, table, record))
            .collect();
        let mut names: Vec<&str> = Vec::new();
        for (n, _) in layouts.iter().flatten() {
            if !names.contains(&n.as_str()) {
                names.push(n);
            }
        }
        if !table.columns().is_empty() {
            names = table
                .columns()
                .iter()
                .map(|c| c.name.as_str())
                .filter(|n| names.contains(n))
                .collect();
        }
        if names.is_empty() {
            return Err(SessionError::EmptyRecord(name));
        }
        let rows: Vec<Vec<Slot>> = layouts
            .iter()
            .map(|layout| {
                names
                    .iter()
                    .map(|n| {
                        layout
                            .iter()
                            .find(|(m, _)| m.as_str() == *n)
                            .map_or(Slot::Arg(Value::Null), |(_, slot)| slot.clone())
                    })
                    .collect()
            })
            .collect();

        let affected = if self.engine.supports_insert_many() {
            let (sql, args) = self.insert_sql(&name, &names, &rows);
            self.run_exec(&sql, args, Some(table))?.rows_affected
        } else {
            let mut affected = 0;
            for row in &rows {
                let (sql, args) = self.insert_sql(&name, &names, std::slice::from_ref(row));
                affected += self.run_exec(&sql, args, Some(table))?.rows_affected;
            }
            affected
        };

        self.invalidate(table, &name, false);
        run_after(&mut stmt, &records);
        Ok(affected)
    }

    /// Update matching rows from `record`.
    ///
    /// Without explicit conditions, a record carrying every primary-key
    /// value updates that row. A version value in the record becomes an
    /// optimistic-lock condition and the stored version is incremented.
    pub fn update(&mut self, table: &Table, record: &Record) -> SessionResult<u64> {
        let mut stmt = self.take_statement();
        let name = target_name(&stmt, table)?;

        let mut record = record.clone();
        run_before(&mut stmt, &mut record);
        check_columns(table, &name, &record)?;

        let d = self.engine.dialect();
        let mut ts = TokenStream::new();
        let mut args = Vec::new();
        let mut sets: Vec<TokenStream> = Vec::new();

        let set = |column: &str, rhs: Vec<Token>| {
            let mut ts = TokenStream::new();
            ts.push(Token::Ident(column.to_string()))
                .space()
                .push(Token::Eq)
                .space()
                .extend(rhs);
            ts
        };
        let shifted = |column: &str, op: Token, amount: Token| {
            vec![
                Token::Ident(column.to_string()),
                Token::Space,
                op,
                Token::Space,
                amount,
            ]
        };

        if table.columns().is_empty() {
            for (column, value) in &record {
                sets.push(set(column, vec![Token::Placeholder]));
                args.push(value.clone());
            }
        } else {
            for col in table.columns() {
                if col.is_primary_key
                    || col.is_auto_increment
                    || col.is_created
                    || col.is_version
                    || !stmt.includes(&col.name)
                {
                    continue;
                }
                match record.get(&col.name) {
                    Some(value) => {
                        sets.push(set(&col.name, vec![Token::Placeholder]));
                        args.push(value.clone());
                    }
                    None if col.is_updated && !stmt.no_auto_time => {
                        sets.push(set(&col.name, vec![Token::Raw(NOW.into())]));
                    }
                    None => {}
                }
            }
        }

        for (column, expr) in &stmt.sets {
            let rhs = match expr {
                SetExpr::Incr(value) => {
                    args.push(value.clone());
                    shifted(column, Token::Plus, Token::Placeholder)
                }
                SetExpr::Decr(value) => {
                    args.push(value.clone());
                    shifted(column, Token::Minus, Token::Placeholder)
                }
                SetExpr::Raw(raw) => vec![Token::Raw(raw.clone())],
            };
            sets.push(set(column, rhs));
        }

        if sets.is_empty() {
            return Err(SessionError::EmptyRecord(name));
        }

        if stmt.id.is_none() && stmt.cond.is_none() {
            let pk = pk_values(table, &record);
            if !pk.is_empty() && pk.iter().all(|v| !v.is_null()) {
                stmt.id = Some(pk);
            }
        }

        if let Some(version) = table.version_column() {
            if stmt.includes(&version.name) {
                let rhs = shifted(&version.name, Token::Plus, Token::LitInt(1));
                sets.push(set(&version.name, rhs));
                if let Some(current) = record.get(&version.name) {
                    stmt.and(Cond::eq(version.name.clone(), current.clone()));
                }
            }
        }

        ts.push(Token::Update)
            .space()
            .push(Token::Ident(name.clone()))
            .space()
            .push(Token::Set)
            .space();
        ts.separated(&sets, &[Token::Comma, Token::Space], |ts, s| {
            ts.append(s);
        });
        let cond = stmt.where_cond(table)?;
        stmt.where_tokens(&mut ts, &mut args, cond.as_ref());

        let sql = ts.serialize(d);
        let result = self.run_exec(&sql, args, Some(table))?;
        self.invalidate(table, &name, true);
        run_after(&mut stmt, std::slice::from_ref(&record));
        Ok(result.rows_affected)
    }

    /// Delete matching rows. With a deleted column this stamps it instead,
    /// unless [`Session::unscoped`] was called.
    pub fn delete(&mut self, table: &Table) -> SessionResult<u64> {
        let stmt = self.take_statement();
        let name = target_name(&stmt, table)?;
        let d = self.engine.dialect();

        let mut ts = TokenStream::new();
        let mut args = Vec::new();
        match (&table.deleted, stmt.unscoped) {
            (Some(deleted), false) => {
                ts.push(Token::Update)
                    .space()
                    .push(Token::Ident(name.clone()))
                    .space()
                    .push(Token::Set)
                    .space()
                    .push(Token::Ident(deleted.clone()))
                    .space()
                    .push(Token::Eq)
                    .space()
                    .push(Token::Raw(NOW.into()));
            }
            _ => {
                ts.push(Token::Delete)
                    .space()
                    .push(Token::From)
                    .space()
                    .push(Token::Ident(name.clone()));
            }
        }
        let cond = stmt.where_cond(table)?;
        stmt.where_tokens(&mut ts, &mut args, cond.as_ref());

        let sql = ts.serialize(d);
        let result = self.run_exec(&sql, args, Some(table))?;
        self.invalidate(table, &name, true);
        Ok(result.rows_affected)
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// CREATE TABLE with the engine and charset from, in order: this
    /// session, the table metadata, the engine.
    pub fn create_table(&mut self, table: &Table) -> SessionResult<()> {
        let stmt = self.take_statement();
        let name = target_name(&stmt, table)?;
        let engine = self.engine;

        let store_engine = stmt
            .store_engine
            .as_deref()
            .or(table.store_engine.as_deref())
            .unwrap_or(engine.store_engine());
        let charset = stmt
            .charset
            .as_deref()
            .or(table.charset.as_deref())
            .unwrap_or(engine.charset());

        let sql = engine
            .dialect()
            .create_table_sql(table, &name, store_engine, charset);
        self.run_native(sql, Vec::new())?;
        Ok(())
    }

    /// Create the table's non-unique indexes.
    pub fn create_indexes(&mut self, table: &Table) -> SessionResult<()> {
        self.create_index_kind(table, false)
    }

    /// Create the table's unique indexes.
    pub fn create_uniques(&mut self, table: &Table) -> SessionResult<()> {
        self.create_index_kind(table, true)
    }

    fn create_index_kind(&mut self, table: &Table, unique: bool) -> SessionResult<()> {
        let stmt = self.take_statement();
        let name = target_name(&stmt, table)?;
        let engine = self.engine;
        let d = engine.dialect();
        for index in table.indexes.values().filter(|i| i.is_unique() == unique) {
            self.run_native(d.create_index_sql(&name, index), Vec::new())?;
        }
        Ok(())
    }

    pub fn drop_indexes(&mut self, table: &Table) -> SessionResult<()> {
        let stmt = self.take_statement();
        let name = target_name(&stmt, table)?;
        let engine = self.engine;
        let d = engine.dialect();
        for index in table.indexes.values() {
            self.run_native(d.drop_index_sql(&name, index), Vec::new())?;
        }
        Ok(())
    }

    pub fn drop_table(&mut self, table: &Table) -> SessionResult<()> {
        let stmt = self.take_statement();
        let name = target_name(&stmt, table)?;
        let sql = self.engine.dialect().drop_table_sql(&name);
        self.run_native(sql, Vec::new())?;
        self.invalidate(table, &name, true);
        Ok(())
    }

    pub fn is_table_exist(&mut self, table_name: &str) -> SessionResult<bool> {
        self.take_statement();
        Ok(self
            .engine
            .dialect()
            .is_table_exist(&mut *self.conn, table_name)?)
    }

    pub fn is_table_empty(&mut self, table: &Table) -> SessionResult<bool> {
        Ok(self.count(table)? == 0)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn insert_sql(&self, name: &str, columns: &[&str], rows: &[Vec<Slot>]) -> (String, Vec<Value>) {
        let mut ts = TokenStream::new();
        let mut args = Vec::new();
        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .push(Token::Ident(name.to_string()))
            .space()
            .lparen();
        ts.separated(columns, &[Token::Comma, Token::Space], |ts, col| {
            ts.push(Token::Ident(col.to_string()));
        });
        ts.rparen().space().push(Token::Values).space();
        ts.separated(rows, &[Token::Comma, Token::Space], |ts, row| {
            ts.lparen();
            ts.separated(row, &[Token::Comma, Token::Space], |ts, slot| match slot {
                Slot::Arg(value) => {
                    args.push(value.clone());
                    ts.push(Token::Placeholder);
                }
                Slot::Now => {
                    ts.push(Token::Raw(NOW.into()));
                }
            });
            ts.rparen();
        });
        (ts.serialize(self.engine.dialect()), args)
    }

    fn cacher(&self, stmt: &Statement, table: &Table) -> Option<Arc<dyn Cacher>> {
        if stmt.no_cache {
            return None;
        }
        self.engine.cacher_for(table)
    }

    /// Mutations drop cached id lists; updates and deletes drop rows too.
    fn invalidate(&self, table: &Table, name: &str, rows_changed: bool) {
        if let Some(cacher) = self.engine.cacher_for(table) {
            cacher.clear_ids(name);
            if rows_changed {
                cacher.clear_beans(name);
            }
        }
    }
}

fn target_name(stmt: &Statement, table: &Table) -> SessionResult<String> {
    let name = stmt.table_name(table);
    if name.is_empty() {
        return Err(SessionError::NoTable);
    }
    Ok(name.to_string())
}

fn check_columns(table: &Table, name: &str, record: &Record) -> SessionResult<()> {
    if table.columns().is_empty() {
        return Ok(());
    }
    match record.keys().find(|k| table.get_column(k).is_none()) {
        Some(column) => Err(SessionError::UnknownColumn {
            table: name.to_string(),
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

/// Columns and values of an INSERT for `record`, in table order.
fn insert_layout(stmt: &Statement, table: &Table, record: &Record) -> Vec<(String, Slot)> {
    if table.columns().is_empty() {
        return record
            .iter()
            .filter(|(k, _)| stmt.includes(k))
            .map(|(k, v)| (k.clone(), Slot::Arg(v.clone())))
            .collect();
    }
    table
        .columns()
        .iter()
        .filter_map(|col| {
            insert_slot(stmt, col, record).map(|slot| (col.name.clone(), slot))
        })
        .collect()
}

/// Value for one column of an INSERT, or `None` to leave it to the database.
fn insert_slot(stmt: &Statement, col: &Column, record: &Record) -> Option<Slot> {
    if !stmt.includes(&col.name) {
        return None;
    }
    let given = record.get(&col.name);

    match given {
        Some(value) if !(col.is_auto_increment && value.is_null()) => Some(Slot::Arg(value.clone())),
        _ if col.is_auto_increment => None,
        _ if col.is_version => Some(Slot::Arg(Value::Int(1))),
        _ if (col.is_created || col.is_updated) && !stmt.no_auto_time => Some(Slot::Now),
        Some(value) => Some(Slot::Arg(value.clone())),
        None => None,
    }
}

fn pk_values(table: &Table, record: &Record) -> Vec<Value> {
    table
        .primary_keys
        .iter()
        .map(|pk| record.get(pk).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Rows for a cached id list, or `None` if the list or any row is missing.
fn cached_beans(cacher: &dyn Cacher, table: &str, key: &str) -> Option<Vec<Record>> {
    cacher
        .get_ids(table, key)?
        .iter()
        .map(|id| cacher.get_bean(table, id))
        .collect()
}

fn run_before(stmt: &mut Statement, record: &mut Record) {
    for hook in &mut stmt.before {
        hook(record);
    }
}

fn run_after(stmt: &mut Statement, records: &[Record]) {
    for record in records {
        for hook in &mut stmt.after {
            hook(record);
        }
    }
}
