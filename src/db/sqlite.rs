//! [`Connection`] for an embedded SQLite database via `rusqlite`.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqliteValue, ValueRef};

use super::{Connection, DbResult, ExecResult, Rows, Value};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(*b as i64)),
            Value::Int(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

impl Connection for rusqlite::Connection {
    fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Rows> {
        let mut stmt = self.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_value_ref(row.get_ref(i)?));
            }
            out.push(values);
        }

        Ok(Rows::new(columns, out))
    }

    fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<ExecResult> {
        let affected = self.execute(sql, rusqlite::params_from_iter(args.iter()))?;
        let is_insert = sql
            .trim_start()
            .get(..6)
            .is_some_and(|kw| kw.eq_ignore_ascii_case("INSERT"));

        Ok(ExecResult {
            rows_affected: affected as u64,
            last_insert_id: (is_insert && affected > 0).then(|| self.last_insert_rowid()),
        })
    }

    fn begin(&mut self) -> DbResult<()> {
        self.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")?;
        Ok(())
    }
}
