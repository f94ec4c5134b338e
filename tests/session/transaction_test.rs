use dialectic::db::{Connection, DbError, DbResult, ExecResult, Record, Rows, Value};
use dialectic::dialect::Sqlite;
use dialectic::schema::{Column, DataType, Table};
use dialectic::session::{SessionError, SessionState};
use dialectic::Engine;

fn note_table() -> Table {
    Table::new("note")
        .column(Column::new("id", DataType::Int64).primary_key().auto_increment())
        .unwrap()
        .column(Column::new("body", DataType::String))
        .unwrap()
}

fn note(body: &str) -> Record {
    let mut r = Record::new();
    r.insert("body".into(), Value::from(body));
    r
}

fn setup(engine: &Engine) -> rusqlite::Connection {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    engine.create_tables(&mut conn, &[note_table()]).unwrap();
    conn
}

/// Handle whose transaction control always fails.
struct BrokenTx;

impl Connection for BrokenTx {
    fn query(&mut self, _sql: &str, _args: &[Value]) -> DbResult<Rows> {
        Ok(Rows::default())
    }

    fn exec(&mut self, _sql: &str, _args: &[Value]) -> DbResult<ExecResult> {
        Ok(ExecResult::default())
    }

    fn begin(&mut self) -> DbResult<()> {
        Err(DbError::Driver("connection reset".into()))
    }
}

#[test]
fn test_double_begin_keeps_transaction() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);

    session.begin().unwrap();
    let err = session.begin().unwrap_err();
    assert!(matches!(err, SessionError::AlreadyInTransaction));
    assert_eq!(session.state(), SessionState::InTransaction);
    session.commit().unwrap();
    assert_eq!(session.state(), SessionState::Init);
}

#[test]
fn test_commit_and_rollback_need_a_transaction() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);

    assert!(matches!(session.commit(), Err(SessionError::NotInTransaction)));
    assert!(matches!(session.rollback(), Err(SessionError::NotInTransaction)));
    assert!(!session.is_in_transaction());
}

#[test]
fn test_rollback_discards_and_commit_keeps() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = note_table();

    session.begin().unwrap();
    session.insert(&table, &note("draft")).unwrap();
    assert_eq!(session.count(&table).unwrap(), 1);
    session.rollback().unwrap();
    assert_eq!(session.count(&table).unwrap(), 0);

    session.begin().unwrap();
    session.insert(&table, &note("final")).unwrap();
    session.commit().unwrap();
    assert_eq!(session.count(&table).unwrap(), 1);
}

#[test]
fn test_drop_inside_transaction_rolls_back() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let table = note_table();

    {
        let mut session = engine.new_session(&mut conn);
        session.begin().unwrap();
        session.insert(&table, &note("lost")).unwrap();
    }

    let mut session = engine.new_session(&mut conn);
    assert_eq!(session.count(&table).unwrap(), 0);
    // The connection is usable for a new transaction.
    session.begin().unwrap();
    session.commit().unwrap();
}

#[test]
fn test_failed_begin_leaves_state_unchanged() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = BrokenTx;
    let mut session = engine.new_session(&mut conn);

    let err = session.begin().unwrap_err();
    assert!(matches!(err, SessionError::Db(DbError::Driver(_))));
    assert_eq!(session.state(), SessionState::Init);
}
