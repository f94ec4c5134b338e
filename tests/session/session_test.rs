use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use dialectic::cache::{Cacher, MemoryCacher};
use dialectic::db::{Record, Value};
use dialectic::dialect::Sqlite;
use dialectic::log::SqlLogger;
use dialectic::schema::{Column, DataType, Table};
use dialectic::session::{SessionError, SessionState};
use dialectic::Engine;

fn post_table() -> Table {
    Table::new("post")
        .column(Column::new("id", DataType::Int64).primary_key().auto_increment())
        .unwrap()
        .column(Column::new("title", DataType::Varchar(128)).not_null())
        .unwrap()
        .column(Column::new("views", DataType::Int32).default_value("0"))
        .unwrap()
        .column(Column::new("created_at", DataType::Timestamp).created())
        .unwrap()
}

fn post(title: &str) -> Record {
    let mut r = Record::new();
    r.insert("title".into(), Value::from(title));
    r
}

fn setup(engine: &Engine) -> rusqlite::Connection {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    engine.create_tables(&mut conn, &[post_table()]).unwrap();
    conn
}

#[derive(Debug, Default)]
struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl SqlLogger for CaptureLogger {
    fn log_sql(&self, message: &str, sql: &str, _args: &[Value]) {
        self.lines.lock().unwrap().push(format!("{}: {}", message, sql));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("warn: {}", message));
    }
}

#[test]
fn test_crud_round_trip() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();

    let first = session.insert(&table, &post("hello")).unwrap();
    assert_eq!(first.last_insert_id, Some(1));
    session.insert(&table, &post("world")).unwrap();

    let row = session.id([2]).get(&table).unwrap().unwrap();
    assert_eq!(row["title"], Value::from("world"));
    assert_eq!(row["views"], Value::Int(0));
    assert!(!row["created_at"].is_null());

    let mut changed = Record::new();
    changed.insert("title".into(), "world!".into());
    assert_eq!(session.id([2]).update(&table, &changed).unwrap(), 1);

    let titles: Vec<_> = session
        .desc(&["id"])
        .find(&table)
        .unwrap()
        .into_iter()
        .map(|r| r["title"].clone())
        .collect();
    assert_eq!(titles, vec![Value::from("world!"), Value::from("hello")]);

    assert_eq!(session.in_("id", [1, 2]).delete(&table).unwrap(), 2);
    assert!(session.is_table_empty(&table).unwrap());
}

#[test]
fn test_chained_clauses_render_into_sql() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();
    for title in ["a", "b", "c"] {
        session.insert(&table, &post(title)).unwrap();
    }

    let rows = session
        .cols(&["id", "title"])
        .where_("title <> ?", vec!["a".into()])
        .asc(&["id"])
        .limit(1, 1)
        .find(&table)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], Value::from("c"));
    assert_eq!(rows[0].len(), 2);

    let (sql, args) = session.last_sql().unwrap();
    assert_eq!(
        sql,
        "SELECT `id`, `title` FROM `post` WHERE title <> ? ORDER BY `id` ASC LIMIT 1 OFFSET 1"
    );
    assert_eq!(args, [Value::from("a")]);

    let rows = session.not_in("title", ["a", "b"]).find(&table).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(session.last_sql().unwrap().0, "SELECT * FROM `post` WHERE `title` NOT IN (?,?)");
}

#[test]
fn test_cols_limit_insert_columns() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();

    session.cols(&["title"]).insert(&table, &post("x")).unwrap();
    assert_eq!(
        session.last_sql().unwrap().0,
        "INSERT INTO `post` (`title`) VALUES (?)"
    );

    let row = session.id([1]).get(&table).unwrap().unwrap();
    assert!(row["created_at"].is_null());
}

#[test]
fn test_raw_sql_and_query() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();
    session.insert(&table, &post("a")).unwrap();
    session.insert(&table, &post("b")).unwrap();

    let rows = session
        .sql("SELECT title FROM post WHERE title = ?", vec!["b".into()])
        .find(&table)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], Value::from("b"));

    let rows = session
        .query("SELECT COUNT(*) AS n FROM post", Vec::new())
        .unwrap();
    assert_eq!(rows[0]["n"], Value::Int(2));

    let result = session
        .exec("UPDATE post SET views = views + 1", Vec::new())
        .unwrap();
    assert_eq!(result.rows_affected, 2);
    assert_eq!(session.sum(&table, "views").unwrap(), 2.0);
}

#[test]
fn test_state_machine() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();

    assert_eq!(session.state(), SessionState::Init);
    session.id([1]);
    assert_eq!(session.state(), SessionState::Building);
    session.reset();
    assert_eq!(session.state(), SessionState::Init);

    // Configuration is consumed by the failing operation too.
    let err = session.table("").get(&table).unwrap_err();
    assert!(matches!(err, SessionError::NoTable));
    assert_eq!(session.state(), SessionState::Init);
    assert!(session.last_sql().is_none());

    let err = session.update(&table, &Record::new()).unwrap_err();
    assert!(matches!(err, SessionError::EmptyRecord(_)));
}

#[test]
fn test_hooks_see_records() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    session
        .before(|r| {
            let title = r["title"].as_str().unwrap_or_default().to_uppercase();
            r.insert("title".into(), title.into());
        })
        .after(move |r| sink.borrow_mut().push(r["title"].clone()))
        .insert(&table, &post("quiet"))
        .unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from("QUIET")]);

    let sink = seen.clone();
    session
        .after(move |r| sink.borrow_mut().push(r["id"].clone()))
        .find(&table)
        .unwrap();
    assert_eq!(seen.borrow().last(), Some(&Value::Int(1)));

    // Hooks belong to one operation.
    session.find(&table).unwrap();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_cacher_reads_through_and_invalidates() {
    let cacher = Arc::new(MemoryCacher::new());
    let mut engine = Engine::new(Box::new(Sqlite::new()));
    engine.set_default_cacher(Some(cacher.clone() as Arc<dyn Cacher>));
    let mut conn = setup(&engine);
    let mut session = engine.new_session(&mut conn);
    let table = post_table();
    session.insert(&table, &post("a")).unwrap();
    session.insert(&table, &post("b")).unwrap();

    session.id([1]).get(&table).unwrap().unwrap();
    assert!(session.last_sql().is_some());
    assert_eq!(cacher.bean_count("post"), 1);

    let cached = session.id([1]).get(&table).unwrap().unwrap();
    assert_eq!(cached["title"], Value::from("a"));
    assert!(session.last_sql().is_none());

    assert_eq!(session.find(&table).unwrap().len(), 2);
    assert_eq!(cacher.ids_count("post"), 1);
    assert_eq!(session.find(&table).unwrap().len(), 2);
    assert!(session.last_sql().is_none());

    // Opting out always hits the database.
    session.no_cache().id([1]).get(&table).unwrap();
    assert!(session.last_sql().is_some());

    let mut changed = Record::new();
    changed.insert("title".into(), "a2".into());
    session.id([1]).update(&table, &changed).unwrap();
    assert_eq!(cacher.bean_count("post"), 0);
    assert_eq!(cacher.ids_count("post"), 0);

    let fresh = session.id([1]).get(&table).unwrap().unwrap();
    assert_eq!(fresh["title"], Value::from("a2"));
}

#[test]
fn test_show_sql_routes_to_logger() {
    let logger = Arc::new(CaptureLogger::default());
    let mut engine = Engine::new(Box::new(Sqlite::new()));
    engine.set_logger(logger.clone());
    let mut conn = setup(&engine);

    let table = post_table();
    engine
        .new_session(&mut conn)
        .insert(&table, &post("quiet"))
        .unwrap();
    assert!(logger.lines.lock().unwrap().is_empty());

    engine.show_sql(true);
    let mut session = engine.new_session(&mut conn);
    session.count(&table).unwrap();
    let lines = logger.lines.lock().unwrap();
    assert_eq!(lines.as_slice(), ["query: SELECT COUNT(*) FROM `post`"]);
}

fn note_table() -> Table {
    Table::new("note")
        .column(Column::new("id", DataType::Int64).primary_key().auto_increment())
        .unwrap()
        .column(Column::new("title", DataType::Varchar(64)))
        .unwrap()
        .column(Column::new("deleted_at", DataType::Timestamp).deleted())
        .unwrap()
}

#[test]
fn test_unscoped_reads_bypass_cache() {
    let cacher = Arc::new(MemoryCacher::new());
    let mut engine = Engine::new(Box::new(Sqlite::new()));
    engine.set_default_cacher(Some(cacher.clone() as Arc<dyn Cacher>));
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    let table = note_table();
    engine.create_tables(&mut conn, &[table.clone()]).unwrap();
    let mut session = engine.new_session(&mut conn);

    session.insert(&table, &post("gone")).unwrap();
    session.insert(&table, &post("kept")).unwrap();
    assert_eq!(session.id([1]).delete(&table).unwrap(), 1);

    let hidden = session.unscoped().id([1]).get(&table).unwrap().unwrap();
    assert!(!hidden["deleted_at"].is_null());
    assert_eq!(session.unscoped().find(&table).unwrap().len(), 2);
    assert_eq!(cacher.bean_count("note"), 0);
    assert_eq!(cacher.ids_count("note"), 0);

    assert!(session.id([1]).get(&table).unwrap().is_none());
    let visible = session.find(&table).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["title"], Value::from("kept"));
}

#[test]
fn test_id_must_match_primary_key() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    let keyless = Table::new("log")
        .column(Column::new("msg", DataType::Varchar(64)))
        .unwrap();
    let pair = Table::new("pair")
        .column(Column::new("a", DataType::Int32).primary_key())
        .unwrap()
        .column(Column::new("b", DataType::Int32).primary_key())
        .unwrap();
    engine
        .create_tables(&mut conn, &[keyless.clone(), pair.clone()])
        .unwrap();
    let mut session = engine.new_session(&mut conn);

    for msg in ["x", "y", "z"] {
        let mut r = Record::new();
        r.insert("msg".into(), msg.into());
        session.insert(&keyless, &r).unwrap();
    }
    for (a, b) in [(1, 1), (1, 2)] {
        let mut r = Record::new();
        r.insert("a".into(), a.into());
        r.insert("b".into(), b.into());
        session.insert(&pair, &r).unwrap();
    }

    let err = session.id([42]).delete(&keyless).unwrap_err();
    assert!(matches!(
        err,
        SessionError::IdMismatch { expected: 0, got: 1, .. }
    ));
    assert!(session.last_sql().is_none());
    assert_eq!(session.state(), SessionState::Init);

    let err = session.id([1]).delete(&pair).unwrap_err();
    assert!(matches!(
        err,
        SessionError::IdMismatch { expected: 2, got: 1, .. }
    ));
    assert!(session.id([1]).get(&pair).is_err());

    assert_eq!(session.count(&keyless).unwrap(), 3);
    assert_eq!(session.count(&pair).unwrap(), 2);
    assert_eq!(session.id([1, 2]).delete(&pair).unwrap(), 1);
    assert_eq!(session.count(&pair).unwrap(), 1);
}
