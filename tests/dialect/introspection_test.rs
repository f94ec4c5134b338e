use dialectic::db::{Connection, DbResult, ExecResult, Rows, Value};
use dialectic::dialect::{Dialect, MySql, Postgres, Sqlite};
use dialectic::schema::{Column, DataType, Index, IndexKind, Table};
use dialectic::Engine;

/// Connection double that answers every query with the next scripted result
/// set and records what it was sent.
#[derive(Default)]
struct ScriptedConn {
    results: Vec<Rows>,
    seen: Vec<(String, Vec<Value>)>,
}

impl ScriptedConn {
    fn with(results: Vec<Rows>) -> Self {
        Self {
            results,
            seen: Vec::new(),
        }
    }
}

impl Connection for ScriptedConn {
    fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Rows> {
        self.seen.push((sql.to_string(), args.to_vec()));
        Ok(if self.results.is_empty() {
            Rows::default()
        } else {
            self.results.remove(0)
        })
    }

    fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<ExecResult> {
        self.seen.push((sql.to_string(), args.to_vec()));
        Ok(ExecResult::default())
    }
}

fn rows(columns: &[&str], data: Vec<Vec<Value>>) -> Rows {
    Rows::new(columns.iter().map(|c| c.to_string()).collect(), data)
}

#[test]
fn test_mysql_columns_from_information_schema() {
    let mut d = MySql::new();
    d.init(
        dialectic::config::Uri::parse("mysql://root:pw@localhost:3306/app").unwrap(),
        "mysql",
        "",
    );
    let mut conn = ScriptedConn::with(vec![rows(
        &["COLUMN_NAME", "IS_NULLABLE", "COLUMN_DEFAULT", "COLUMN_TYPE", "COLUMN_KEY", "EXTRA"],
        vec![
            vec![
                "id".into(),
                "NO".into(),
                Value::Null,
                "bigint(20)".into(),
                "PRI".into(),
                "auto_increment".into(),
            ],
            vec![
                "name".into(),
                "YES".into(),
                "'anon'".into(),
                "varchar(25)".into(),
                "".into(),
                "".into(),
            ],
        ],
    )]);

    let columns = d.get_columns(&mut conn, "user").unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].data_type, DataType::Int64);
    assert!(columns[0].is_primary_key && columns[0].is_auto_increment);
    assert!(!columns[0].nullable);
    assert_eq!(columns[1].data_type, DataType::Varchar(25));
    assert!(columns[1].nullable);
    assert_eq!(columns[1].default.as_deref(), Some("'anon'"));

    let (_, args) = &conn.seen[0];
    assert_eq!(args, &vec![Value::from("app"), Value::from("user")]);
}

#[test]
fn test_mysql_indexes_group_columns_and_skip_primary() {
    let d = MySql::new();
    let mut conn = ScriptedConn::with(vec![rows(
        &["INDEX_NAME", "NON_UNIQUE", "COLUMN_NAME"],
        vec![
            vec!["PRIMARY".into(), 0.into(), "id".into()],
            vec!["UQE_user_name".into(), 0.into(), "name".into()],
            vec!["by_org".into(), 1.into(), "org_id".into()],
            vec!["by_org".into(), 1.into(), "team_id".into()],
        ],
    )]);

    let indexes = d.get_indexes(&mut conn, "user").unwrap();

    assert_eq!(indexes.len(), 2);
    let name = &indexes["name"];
    assert!(name.is_regular && name.is_unique());
    let by_org = &indexes["by_org"];
    assert!(!by_org.is_regular);
    assert_eq!(by_org.kind, IndexKind::Index);
    assert_eq!(by_org.cols, ["org_id", "team_id"]);
}

#[test]
fn test_postgres_catalog_sql_is_filtered() {
    let d = Postgres::new();
    let mut conn = ScriptedConn::with(vec![rows(&["tablename"], vec![vec!["user".into()]])]);

    assert!(d.is_table_exist(&mut conn, "user").unwrap());
    let (sql, args) = &conn.seen[0];
    assert_eq!(
        sql,
        "SELECT tablename FROM pg_tables WHERE schemaname = $1 AND tablename = $2"
    );
    assert_eq!(args[1], Value::from("user"));

    // An empty result set means absent.
    assert!(!d.is_table_exist(&mut conn, "ghost").unwrap());
}

#[test]
fn test_postgres_indexes_from_definitions() {
    let d = Postgres::new();
    let mut conn = ScriptedConn::with(vec![rows(
        &["indexname", "indexdef"],
        vec![
            vec![
                "user_pkey".into(),
                "CREATE UNIQUE INDEX user_pkey ON public.\"user\" USING btree (id)".into(),
            ],
            vec![
                "IDX_user_name".into(),
                "CREATE INDEX \"IDX_user_name\" ON public.\"user\" USING btree (name, email)".into(),
            ],
        ],
    )]);

    let indexes = d.get_indexes(&mut conn, "user").unwrap();

    assert_eq!(indexes.len(), 1);
    let idx = &indexes["name"];
    assert!(idx.is_regular);
    assert!(!idx.is_unique());
    assert_eq!(idx.cols, ["name", "email"]);
}

#[test]
fn test_postgres_oversized_catalog_types_stay_exact() {
    let d = Postgres::new();
    let columns = &[
        "column_name",
        "column_default",
        "is_nullable",
        "data_type",
        "character_maximum_length",
        "numeric_precision",
        "numeric_scale",
    ];
    let column = |name: &str, data_type: &str, len: Value, p: Value, s: Value| {
        vec![name.into(), Value::Null, "YES".into(), data_type.into(), len, p, s]
    };
    let mut conn = ScriptedConn::with(vec![
        rows(
            columns,
            vec![
                column("body", "character varying", 100_000.into(), Value::Null, Value::Null),
                column("code", "character varying", 32.into(), Value::Null, Value::Null),
                column("huge", "numeric", Value::Null, 1000.into(), 4.into()),
                column("price", "numeric", Value::Null, 12.into(), 2.into()),
            ],
        ),
        rows(&["column_name"], vec![]),
    ]);

    let cols = d.get_columns(&mut conn, "doc").unwrap();

    let types: Vec<_> = cols.iter().map(|c| c.data_type.clone()).collect();
    assert_eq!(
        types,
        vec![
            DataType::String,
            DataType::Varchar(32),
            DataType::String,
            DataType::Decimal(12, 2),
        ]
    );
    assert_eq!(d.sql_type(&cols[0]), "TEXT");
}

#[test]
fn test_sqlite_round_trip_through_catalog() {
    let engine = Engine::new(Box::new(Sqlite::new()));
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();

    let mut table = Table::new("membership")
        .column(Column::new("user_id", DataType::Int64).primary_key())
        .unwrap()
        .column(Column::new("group_id", DataType::Int64).primary_key())
        .unwrap()
        .column(Column::new("role", DataType::Varchar(16)).default_value("'member'"))
        .unwrap();
    table.add_index(Index::new_named("by_role", IndexKind::Index).column("role"));
    engine.create_tables(&mut conn, &[table]).unwrap();

    let d = engine.dialect();
    assert!(d.is_table_exist(&mut conn, "membership").unwrap());
    assert!(d.is_column_exist(&mut conn, "membership", "role").unwrap());
    assert!(!d.is_column_exist(&mut conn, "membership", "missing").unwrap());
    assert!(d
        .is_index_exist(&mut conn, "membership", &Index::new_named("by_role", IndexKind::Index))
        .unwrap());

    let metas = engine.db_metas(&mut conn).unwrap();
    let membership = &metas[0];
    assert_eq!(membership.primary_keys, ["user_id", "group_id"]);
    assert!(membership.auto_increment.is_none());
    assert_eq!(
        membership.get_column("role").unwrap().default.as_deref(),
        Some("'member'")
    );
    assert_eq!(membership.indexes["by_role"].cols, ["role"]);
}
