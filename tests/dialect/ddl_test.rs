use std::collections::BTreeMap;

use dialectic::config::Uri;
use dialectic::db::{Connection, DbResult, Value};
use dialectic::dialect::{base, Base, DbType, Dialect, MsSql, MySql, Postgres, Sqlite};
use dialectic::schema::{Column, DataType, Index, IndexKind, Table};
use insta::assert_snapshot;
use sqlparser::dialect::{MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

fn user_table() -> Table {
    let mut table = Table::new("user")
        .column(Column::new("id", DataType::Int64).primary_key().auto_increment())
        .unwrap()
        .column(Column::new("name", DataType::Varchar(25)))
        .unwrap()
        .column(Column::new("email", DataType::Varchar(128)).not_null())
        .unwrap();
    table.add_index(Index::new_regular("name", IndexKind::Unique).column("name"));
    table.add_index(Index::new_named("by_email", IndexKind::Index).column("email"));
    table
}

fn membership_table() -> Table {
    Table::new("membership")
        .column(Column::new("user_id", DataType::Int64).primary_key())
        .unwrap()
        .column(Column::new("group_id", DataType::Int64).primary_key())
        .unwrap()
}

fn parses(sql: &str, dialect: &dyn sqlparser::dialect::Dialect) {
    if let Err(e) = Parser::parse_sql(dialect, sql) {
        panic!("invalid SQL: {}\n{}", e, sql);
    }
}

#[test]
fn test_mysql_create_table_with_engine_and_charset() {
    let sql = MySql::new().create_table_sql(&user_table(), "", "InnoDB", "utf8");
    assert_snapshot!(sql, @"CREATE TABLE IF NOT EXISTS `user` (`id` BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT, `name` VARCHAR(25) NULL, `email` VARCHAR(128) NOT NULL) ENGINE=InnoDB DEFAULT CHARSET utf8");
}

#[test]
fn test_mysql_charset_falls_back_to_uri() {
    let mut d = MySql::new();
    let uri = Uri::parse("mysql://root@localhost:3306/app?charset=utf8mb4").unwrap();
    d.init(uri, "mysql", "root@tcp(localhost:3306)/app");

    let sql = d.create_table_sql(&membership_table(), "", "", "");
    assert!(sql.ends_with(") DEFAULT CHARSET utf8mb4"), "{}", sql);
    assert!(!sql.contains("ENGINE="));
}

#[test]
fn test_composite_primary_key_is_a_table_constraint() {
    let table = membership_table();

    let sql = MySql::new().create_table_sql(&table, "", "", "");
    assert_snapshot!(sql, @"CREATE TABLE IF NOT EXISTS `membership` (`user_id` BIGINT NOT NULL, `group_id` BIGINT NOT NULL, PRIMARY KEY (`user_id`,`group_id`))");
    parses(&sql, &MySqlDialect {});

    let sql = Postgres::new().create_table_sql(&table, "", "", "");
    assert_snapshot!(sql, @r#"CREATE TABLE IF NOT EXISTS "membership" ("user_id" BIGINT NOT NULL, "group_id" BIGINT NOT NULL, PRIMARY KEY ("user_id","group_id"))"#);
    parses(&sql, &PostgreSqlDialect {});
}

#[test]
fn test_table_name_override() {
    let sql = Sqlite::new().create_table_sql(&membership_table(), "membership_2024", "", "");
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `membership_2024` ("));
    parses(&sql, &SQLiteDialect {});
}

#[test]
fn test_create_and_drop_indexes() {
    let table = user_table();
    let unique = &table.indexes["name"];
    let named = &table.indexes["by_email"];
    let mysql = MySql::new();

    assert_snapshot!(mysql.create_index_sql("user", unique), @"CREATE UNIQUE INDEX `UQE_user_name` ON `user` (`name`)");
    assert_snapshot!(mysql.create_index_sql("user", named), @"CREATE INDEX `by_email` ON `user` (`email`)");
    assert_snapshot!(mysql.drop_index_sql("user", unique), @"DROP INDEX `UQE_user_name` ON `user`");

    let pg = Postgres::new();
    assert_snapshot!(pg.drop_index_sql("user", named), @r#"DROP INDEX IF EXISTS "by_email""#);
    parses(&pg.create_index_sql("user", unique), &PostgreSqlDialect {});

    let mssql = MsSql::new();
    assert_snapshot!(mssql.drop_index_sql("user", unique), @"DROP INDEX [UQE_user_name] ON [user]");
    parses(&mssql.create_index_sql("user", named), &MsSqlDialect {});
}

#[test]
fn test_column_string_without_pk_markers() {
    let table = user_table();
    let id = table.get_column("id").unwrap();
    let mysql = MySql::new();

    assert_eq!(
        mysql.column_string(id, true),
        "`id` BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT"
    );
    assert_eq!(mysql.column_string(id, false), "`id` BIGINT NOT NULL");
}

#[test]
fn test_modify_column() {
    let col = Column::new("name", DataType::Varchar(64)).not_null();
    assert_snapshot!(MySql::new().modify_column_sql("user", &col), @"ALTER TABLE `user` MODIFY COLUMN `name` VARCHAR(64) NOT NULL");
}

#[test]
fn test_drop_table_for_every_builtin() {
    let dialects: Vec<Box<dyn Dialect>> = vec![
        Box::new(MySql::new()),
        Box::new(Postgres::new()),
        Box::new(Sqlite::new()),
        Box::new(MsSql::new()),
    ];
    for d in &dialects {
        let sql = d.drop_table_sql("user");
        assert!(sql.starts_with("DROP TABLE "), "{}", sql);
        assert!(sql.ends_with(&d.quote("user")), "{}", sql);
        assert!(sql.contains("IF EXISTS"), "{}", sql);
    }
}

#[test]
fn test_quote_is_not_idempotent() {
    let d = MySql::new();
    assert_eq!(d.quote("user"), "`user`");
    assert_eq!(d.quote(&d.quote("user")), "```user```");
    assert_eq!(d.checked_quote("user_name"), "user_name");
    assert_eq!(d.checked_quote("order"), "`order`");
}

/// PostgreSQL as it was before `IF EXISTS` on DROP.
#[derive(Debug, Default)]
struct LegacyPostgres(Postgres);

impl Dialect for LegacyPostgres {
    fn base(&self) -> &Base {
        self.0.base()
    }

    fn base_mut(&mut self) -> &mut Base {
        self.0.base_mut()
    }

    fn db_type(&self) -> DbType {
        self.0.db_type()
    }

    fn quote_str(&self) -> &'static str {
        self.0.quote_str()
    }

    fn quote(&self, ident: &str) -> String {
        self.0.quote(ident)
    }

    fn sql_type(&self, col: &Column) -> String {
        self.0.sql_type(col)
    }

    fn auto_incr_str(&self) -> &'static str {
        self.0.auto_incr_str()
    }

    fn table_check_sql(&self, table_name: &str) -> (String, Vec<Value>) {
        self.0.table_check_sql(table_name)
    }

    fn index_check_sql(&self, table_name: &str, index_name: &str) -> (String, Vec<Value>) {
        self.0.index_check_sql(table_name, index_name)
    }

    fn get_columns(&self, conn: &mut dyn Connection, table_name: &str) -> DbResult<Vec<Column>> {
        self.0.get_columns(conn, table_name)
    }

    fn get_tables(&self, conn: &mut dyn Connection) -> DbResult<Vec<Table>> {
        self.0.get_tables(conn)
    }

    fn get_indexes(
        &self,
        conn: &mut dyn Connection,
        table_name: &str,
    ) -> DbResult<BTreeMap<String, Index>> {
        self.0.get_indexes(conn, table_name)
    }

    fn supports_drop_if_exists(&self) -> bool {
        false
    }
}

#[test]
fn test_drop_without_if_exists_support() {
    let d = LegacyPostgres::default();
    let index = Index::new_regular("name", IndexKind::Index).column("name");

    let sql = d.drop_table_sql("user");
    assert_snapshot!(sql, @r#"DROP TABLE "user""#);
    parses(&sql, &PostgreSqlDialect {});

    let sql = base::drop_index_standalone_sql(&d, "user", &index);
    assert_snapshot!(sql, @r#"DROP INDEX "IDX_user_name""#);
    parses(&sql, &PostgreSqlDialect {});
}
