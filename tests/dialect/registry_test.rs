use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dialectic::config::Uri;
use dialectic::dialect::{ctor, DbType, Dialect, DialectRegistry, MySql, Postgres};

#[test]
fn test_unknown_db_type_is_absent() {
    let registry = DialectRegistry::with_builtin();
    assert!(registry.query_dialect(&DbType::from("nonexistent")).is_none());
    assert!(!registry.contains(&DbType::from("oracle")));
}

#[test]
fn test_each_lookup_builds_a_fresh_instance() {
    let registry = DialectRegistry::with_builtin();
    let uri = Uri::parse("postgres://app:pw@db:5432/orders").unwrap();

    let opened = registry.open(uri, "postgres", "host=db dbname=orders").unwrap();
    assert_eq!(opened.uri().db_name, "orders");
    assert_eq!(opened.driver_name(), "postgres");

    let fresh = registry.query_dialect(&DbType::POSTGRES).unwrap();
    assert_eq!(fresh.uri().db_name, "");
}

#[test]
fn test_custom_registration_replaces_builtin() {
    static BUILT: AtomicUsize = AtomicUsize::new(0);

    let mut registry = DialectRegistry::with_builtin();
    registry.register_dialect(
        DbType::MYSQL,
        Arc::new(|| -> Box<dyn Dialect> {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Box::new(MySql::new())
        }),
    );
    registry.register_dialect(DbType::from("cockroach"), ctor::<Postgres>());

    registry.query_dialect(&DbType::MYSQL).unwrap();
    registry.query_dialect(&DbType::MYSQL).unwrap();
    assert_eq!(BUILT.load(Ordering::SeqCst), 2);

    let cockroach = registry.query_dialect(&DbType::from("cockroach")).unwrap();
    assert_eq!(cockroach.quote("t"), "\"t\"");
    assert_eq!(registry.db_types().len(), 5);
}
