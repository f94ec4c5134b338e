//! Cache registration and invalidation hooks.
//!
//! Storage and eviction policy belong to the implementor. Sessions only
//! read through a table's cacher on primary-key lookups and invalidate it on
//! every mutation.
//!
//! Two kinds of entries are kept per table:
//!
//! ```text
//! ids:   {table} + {select sql}  -> [pk key, ...]
//! beans: {table} + {pk key}      -> Record
//! ```
//!
//! A pk key is the JSON encoding of the primary-key values, see [`pk_key`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::db::{Record, Value};

/// Pluggable per-table cache.
pub trait Cacher: fmt::Debug + Send + Sync {
    fn get_ids(&self, table: &str, sql: &str) -> Option<Vec<String>>;
    fn put_ids(&self, table: &str, sql: &str, ids: Vec<String>);
    fn del_ids(&self, table: &str, sql: &str);

    fn get_bean(&self, table: &str, id: &str) -> Option<Record>;
    fn put_bean(&self, table: &str, id: &str, bean: Record);
    fn del_bean(&self, table: &str, id: &str);

    /// Drop every cached id list for `table`.
    fn clear_ids(&self, table: &str);
    /// Drop every cached row for `table`.
    fn clear_beans(&self, table: &str);
}

/// Stable cache key for a primary-key tuple.
pub fn pk_key(values: &[Value]) -> String {
    serde_json::to_string(values).unwrap_or_default()
}

type Buckets<T> = HashMap<String, HashMap<String, T>>;

/// Unbounded in-process cacher, mostly useful for tests and small tools.
#[derive(Debug, Default)]
pub struct MemoryCacher {
    ids: Mutex<Buckets<Vec<String>>>,
    beans: Mutex<Buckets<Record>>,
}

impl MemoryCacher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached rows for `table`.
    pub fn bean_count(&self, table: &str) -> usize {
        lock(&self.beans).get(table).map_or(0, HashMap::len)
    }

    /// Number of cached id lists for `table`.
    pub fn ids_count(&self, table: &str) -> usize {
        lock(&self.ids).get(table).map_or(0, HashMap::len)
    }
}

// A panic while holding the lock cannot leave a map half-written.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Cacher for MemoryCacher {
    fn get_ids(&self, table: &str, sql: &str) -> Option<Vec<String>> {
        lock(&self.ids).get(table)?.get(sql).cloned()
    }

    fn put_ids(&self, table: &str, sql: &str, ids: Vec<String>) {
        lock(&self.ids)
            .entry(table.to_string())
            .or_default()
            .insert(sql.to_string(), ids);
    }

    fn del_ids(&self, table: &str, sql: &str) {
        if let Some(bucket) = lock(&self.ids).get_mut(table) {
            bucket.remove(sql);
        }
    }

    fn get_bean(&self, table: &str, id: &str) -> Option<Record> {
        lock(&self.beans).get(table)?.get(id).cloned()
    }

    fn put_bean(&self, table: &str, id: &str, bean: Record) {
        lock(&self.beans)
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), bean);
    }

    fn del_bean(&self, table: &str, id: &str) {
        if let Some(bucket) = lock(&self.beans).get_mut(table) {
            bucket.remove(id);
        }
    }

    fn clear_ids(&self, table: &str) {
        lock(&self.ids).remove(table);
    }

    fn clear_beans(&self, table: &str) {
        lock(&self.beans).remove(table);
    }
}
