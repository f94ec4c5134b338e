use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::column::Column;
use super::index::Index;
use super::MetadataError;
use crate::cache::Cacher;

/// In-memory description of a logical table.
///
/// Populated by repeated [`add_column`](Table::add_column) /
/// [`add_index`](Table::add_index) / [`add_inherit`](Table::add_inherit)
/// calls and treated as read-only afterwards. Column insertion order is the
/// order used in generated DDL.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    /// Name of the source type the metadata was derived from, if any.
    pub type_name: Option<String>,
    columns_seq: Vec<String>,
    columns: Vec<Column>,
    /// Lowercased name -> positions in `columns`, first registration first.
    columns_map: HashMap<String, Vec<usize>>,
    pub indexes: BTreeMap<String, Index>,
    pub primary_keys: Vec<String>,
    pub auto_increment: Option<String>,
    pub created: BTreeSet<String>,
    pub updated: Option<String>,
    pub deleted: Option<String>,
    pub version: Option<String>,
    pub cacher: Option<Arc<dyn Cacher>>,
    pub store_engine: Option<String>,
    pub charset: Option<String>,
    /// Parent tables; only rendered by dialects that support inheritance.
    pub inherits: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A table with no name, filled in later by the caller.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in registration order.
    pub fn columns_seq(&self) -> &[String] {
        &self.columns_seq
    }

    /// Case-insensitive lookup; returns the first registered match.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.get_column_idx(name, 0)
    }

    /// Case-insensitive lookup of the `idx`-th column registered under `name`.
    pub fn get_column_idx(&self, name: &str, idx: usize) -> Option<&Column> {
        self.columns_map
            .get(&name.to_lowercase())
            .and_then(|positions| positions.get(idx))
            .map(|&pos| &self.columns[pos])
    }

    pub fn pk_columns(&self) -> Vec<&Column> {
        self.primary_keys
            .iter()
            .filter_map(|name| self.get_column(name))
            .collect()
    }

    pub fn auto_incr_column(&self) -> Option<&Column> {
        self.auto_increment.as_deref().and_then(|n| self.get_column(n))
    }

    pub fn version_column(&self) -> Option<&Column> {
        self.version.as_deref().and_then(|n| self.get_column(n))
    }

    pub fn updated_column(&self) -> Option<&Column> {
        self.updated.as_deref().and_then(|n| self.get_column(n))
    }

    pub fn deleted_column(&self) -> Option<&Column> {
        self.deleted.as_deref().and_then(|n| self.get_column(n))
    }

    pub fn created_columns(&self) -> impl Iterator<Item = &Column> {
        self.created.iter().filter_map(|n| self.get_column(n))
    }

    /// Register a column and update the derived key/audit references.
    ///
    /// A second auto-increment, updated, deleted or version column is
    /// rejected and leaves the table unchanged.
    pub fn add_column(&mut self, col: Column) -> Result<(), MetadataError> {
        let markers = [
            ("auto-increment", col.is_auto_increment, &self.auto_increment),
            ("updated", col.is_updated, &self.updated),
            ("deleted", col.is_deleted, &self.deleted),
            ("version", col.is_version, &self.version),
        ];
        for (marker, flagged, existing) in markers {
            if let (true, Some(existing)) = (flagged, existing) {
                return Err(MetadataError::DuplicateMarker {
                    table: self.name.clone(),
                    marker,
                    existing: existing.clone(),
                    column: col.name.clone(),
                });
            }
        }

        if col.is_primary_key {
            self.primary_keys.push(col.name.clone());
        }
        if col.is_auto_increment {
            self.auto_increment = Some(col.name.clone());
        }
        if col.is_created {
            self.created.insert(col.name.clone());
        }
        if col.is_updated {
            self.updated = Some(col.name.clone());
        }
        if col.is_deleted {
            self.deleted = Some(col.name.clone());
        }
        if col.is_version {
            self.version = Some(col.name.clone());
        }

        self.columns_seq.push(col.name.clone());
        self.columns_map
            .entry(col.name.to_lowercase())
            .or_default()
            .push(self.columns.len());
        self.columns.push(col);
        Ok(())
    }

    /// Builder form of [`Table::add_column`].
    pub fn column(mut self, col: Column) -> Result<Self, MetadataError> {
        self.add_column(col)?;
        Ok(self)
    }

    /// Register an index; a later index with the same name replaces it.
    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.name.clone(), index);
    }

    pub fn add_inherit(&mut self, parent: impl Into<String>) {
        self.inherits.push(parent.into());
    }
}
