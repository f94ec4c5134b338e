use serde::{Deserialize, Serialize};

/// Kind of index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Index,
    Unique,
}

impl IndexKind {
    /// Storage-name prefix for system-derived names.
    pub fn prefix(&self) -> &'static str {
        match self {
            IndexKind::Index => "IDX_",
            IndexKind::Unique => "UQE_",
        }
    }
}

/// An index over one or more columns of a table.
///
/// A *regular* index has its storage name derived from the table and index
/// names (`IDX_<table>_<name>` / `UQE_<table>_<name>`); a named index uses
/// `name` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    /// Covered columns in declaration order.
    pub cols: Vec<String>,
    pub is_regular: bool,
}

impl Index {
    /// An index whose storage name is derived from the table name.
    pub fn new_regular(name: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cols: Vec::new(),
            is_regular: true,
        }
    }

    /// An index stored under exactly `name`.
    pub fn new_named(name: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            is_regular: false,
            ..Self::new_regular(name, kind)
        }
    }

    pub fn add_column(&mut self, col: impl Into<String>) {
        self.cols.push(col.into());
    }

    /// Builder form of [`Index::add_column`].
    pub fn column(mut self, col: impl Into<String>) -> Self {
        self.add_column(col);
        self
    }

    pub fn is_unique(&self) -> bool {
        self.kind == IndexKind::Unique
    }

    /// Name the index is stored under in the database.
    ///
    /// Regular indexes always get the `IDX_`/`UQE_` prefix plus the table
    /// name; introspection strips it again through [`Index::split_storage_name`].
    pub fn storage_name(&self, table_name: &str) -> String {
        if !self.is_regular {
            return self.name.clone();
        }
        format!("{}{}_{}", self.kind.prefix(), table_name, self.name)
    }

    /// Inverse of [`Index::storage_name`] for names read back from a catalog.
    ///
    /// Returns the logical name and whether it was system-derived.
    pub fn split_storage_name(storage_name: &str, table_name: &str) -> (String, bool) {
        for prefix in [IndexKind::Index.prefix(), IndexKind::Unique.prefix()] {
            let derived = format!("{}{}_", prefix, table_name);
            if let Some(rest) = storage_name.strip_prefix(&derived) {
                if !rest.is_empty() {
                    return (rest.to_string(), true);
                }
            }
        }
        (storage_name.to_string(), false)
    }
}
