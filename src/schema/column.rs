use serde::{Deserialize, Serialize};

use super::types::DataType;

/// A column of a logical table.
///
/// Columns are owned by their [`Table`](super::Table); the flags describe
/// key and audit semantics that DDL generation and sessions respect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    /// Default expression, rendered verbatim after `DEFAULT`.
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    /// Filled with the current time on insert.
    pub is_created: bool,
    /// Filled with the current time on insert and update.
    pub is_updated: bool,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// Optimistic-lock counter.
    pub is_version: bool,
    pub is_cacheable: bool,
}

impl Column {
    /// Create a nullable column with no flags set.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
            is_primary_key: false,
            is_auto_increment: false,
            is_created: false,
            is_updated: false,
            is_deleted: false,
            is_version: false,
            is_cacheable: true,
        }
    }

    /// Mark as primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn created(mut self) -> Self {
        self.is_created = true;
        self
    }

    pub fn updated(mut self) -> Self {
        self.is_updated = true;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    pub fn version(mut self) -> Self {
        self.is_version = true;
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.is_cacheable = false;
        self
    }
}
