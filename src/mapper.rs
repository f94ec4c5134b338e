//! Name mapping between source identifiers and table/column names.

use std::fmt;

use inflector::Inflector;

/// Converts between a type/field name and the stored table/column name.
pub trait NameMapper: fmt::Debug + Send + Sync {
    fn obj_to_table(&self, name: &str) -> String;
    fn table_to_obj(&self, name: &str) -> String;
}

/// Identity mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct SameMapper;

impl NameMapper for SameMapper {
    fn obj_to_table(&self, name: &str) -> String {
        name.to_string()
    }

    fn table_to_obj(&self, name: &str) -> String {
        name.to_string()
    }
}

/// `UserGroup` <-> `user_group`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnakeMapper;

impl NameMapper for SnakeMapper {
    fn obj_to_table(&self, name: &str) -> String {
        name.to_snake_case()
    }

    fn table_to_obj(&self, name: &str) -> String {
        name.to_pascal_case()
    }
}

/// Wraps another mapper and adds a fixed prefix to table names.
#[derive(Debug)]
pub struct PrefixMapper<M> {
    inner: M,
    prefix: String,
}

impl<M: NameMapper> PrefixMapper<M> {
    pub fn new(inner: M, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

impl<M: NameMapper> NameMapper for PrefixMapper<M> {
    fn obj_to_table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, self.inner.obj_to_table(name))
    }

    fn table_to_obj(&self, name: &str) -> String {
        let bare = name.strip_prefix(self.prefix.as_str()).unwrap_or(name);
        self.inner.table_to_obj(bare)
    }
}

/// Wraps another mapper and adds a fixed suffix to table names.
#[derive(Debug)]
pub struct SuffixMapper<M> {
    inner: M,
    suffix: String,
}

impl<M: NameMapper> SuffixMapper<M> {
    pub fn new(inner: M, suffix: impl Into<String>) -> Self {
        Self {
            inner,
            suffix: suffix.into(),
        }
    }
}

impl<M: NameMapper> NameMapper for SuffixMapper<M> {
    fn obj_to_table(&self, name: &str) -> String {
        format!("{}{}", self.inner.obj_to_table(name), self.suffix)
    }

    fn table_to_obj(&self, name: &str) -> String {
        let bare = name.strip_suffix(self.suffix.as_str()).unwrap_or(name);
        self.inner.table_to_obj(bare)
    }
}
