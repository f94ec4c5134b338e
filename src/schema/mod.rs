//! Metadata model: tables, columns and indexes independent of any backend.

mod column;
mod index;
mod table;
mod types;

pub use column::Column;
pub use index::{Index, IndexKind};
pub use table::Table;
pub use types::DataType;

/// Error raised while building table metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("table `{table}`: column `{column}` is a second {marker} column (already `{existing}`)")]
    DuplicateMarker {
        table: String,
        marker: &'static str,
        existing: String,
        column: String,
    },
}
