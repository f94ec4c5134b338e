//! SQL rendering primitives.
//!
//! - [`token`] - Token types the DDL and statement builders emit
//! - [`cond`] - Composable WHERE condition tree
//! - [`filter`] - Text-substitution filters applied before execution

pub mod cond;
pub mod filter;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use cond::Cond;
pub use filter::{Filter, FilterContext, IdFilter, QuoteFilter, SeqFilter};
pub use token::{Token, TokenStream};
