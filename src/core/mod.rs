// src/core/mod.rs

pub mod canon;
pub mod normalize;
pub mod retry;
pub mod sanitize;

pub use canon::AliasTable;
pub use normalize::{parse_integer, parse_percent_or_decimal};
