// src/lib.rs
//! Population snapshot scraper.
//!
//! ```text
//! fetch ─▶ specs (extract) ─▶ validate ─▶ publish ─▶ store
//! ```
//! `scrape::Pipeline` wires one run together; `runner` repeats it on a schedule.

#[macro_use]
pub mod macros;

pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod log;
pub mod model;
pub mod progress;
pub mod publish;
pub mod runner;
pub mod scrape;
pub mod specs;
pub mod store;
pub mod validate;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
