//! # chdforge-core
//!
//! Shared building blocks for the chdforge crates:
//!
//! - **Errors** ([`Error`]) -- the per-job error taxonomy plus environment
//!   errors, with a crate-wide [`Result`] alias.
//! - **Configuration** ([`config::Config`]) -- the optional TOML file model
//!   and its loader.

pub mod config;
pub mod error;

pub use config::{Config, FormatMode};
pub use error::{Error, Result};
