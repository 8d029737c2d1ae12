//! # APT Common Library
//!
//! Shared code for the APT (Art Persona Type) classifier crates:
//! - Error type and result alias
//! - TOML configuration loading and path resolution
//! - SQLite schema bootstrap
//! - Tracing subscriber setup

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
