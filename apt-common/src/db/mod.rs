//! Database bootstrap shared by the classifier crates

pub mod init;

pub use init::{init_database, init_tables};
