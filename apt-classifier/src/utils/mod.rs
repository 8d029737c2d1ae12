//! Utility modules

pub mod retry;
pub mod text;
