//! CLI command implementations.

pub mod config;
pub mod diff;
pub mod scan;
pub mod summary;
pub mod version;
