//! CLI subcommand implementations.

pub mod export;
pub mod reliability;
pub mod summary;
