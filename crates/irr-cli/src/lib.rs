//! Annotation reliability CLI library.
//!
//! This crate provides the CLI interface for the reliability toolkit.

mod cli;
pub mod commands;
mod config;
pub mod input;

pub use cli::{Cli, Commands};
pub use config::Config;
