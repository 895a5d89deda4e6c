//! Code-tracker CLI library.
//!
//! This crate provides the CLI interface for merging tracker logs, finding
//! exercise boundaries and judging fragments.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
