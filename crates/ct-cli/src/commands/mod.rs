//! CLI subcommand implementations.

pub mod check;
pub mod classify;
pub mod merge;
pub mod split;
pub mod util;
