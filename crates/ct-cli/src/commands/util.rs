//! Shared utilities for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use ct_core::{Language, MergedRow, detect_language};
use ct_db::Database;
use ct_judge::{Catalogue, Judge};

use crate::Config;

/// Picks the language to judge a timeline in.
///
/// An explicit choice wins; otherwise every row's file name must agree.
pub fn resolve_language(explicit: Option<Language>, rows: &[MergedRow]) -> Result<Language> {
    if let Some(language) = explicit {
        return Ok(language);
    }
    detect_language(rows.iter().map(|row| row.snapshot.file_name.as_str())).context(
        "cannot tell the language from the file names; pass --language",
    )
}

/// Loads the exercise catalogue and starts a judge.
pub fn load_judge(config: &Config, fixtures: Option<&Path>) -> Result<Judge> {
    let fixtures = fixtures
        .or(config.fixtures_dir.as_deref())
        .context("no exercise fixtures configured; pass --fixtures or set fixtures_dir")?;
    let catalogue = Catalogue::from_dir(fixtures)
        .with_context(|| format!("failed to load exercises from {}", fixtures.display()))?;
    Judge::new(catalogue, config.judge.clone()).context("failed to start judge")
}

/// Opens the verdict cache, ensuring the parent directory exists.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path).context("failed to open verdict cache")
}

/// Joins displayable values with `;`.
pub fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(";")
}
