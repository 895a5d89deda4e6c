//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ct_core::Language;

/// Code-tracker data processing.
///
/// Merges code snapshots with IDE activity, finds where a session moves on
/// to another exercise, and judges fragments against exercise fixtures.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge snapshot logs with an activity log.
    Merge {
        /// Header-less activity-tracker log.
        #[arg(long)]
        activity: PathBuf,

        /// Snapshot logs, one per tracked file.
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        /// Write each merged timeline here instead of to stdout.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Find rows after which a session moves to another exercise.
    Split {
        /// Snapshot log or merged timeline.
        input: PathBuf,

        /// Minimum fragment length change, overriding the config.
        #[arg(long)]
        threshold: Option<usize>,

        /// Also confirm splits by judging the code before large deletions.
        #[arg(long)]
        confirm: bool,

        /// Exercise fixture directory, overriding the config.
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Language of the fragments, if it cannot be told from file names.
        #[arg(long)]
        language: Option<Language>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Score every fragment of a timeline against the exercises.
    Classify {
        /// Snapshot log or merged timeline.
        input: PathBuf,

        /// Exercise fixture directory, overriding the config.
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Language of the fragments, if it cannot be told from file names.
        #[arg(long)]
        language: Option<Language>,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace task labels with the exercise each row works towards.
        #[arg(long)]
        label: bool,

        /// Write one labelled timeline per exercise into this directory.
        #[arg(long, requires = "label")]
        partition_dir: Option<PathBuf>,

        /// Judge every fragment even if a verdict is cached.
        #[arg(long)]
        no_cache: bool,
    },

    /// Score a single source file.
    Check {
        /// Source file; its extension selects the language.
        source: PathBuf,

        /// Exercise fixture directory, overriding the config.
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Language, overriding the file extension.
        #[arg(long)]
        language: Option<Language>,

        /// Only score this exercise.
        #[arg(long)]
        exercise: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
