//! Multi-language judge for code-tracker fragments.
//!
//! A fragment is compiled once per exercise working directory and run
//! against each of the exercise's `in_<n>.txt` / `out_<n>.txt` fixtures.
//! Compile errors, crashes, timeouts and wrong answers only lower the
//! score; a broken toolchain or invalid fixtures abort the call.

pub mod config;
pub mod fixtures;
pub mod judge;
pub mod languages;
pub mod process;
pub mod runner;
pub mod workspace;

use std::path::{Path, PathBuf};
use std::process::Command;

use ct_core::{ExerciseId, ValidationError};
use thiserror::Error;

pub use config::{JudgeConfig, Toolchain};
pub use fixtures::{Catalogue, Exercise, TestCase};
pub use judge::{Classification, Judge, outputs_match};
pub use runner::{InputFeeder, LanguageRunner, RunnerRegistry};

/// Judge errors.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured executable could not be started.
    #[error("failed to launch {program}; check the toolchain configuration")]
    Toolchain {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no such exercise: {0}")]
    UnknownExercise(ExerciseId),

    #[error("failed to start judge pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl JudgeError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn toolchain(command: &Command, source: std::io::Error) -> Self {
        Self::Toolchain {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        }
    }
}
