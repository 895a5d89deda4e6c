//! Judge configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Executables used to build and run candidate programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    pub python: String,
    pub javac: String,
    pub java: String,
    pub kotlinc: String,
    pub cxx: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            kotlinc: "kotlinc".to_string(),
            cxx: "g++".to_string(),
        }
    }
}

/// Settings for a [`Judge`](crate::Judge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Root under which each exercise gets its own working directory.
    pub work_dir: PathBuf,
    pub toolchain: Toolchain,
    /// Limit for a single compiler invocation, in seconds.
    pub compile_timeout_secs: u64,
    /// Limit for a single test run, in seconds.
    pub run_timeout_secs: u64,
    /// Size of the evaluation pool. Zero lets rayon pick.
    pub workers: usize,
    /// Stop scoring an exercise at its first failing test.
    ///
    /// Off by default, so a score counts every passing test of the
    /// exercise. Turning it on makes a score a pass/fail signal that only
    /// counts the tests passed before the first failure.
    pub stop_after_first_failure: bool,
    /// Skip fragments that cannot plausibly be a complete program.
    pub precheck: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("ct-judge"),
            toolchain: Toolchain::default(),
            compile_timeout_secs: 120,
            run_timeout_secs: 10,
            workers: 0,
            stop_after_first_failure: false,
            precheck: true,
        }
    }
}

impl JudgeConfig {
    pub const fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub const fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}
