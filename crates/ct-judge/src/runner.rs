//! Per-language build and run recipes.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use ct_core::{Language, ValidationError};

use crate::config::Toolchain;
use crate::languages::{CppRunner, JavaRunner, KotlinRunner, PythonRunner};

/// A helper program whose output becomes a test's stdin.
#[derive(Debug)]
pub struct InputFeeder {
    /// File the program is written to, inside the working directory.
    pub file_name: &'static str,
    pub program: String,
    pub command: Command,
}

/// Language contract for the build and run stages.
pub trait LanguageRunner: Send + Sync {
    fn language(&self) -> Language;

    /// Shortest fragment that can be a complete program.
    fn min_plausible_len(&self) -> usize;

    /// Calls that write to stdout. A program without any of them cannot pass.
    fn output_calls(&self) -> &'static [&'static str];

    /// File name the source must be saved under.
    fn source_file_name(&self, source: &str) -> Result<String, ValidationError>;

    /// Build command, or `None` for languages without a build step.
    fn compile_command(&self, workdir: &Path, source_file: &str) -> Option<Command>;

    fn run_command(&self, workdir: &Path, source: &str) -> Result<Command, ValidationError>;

    /// Program that turns a fixture into stdin, for languages that need one.
    fn input_feeder(&self, _workdir: &Path, _input: &str) -> Option<InputFeeder> {
        None
    }

    /// Cheap check run before anything is spawned.
    fn is_plausible(&self, fragment: &str) -> bool {
        fragment.chars().count() >= self.min_plausible_len()
            && self
                .output_calls()
                .iter()
                .any(|call| fragment.contains(call))
    }
}

/// Builds a command that runs in `workdir`.
pub(crate) fn command_in(program: &str, workdir: &Path) -> Command {
    let mut command = Command::new(program);
    command.current_dir(workdir);
    command
}

/// Runners by language.
#[derive(Clone)]
pub struct RunnerRegistry {
    runners: HashMap<Language, Arc<dyn LanguageRunner>>,
}

impl RunnerRegistry {
    /// Registry with the built-in runners for every language.
    pub fn new(toolchain: &Toolchain) -> Self {
        let mut registry = Self {
            runners: HashMap::new(),
        };
        registry.register(PythonRunner::new(&toolchain.python));
        registry.register(JavaRunner::new(&toolchain.javac, &toolchain.java));
        registry.register(KotlinRunner::new(&toolchain.kotlinc, &toolchain.java));
        registry.register(CppRunner::new(&toolchain.cxx));
        registry
    }

    /// Adds a runner, replacing any existing one for the same language.
    pub fn register(&mut self, runner: impl LanguageRunner + 'static) {
        self.runners.insert(runner.language(), Arc::new(runner));
    }

    pub fn get(&self, language: Language) -> Result<&dyn LanguageRunner, ValidationError> {
        self.runners
            .get(&language)
            .map(|runner| &**runner as &dyn LanguageRunner)
            .ok_or_else(|| ValidationError::UnknownLanguage {
                value: language.to_string(),
            })
    }
}

impl std::fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut languages: Vec<&Language> = self.runners.keys().collect();
        languages.sort();
        f.debug_struct("RunnerRegistry")
            .field("languages", &languages)
            .finish()
    }
}
