use std::path::Path;
use std::process::Command;

use ct_core::{Language, ValidationError};

use crate::runner::{LanguageRunner, command_in};

const SOURCE_FILE: &str = "source.kt";
const JAR_FILE: &str = "source.jar";

/// Compiles with `kotlinc` into a self-contained jar and runs it on the JVM.
#[derive(Debug, Clone)]
pub struct KotlinRunner {
    kotlinc: String,
    java: String,
}

impl KotlinRunner {
    pub fn new(kotlinc: impl Into<String>, java: impl Into<String>) -> Self {
        Self {
            kotlinc: kotlinc.into(),
            java: java.into(),
        }
    }
}

impl LanguageRunner for KotlinRunner {
    fn language(&self) -> Language {
        Language::Kotlin
    }

    fn min_plausible_len(&self) -> usize {
        80
    }

    fn output_calls(&self) -> &'static [&'static str] {
        &["print"]
    }

    fn source_file_name(&self, _source: &str) -> Result<String, ValidationError> {
        Ok(SOURCE_FILE.to_string())
    }

    fn compile_command(&self, workdir: &Path, source_file: &str) -> Option<Command> {
        let mut command = command_in(&self.kotlinc, workdir);
        command
            .arg(source_file)
            .args(["-include-runtime", "-d", JAR_FILE]);
        Some(command)
    }

    fn run_command(&self, workdir: &Path, _source: &str) -> Result<Command, ValidationError> {
        let mut command = command_in(&self.java, workdir);
        command.args(["-jar", JAR_FILE]);
        Ok(command)
    }
}
