use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use ct_core::{Language, ValidationError};
use regex::Regex;

use crate::runner::{LanguageRunner, command_in};

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*((?:(?:public|protected|private|abstract|final|static)\s+)*)class\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .unwrap()
});
static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_.]*)\s*;").unwrap());

/// Finds the class a Java source must be named after.
///
/// A `public class` wins over other top-level classes; otherwise the first
/// declared class is used.
pub fn class_name(source: &str) -> Result<&str, ValidationError> {
    let mut first = None;
    for captures in CLASS_RE.captures_iter(source) {
        let (Some(modifiers), Some(name)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        if modifiers.as_str().split_whitespace().any(|m| m == "public") {
            return Ok(name.as_str());
        }
        first.get_or_insert(name.as_str());
    }
    first.ok_or(ValidationError::MissingClassName)
}

/// Fully qualified name of the class to launch.
pub fn main_class(source: &str) -> Result<String, ValidationError> {
    let name = class_name(source)?;
    Ok(match PACKAGE_RE.captures(source).and_then(|c| c.get(1)) {
        Some(package) => format!("{}.{name}", package.as_str()),
        None => name.to_string(),
    })
}

/// Compiles with `javac` and launches the main class with `java`.
#[derive(Debug, Clone)]
pub struct JavaRunner {
    javac: String,
    java: String,
}

impl JavaRunner {
    pub fn new(javac: impl Into<String>, java: impl Into<String>) -> Self {
        Self {
            javac: javac.into(),
            java: java.into(),
        }
    }
}

impl LanguageRunner for JavaRunner {
    fn language(&self) -> Language {
        Language::Java
    }

    fn min_plausible_len(&self) -> usize {
        140
    }

    fn output_calls(&self) -> &'static [&'static str] {
        &["System.out.print"]
    }

    fn source_file_name(&self, source: &str) -> Result<String, ValidationError> {
        Ok(format!("{}.java", class_name(source)?))
    }

    fn compile_command(&self, workdir: &Path, source_file: &str) -> Option<Command> {
        let mut command = command_in(&self.javac, workdir);
        command.args(["-encoding", "UTF-8", "-d", "."]).arg(source_file);
        Some(command)
    }

    fn run_command(&self, workdir: &Path, source: &str) -> Result<Command, ValidationError> {
        let mut command = command_in(&self.java, workdir);
        command.args(["-cp", "."]).arg(main_class(source)?);
        Ok(command)
    }
}
