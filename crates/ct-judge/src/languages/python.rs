use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;

use ct_core::{Language, ValidationError};

use crate::runner::{InputFeeder, LanguageRunner, command_in};

const SOURCE_FILE: &str = "source.py";
const FEEDER_FILE: &str = "in.py";

/// Runs Python 3 sources.
///
/// Test input is produced by a generated `in.py` that prints each fixture
/// line, and its output is piped into the candidate.
#[derive(Debug, Clone)]
pub struct PythonRunner {
    python: String,
}

impl PythonRunner {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

/// Writes `line` as a double-quoted Python string literal.
fn python_literal(line: &str) -> String {
    let mut literal = String::with_capacity(line.len() + 2);
    literal.push('"');
    for c in line.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            c if c.is_control() => {
                let _ = write!(literal, "\\x{:02x}", u32::from(c));
            }
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

/// Builds a program that prints `input` line by line.
pub fn feeder_program(input: &str) -> String {
    input
        .lines()
        .map(|line| format!("print({})\n", python_literal(line)))
        .collect()
}

impl LanguageRunner for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    fn min_plausible_len(&self) -> usize {
        20
    }

    fn output_calls(&self) -> &'static [&'static str] {
        &["print"]
    }

    fn source_file_name(&self, _source: &str) -> Result<String, ValidationError> {
        Ok(SOURCE_FILE.to_string())
    }

    fn compile_command(&self, workdir: &Path, source_file: &str) -> Option<Command> {
        let mut command = command_in(&self.python, workdir);
        command.args(["-m", "py_compile", source_file]);
        Some(command)
    }

    fn run_command(&self, workdir: &Path, _source: &str) -> Result<Command, ValidationError> {
        let mut command = command_in(&self.python, workdir);
        command.arg(SOURCE_FILE);
        Ok(command)
    }

    fn input_feeder(&self, workdir: &Path, input: &str) -> Option<InputFeeder> {
        let mut command = command_in(&self.python, workdir);
        command.arg(FEEDER_FILE);
        Some(InputFeeder {
            file_name: FEEDER_FILE,
            program: feeder_program(input),
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeder_prints_each_line() {
        assert_eq!(feeder_program("3\n1 2 3\n"), "print(\"3\")\nprint(\"1 2 3\")\n");
    }

    #[test]
    fn literal_escapes_quotes_and_backslashes() {
        assert_eq!(python_literal(r#"a "b" \c"#), r#""a \"b\" \\c""#);
        assert_eq!(python_literal("tab\there"), r#""tab\x09here""#);
    }

    #[test]
    fn commands_run_in_workdir() {
        let runner = PythonRunner::new("python3");
        let workdir = Path::new("/tmp/work");
        let command = runner.run_command(workdir, "").unwrap();
        assert_eq!(command.get_program(), "python3");
        assert_eq!(command.get_current_dir(), Some(workdir));
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["source.py"]);
    }
}
