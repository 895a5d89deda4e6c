use std::path::Path;
use std::process::Command;

use ct_core::{Language, ValidationError};

use crate::runner::{LanguageRunner, command_in};

const SOURCE_FILE: &str = "source.cpp";
const BINARY_FILE: &str = "source.out";

/// Builds C++ sources with a GCC-compatible compiler.
#[derive(Debug, Clone)]
pub struct CppRunner {
    cxx: String,
}

impl CppRunner {
    pub fn new(cxx: impl Into<String>) -> Self {
        Self { cxx: cxx.into() }
    }
}

impl LanguageRunner for CppRunner {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn min_plausible_len(&self) -> usize {
        60
    }

    fn output_calls(&self) -> &'static [&'static str] {
        &["cout", "printf"]
    }

    fn source_file_name(&self, _source: &str) -> Result<String, ValidationError> {
        Ok(SOURCE_FILE.to_string())
    }

    fn compile_command(&self, workdir: &Path, source_file: &str) -> Option<Command> {
        let mut command = command_in(&self.cxx, workdir);
        command.args(["-o", BINARY_FILE, source_file]);
        Some(command)
    }

    fn run_command(&self, workdir: &Path, _source: &str) -> Result<Command, ValidationError> {
        let mut command = Command::new(workdir.join(BINARY_FILE));
        command.current_dir(workdir);
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_to_binary_in_workdir() {
        let runner = CppRunner::new("g++");
        let workdir = Path::new("/tmp/work");
        let compile = runner.compile_command(workdir, SOURCE_FILE).unwrap();
        let args: Vec<_> = compile.get_args().collect();
        assert_eq!(args, vec!["-o", "source.out", "source.cpp"]);

        let run = runner.run_command(workdir, "").unwrap();
        assert_eq!(run.get_program(), "/tmp/work/source.out");
    }

    #[test]
    fn precheck_accepts_printf_or_cout() {
        let runner = CppRunner::new("g++");
        let body = "#include <cstdio>\nint main() { int n; scanf(\"%d\", &n); printf(\"%d\", n); }";
        assert!(runner.is_plausible(body));
        assert!(!runner.is_plausible(&body.replace("printf", "puts")));
    }
}
