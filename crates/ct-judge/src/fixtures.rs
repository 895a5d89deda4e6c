//! Exercise fixtures.
//!
//! An exercise directory holds paired `in_<n>.txt` / `out_<n>.txt` files.
//! The catalogue is the set of exercise directories under one root.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use ct_core::{ExerciseId, ValidationError};
use regex::Regex;

use crate::JudgeError;

static INPUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^in_(\d+)\.txt$").unwrap());
static OUTPUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^out_(\d+)\.txt$").unwrap());

/// One input/expected-output pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Numeric suffix shared by the two fixture files.
    pub number: u32,
    pub input: String,
    pub expected: String,
}

impl TestCase {
    pub fn new(number: u32, input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            number,
            input: input.into(),
            expected: expected.into(),
        }
    }
}

/// An exercise and its fixtures, ordered by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    id: ExerciseId,
    tests: Vec<TestCase>,
}

impl Exercise {
    /// Creates an exercise. At least one test is required.
    pub fn new(id: ExerciseId, mut tests: Vec<TestCase>) -> Result<Self, ValidationError> {
        if tests.is_empty() {
            return Err(ValidationError::NoFixtures {
                exercise: id.to_string(),
            });
        }
        tests.sort_by_key(|test| test.number);
        Ok(Self { id, tests })
    }

    /// Loads an exercise from its fixture directory.
    ///
    /// Files that are neither inputs nor outputs are ignored.
    pub fn from_dir(id: ExerciseId, dir: &Path) -> Result<Self, JudgeError> {
        let mut inputs = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        for entry in fs::read_dir(dir).map_err(|source| JudgeError::io(dir, source))? {
            let entry = entry.map_err(|source| JudgeError::io(dir, source))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let (files, number) = if let Some(number) = fixture_number(&INPUT_RE, &name) {
                (&mut inputs, number)
            } else if let Some(number) = fixture_number(&OUTPUT_RE, &name) {
                (&mut outputs, number)
            } else {
                continue;
            };
            if let Some(first) = files.insert(number, name.clone()) {
                // read_dir order is unspecified
                let (first, second) = if first < name { (first, name) } else { (name, first) };
                return Err(ValidationError::DuplicateFixture {
                    exercise: id.to_string(),
                    first,
                    second,
                }
                .into());
            }
        }

        if inputs.len() != outputs.len() {
            return Err(ValidationError::FixtureCountMismatch {
                exercise: id.to_string(),
                inputs: inputs.len(),
                outputs: outputs.len(),
            }
            .into());
        }

        let mut tests = Vec::with_capacity(inputs.len());
        for (number, input_name) in inputs {
            let Some(output_name) = outputs.get(&number) else {
                return Err(ValidationError::UnpairedFixture {
                    exercise: id.to_string(),
                    input: input_name,
                }
                .into());
            };
            let input = read_fixture(&dir.join(&input_name))?;
            let expected = read_fixture(&dir.join(output_name))?;
            tests.push(TestCase::new(number, input, expected));
        }

        Ok(Self::new(id, tests)?)
    }

    pub const fn id(&self) -> &ExerciseId {
        &self.id
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }
}

fn fixture_number(pattern: &Regex, name: &str) -> Option<u32> {
    pattern.captures(name)?.get(1)?.as_str().parse().ok()
}

fn read_fixture(path: &Path) -> Result<String, JudgeError> {
    let bytes = fs::read(path).map_err(|source| JudgeError::io(path, source))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// All exercises a fragment may be judged against, in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    exercises: Vec<Exercise>,
}

impl Catalogue {
    /// Builds a catalogue from exercises held in memory.
    pub fn from_exercises(mut exercises: Vec<Exercise>) -> Result<Self, ValidationError> {
        if exercises.is_empty() {
            return Err(ValidationError::Empty {
                field: "exercise catalogue",
            });
        }
        exercises.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { exercises })
    }

    /// Loads every subdirectory of `root` as an exercise named after it.
    pub fn from_dir(root: &Path) -> Result<Self, JudgeError> {
        let mut exercises = Vec::new();
        for entry in fs::read_dir(root).map_err(|source| JudgeError::io(root, source))? {
            let entry = entry.map_err(|source| JudgeError::io(root, source))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let id = ExerciseId::new(entry.file_name().to_string_lossy())?;
            exercises.push(Exercise::from_dir(id, &path)?);
        }
        let catalogue = Self::from_exercises(exercises)?;
        tracing::debug!(
            root = %root.display(),
            exercises = catalogue.exercises.len(),
            "loaded exercise catalogue"
        );
        Ok(catalogue)
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn position(&self, id: &ExerciseId) -> Option<usize> {
        self.exercises.iter().position(|exercise| &exercise.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ExerciseId> {
        self.exercises.iter().map(Exercise::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn id(name: &str) -> ExerciseId {
        ExerciseId::new(name).unwrap()
    }

    #[test]
    fn loads_paired_fixtures_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        for n in [10, 2, 1] {
            write(dir.path(), &format!("in_{n}.txt"), &format!("input {n}"));
            write(dir.path(), &format!("out_{n}.txt"), &format!("output {n}"));
        }
        write(dir.path(), "README.md", "ignored");

        let exercise = Exercise::from_dir(id("pies"), dir.path()).unwrap();
        let numbers: Vec<u32> = exercise.tests().iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert_eq!(exercise.tests()[2].expected, "output 10");
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "in_1.txt", "1");
        write(dir.path(), "in_2.txt", "2");
        write(dir.path(), "out_1.txt", "1");

        let err = Exercise::from_dir(id("pies"), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            JudgeError::Validation(ValidationError::FixtureCountMismatch {
                inputs: 2,
                outputs: 1,
                ..
            })
        ));
    }

    #[test]
    fn unpaired_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "in_1.txt", "1");
        write(dir.path(), "out_2.txt", "2");

        let err = Exercise::from_dir(id("pies"), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            JudgeError::Validation(ValidationError::UnpairedFixture { .. })
        ));
    }

    #[test]
    fn duplicate_numbers_are_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "in_1.txt", "1");
        write(dir.path(), "in_01.txt", "1");
        write(dir.path(), "out_1.txt", "1");
        write(dir.path(), "out_01.txt", "1");

        let err = Exercise::from_dir(id("pies"), dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "exercise pies has fixtures in_01.txt and in_1.txt with the same number"
        );
    }

    #[test]
    fn zero_padded_suffixes_pair_up() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "in_02.txt", "two");
        write(dir.path(), "out_02.txt", "2");

        let exercise = Exercise::from_dir(id("pies"), dir.path()).unwrap();
        assert_eq!(exercise.tests(), &[TestCase::new(2, "two", "2")]);
    }

    #[test]
    fn empty_exercise_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = Exercise::from_dir(id("pies"), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            JudgeError::Validation(ValidationError::NoFixtures { .. })
        ));
    }

    #[test]
    fn catalogue_is_sorted_and_skips_files() {
        let root = TempDir::new().unwrap();
        for name in ["zero", "brackets"] {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            write(&dir, "in_1.txt", "x");
            write(&dir, "out_1.txt", "y");
        }
        write(root.path(), "notes.txt", "not an exercise");

        let catalogue = Catalogue::from_dir(root.path()).unwrap();
        let ids: Vec<&str> = catalogue.ids().map(ExerciseId::as_str).collect();
        assert_eq!(ids, vec!["brackets", "zero"]);
        assert_eq!(catalogue.position(&id("zero")), Some(1));
    }

    #[test]
    fn empty_catalogue_is_rejected() {
        assert!(Catalogue::from_exercises(Vec::new()).is_err());
    }
}
