//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and structural invariants.
///
/// These are always fatal to the operation in progress.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A language tag or extension that no runner supports.
    #[error("unsupported language: {value}")]
    UnknownLanguage { value: String },

    /// A JVM source without a class declaration to name the file after.
    #[error("source code does not contain a class declaration")]
    MissingClassName,

    /// An exercise directory has a different number of inputs and outputs.
    #[error("exercise {exercise} has {inputs} input fixtures but {outputs} output fixtures")]
    FixtureCountMismatch {
        exercise: String,
        inputs: usize,
        outputs: usize,
    },

    /// An input fixture without the output that shares its suffix.
    #[error("exercise {exercise} has no output fixture for {input}")]
    UnpairedFixture { exercise: String, input: String },

    /// Two inputs or two outputs whose suffixes parse to the same number.
    #[error("exercise {exercise} has fixtures {first} and {second} with the same number")]
    DuplicateFixture {
        exercise: String,
        first: String,
        second: String,
    },

    /// An exercise with no fixtures at all.
    #[error("exercise {exercise} has no fixtures")]
    NoFixtures { exercise: String },

    /// A merge tried to insert a row past the end of the table.
    #[error("invalid insertion index {index} for a table of {len} rows")]
    InsertionOutOfRange { index: usize, len: usize },

    /// The activity log edits two different files that share a base name.
    #[error("activity log references {name} in more than one directory")]
    AmbiguousFileName { name: String },

    /// Per-row results that do not line up with the rows they describe.
    #[error("got results for {scores} rows but the timeline has {rows} rows")]
    ScoreCountMismatch { rows: usize, scores: usize },

    /// A fragment fully solves more than one exercise.
    #[error("several exercises are solved by one fragment: {}", exercises.join(", "))]
    ConflictingSolutions { exercises: Vec<String> },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated exercise identifier.
    ///
    /// Exercise IDs name a fixture directory (e.g., "pies", "max_3", "brackets").
    ExerciseId, "exercise ID"
);

/// A programming language the judge knows how to build and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Kotlin,
    Cpp,
}

impl Language {
    /// Every supported language, in a stable order.
    pub const ALL: [Self; 4] = [Self::Python, Self::Java, Self::Kotlin, Self::Cpp];

    /// String representation used in logs, config, and the verdict cache.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Cpp => "cpp",
        }
    }

    /// Source file extension, without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::Java => "java",
            Self::Kotlin => "kt",
            Self::Cpp => "cpp",
        }
    }

    /// Maps a file extension (with or without the dot) to a language.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|language| language.extension().eq_ignore_ascii_case(extension))
    }

    /// Maps a file name to a language by its extension.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        Self::from_extension(extension)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "java" => Ok(Self::Java),
            "kotlin" | "kt" => Ok(Self::Kotlin),
            "cpp" | "c++" => Ok(Self::Cpp),
            _ => Err(ValidationError::UnknownLanguage {
                value: s.to_string(),
            }),
        }
    }
}

/// Determines the language of a session from the names of its files.
///
/// Returns `None` when the files disagree or none has a known extension.
pub fn detect_language<'a>(file_names: impl IntoIterator<Item = &'a str>) -> Option<Language> {
    let mut detected = None;
    for name in file_names {
        let language = Language::from_file_name(name)?;
        match detected {
            None => detected = Some(language),
            Some(previous) if previous != language => return None,
            Some(_) => {}
        }
    }
    detected
}
