//! Code-tracker snapshots.

use chrono::{DateTime, FixedOffset};

use crate::timestamp::parse_tracker_timestamp;

/// A periodic capture of a student's source file plus profile metadata.
///
/// Raw text columns are kept verbatim so a merged row can reproduce the
/// original snapshot exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    /// Self-reported age, as logged.
    pub age: String,
    /// Self-reported programming experience, as logged.
    pub experience: String,
    /// Base name of the tracked file (e.g. `pies.py`).
    pub file_name: String,
    /// Parsed capture time.
    pub date: DateTime<FixedOffset>,
    /// Capture time exactly as logged.
    pub date_raw: String,
    /// The tracker's own `timestamp` column.
    pub timestamp: String,
    /// Language tag, as logged.
    pub language: String,
    /// Full source text at capture time.
    pub fragment: String,
    /// Exercise the student picked in the tracker UI.
    pub chosen_task: Option<String>,
    /// Status the tracker UI reported for that exercise.
    pub task_status: Option<String>,
}

impl SnapshotRecord {
    /// Creates a snapshot with empty profile fields.
    pub fn new(
        file_name: impl Into<String>,
        date_raw: &str,
        fragment: impl Into<String>,
    ) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            age: String::new(),
            experience: String::new(),
            file_name: file_name.into(),
            date: parse_tracker_timestamp(date_raw)?,
            date_raw: date_raw.to_string(),
            timestamp: String::new(),
            language: String::new(),
            fragment: fragment.into(),
            chosen_task: None,
            task_status: None,
        })
    }

    /// Sets the exercise label and status, normalizing blank values to `None`.
    #[must_use]
    pub fn with_task(mut self, chosen_task: Option<&str>, task_status: Option<&str>) -> Self {
        self.chosen_task = chosen_task.and_then(normalize_label);
        self.task_status = task_status.and_then(normalize_label);
        self
    }

    /// Length of the fragment in characters.
    pub fn fragment_len(&self) -> usize {
        self.fragment.chars().count()
    }
}

/// Turns a label cell into a value, treating blank cells as absent.
pub fn normalize_label(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
