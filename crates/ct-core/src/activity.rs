//! Activity-tracker events and their preprocessing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};

use crate::timestamp::parse_tracker_timestamp;
use crate::types::ValidationError;

/// IDE actions worth keeping in a merged timeline.
pub const ACTION_EVENTS: &[&str] = &[
    "Run",
    "Rerun",
    "RunClass",
    "DebugClass",
    "ToggleLineBreakpoint",
    "Debugger.AddToWatch",
    "Debug",
    "Stop",
    "Resume",
    "StepInto",
    "CompileDirty",
    "EditorCopy",
    "EditorPaste",
    "EditorCut",
    "ReformatCode",
    "$Undo",
    "$Paste",
    "$Copy",
    "ChooseRunConfiguration",
    "CopyElement",
    "PasteElement",
    "CutElement",
];

/// Event types kept after preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Action,
    CompilationFinished,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Action => "Action",
            Self::CompilationFinished => "CompilationFinished",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Action" => Ok(Self::Action),
            "CompilationFinished" => Ok(Self::CompilationFinished),
            _ => Err(UnknownActivityKind(s.to_string())),
        }
    }
}

/// Error type for event type strings outside [`ActivityKind`].
#[derive(Debug, Clone)]
pub struct UnknownActivityKind(String);

impl fmt::Display for UnknownActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown activity kind: {}", self.0)
    }
}

impl std::error::Error for UnknownActivityKind {}

/// A fine-grained IDE interaction logged by the activity tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    /// Parsed event time.
    pub timestamp: DateTime<FixedOffset>,
    /// Event time exactly as logged.
    pub timestamp_raw: String,
    pub username: String,
    /// Event type (e.g. `Action`, `KeyPressed`).
    pub event_type: String,
    /// Event payload (e.g. the action id).
    pub event_data: String,
    pub project_name: String,
    /// UI component that had focus.
    pub focused_component: String,
    /// Absolute path of the file being edited, if any.
    pub current_file: Option<String>,
}

impl ActivityEvent {
    /// Creates an event with empty user and project fields.
    pub fn new(
        timestamp_raw: &str,
        event_type: impl Into<String>,
        event_data: impl Into<String>,
        current_file: Option<&str>,
    ) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            timestamp: parse_tracker_timestamp(timestamp_raw)?,
            timestamp_raw: timestamp_raw.to_string(),
            username: String::new(),
            event_type: event_type.into(),
            event_data: event_data.into(),
            project_name: String::new(),
            focused_component: String::new(),
            current_file: current_file
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(String::from),
        })
    }

    /// Base name of the edited file.
    pub fn file_name(&self) -> Option<&str> {
        self.current_file.as_deref().map(base_name)
    }

    /// Returns true if the event happened in the file with this base name.
    pub fn is_on_file(&self, file_name: &str) -> bool {
        self.file_name() == Some(file_name)
    }

    /// The event's kind, if it is one the timeline keeps.
    pub fn kind(&self) -> Option<ActivityKind> {
        self.event_type.parse().ok()
    }
}

/// Returns the last component of a path written by either OS.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Unifies equivalent actions and drops events that are not actions.
///
/// An action triggered from a toolbar is logged with the action id in the
/// focused-component column; those become `Action` events with the id as
/// payload. Afterwards only `Action` and `CompilationFinished` events whose
/// payload is in [`ACTION_EVENTS`] survive.
pub fn preprocess_activity(events: &[ActivityEvent]) -> Vec<ActivityEvent> {
    let kept: Vec<ActivityEvent> = events
        .iter()
        .map(|event| {
            if ACTION_EVENTS.contains(&event.focused_component.as_str()) {
                ActivityEvent {
                    event_type: ActivityKind::Action.to_string(),
                    event_data: event.focused_component.clone(),
                    ..event.clone()
                }
            } else {
                event.clone()
            }
        })
        .filter(|event| {
            event.kind().is_some() && ACTION_EVENTS.contains(&event.event_data.as_str())
        })
        .collect();
    tracing::debug!(
        before = events.len(),
        after = kept.len(),
        "preprocessed activity events"
    );
    kept
}

/// Collects the base names of all files edited in an activity log.
///
/// Two different directories holding a file with the same base name make
/// the log impossible to align by name, which is an error.
pub fn edited_file_names(events: &[ActivityEvent]) -> Result<Vec<String>, ValidationError> {
    let mut directories: BTreeMap<&str, &str> = BTreeMap::new();
    for path in events.iter().filter_map(|event| event.current_file.as_deref()) {
        let name = base_name(path);
        let directory = &path[..path.len() - name.len()];
        match directories.get(name) {
            Some(existing) if *existing != directory => {
                return Err(ValidationError::AmbiguousFileName {
                    name: name.to_string(),
                });
            }
            Some(_) => {}
            None => {
                directories.insert(name, directory);
            }
        }
    }
    Ok(directories.into_keys().map(String::from).collect())
}
