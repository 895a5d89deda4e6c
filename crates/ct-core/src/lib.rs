//! Core domain logic for code-tracker timelines.
//!
//! This crate contains the fundamental types and logic for:
//! - Merging: aligning activity-tracker events with code snapshots
//! - Splitting: finding where a session moves on to another exercise
//! - Logs: reading and writing the trackers' Latin-1 CSV files

pub mod activity;
pub mod logs;
pub mod merge;
pub mod score;
pub mod snapshot;
pub mod split;
pub mod timestamp;
pub mod types;

pub use activity::{
    ACTION_EVENTS, ActivityEvent, ActivityKind, UnknownActivityKind, edited_file_names,
    preprocess_activity,
};
pub use logs::{
    LogError, read_activity_file, read_snapshots_file, read_timeline_file, write_timeline,
};
pub use merge::{AttachedActivity, MergedRow, merge_sessions, merge_timeline, rows_without_activity};
pub use score::TestScore;
pub use snapshot::SnapshotRecord;
pub use split::{
    ExerciseMatcher, LabelledRow, SplitConfig, confirm_splits, find_candidate_splits,
    label_solved, partition_by_exercise,
};
pub use types::{ExerciseId, Language, ValidationError, detect_language};
