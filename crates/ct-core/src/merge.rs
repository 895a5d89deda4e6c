//! Timeline merging.
//!
//! Interleaves code-tracker snapshots with activity-tracker events into a
//! single ordered table.
//!
//! # Algorithm Summary
//!
//! 1. Every snapshot starts with one row that has no activity attached.
//! 2. Events are walked in order with a cursor over snapshots. An event
//!    belongs to the last snapshot whose time is `<=` the event time (events
//!    before the first snapshot belong to the first one).
//! 3. Events on a file other than that snapshot's file are skipped.
//! 4. The first event of a snapshot attaches to its row; each further event
//!    inserts a copy of the snapshot right after and attaches to the copy.

use rayon::prelude::*;

use crate::activity::ActivityEvent;
use crate::snapshot::SnapshotRecord;
use crate::types::ValidationError;

/// Activity fields carried by a merged row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedActivity {
    /// Event time exactly as logged.
    pub timestamp_raw: String,
    pub event_type: String,
    pub event_data: String,
}

impl From<&ActivityEvent> for AttachedActivity {
    fn from(event: &ActivityEvent) -> Self {
        Self {
            timestamp_raw: event.timestamp_raw.clone(),
            event_type: event.event_type.clone(),
            event_data: event.event_data.clone(),
        }
    }
}

/// One row of the merged timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    /// Snapshot fields, identical to `snapshots[snapshot_index]`.
    pub snapshot: SnapshotRecord,
    /// Position of the source snapshot in the input.
    pub snapshot_index: usize,
    /// True for rows inserted to carry an additional event.
    pub duplicate: bool,
    /// Attached event, if any.
    pub activity: Option<AttachedActivity>,
}

impl MergedRow {
    /// A row for a snapshot with no activity attached.
    pub fn from_snapshot(snapshot: &SnapshotRecord, snapshot_index: usize) -> Self {
        Self {
            snapshot: snapshot.clone(),
            snapshot_index,
            duplicate: false,
            activity: None,
        }
    }
}

/// Builds a timeline without any activity, one row per snapshot.
pub fn rows_without_activity(snapshots: &[SnapshotRecord]) -> Vec<MergedRow> {
    snapshots
        .iter()
        .enumerate()
        .map(|(index, snapshot)| MergedRow::from_snapshot(snapshot, index))
        .collect()
}

/// Merges snapshots and activity events into one ordered timeline.
///
/// Both inputs must be sorted by time. Inputs are not modified. The result
/// has at least one row per snapshot and keeps snapshot order; ties between
/// an event and a snapshot bind the event to that snapshot rather than the
/// previous one.
pub fn merge_timeline(
    snapshots: &[SnapshotRecord],
    events: &[ActivityEvent],
) -> Result<Vec<MergedRow>, ValidationError> {
    let mut rows = rows_without_activity(snapshots);
    if snapshots.is_empty() {
        tracing::debug!(events = events.len(), "no snapshots to merge events into");
        return Ok(rows);
    }

    let last = snapshots.len() - 1;
    let mut current = 0;
    // Row index of the latest row belonging to `current`.
    let mut cursor = 0;
    let mut filled = false;
    let mut attached = 0usize;

    for event in events {
        let mut target = current;
        while target < last && event.timestamp >= snapshots[target + 1].date {
            target += 1;
        }

        if !event.is_on_file(&snapshots[target].file_name) {
            continue;
        }

        if target != current {
            cursor += target - current;
            current = target;
            filled = false;
        }

        let activity = AttachedActivity::from(event);
        if filled {
            let row = MergedRow {
                snapshot: snapshots[current].clone(),
                snapshot_index: current,
                duplicate: true,
                activity: Some(activity),
            };
            insert_row(&mut rows, cursor + 1, row)?;
            cursor += 1;
        } else {
            rows[cursor].activity = Some(activity);
            filled = true;
        }
        attached += 1;
    }

    tracing::debug!(
        snapshots = snapshots.len(),
        events = events.len(),
        attached,
        rows = rows.len(),
        "merged timeline"
    );
    Ok(rows)
}

/// Merges several independent sessions against the same activity log.
///
/// Sessions share no state and are merged in parallel.
pub fn merge_sessions(
    sessions: &[Vec<SnapshotRecord>],
    events: &[ActivityEvent],
) -> Result<Vec<Vec<MergedRow>>, ValidationError> {
    sessions
        .par_iter()
        .map(|snapshots| merge_timeline(snapshots, events))
        .collect()
}

/// Inserts a row before `index`, so that it ends up at position `index`.
///
/// An index past the end of the table means the merge lost track of its
/// rows, which is never recoverable.
fn insert_row(
    rows: &mut Vec<MergedRow>,
    index: usize,
    row: MergedRow,
) -> Result<(), ValidationError> {
    if index > rows.len() {
        tracing::error!(index, len = rows.len(), "invalid merge insertion index");
        return Err(ValidationError::InsertionOutOfRange {
            index,
            len: rows.len(),
        });
    }
    rows.insert(index, row);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: u32) -> String {
        format!("2020-01-01T00:{:02}:{:02}.000+03:00", seconds / 60, seconds % 60)
    }

    fn snapshot(seconds: u32, file: &str, fragment: &str) -> SnapshotRecord {
        SnapshotRecord::new(file, &at(seconds), fragment).unwrap()
    }

    fn event(seconds: u32, data: &str, file: &str) -> ActivityEvent {
        let path = format!("/home/student/project/{file}");
        ActivityEvent::new(&at(seconds), "Action", data, Some(&path)).unwrap()
    }

    fn three_snapshots() -> Vec<SnapshotRecord> {
        vec![
            snapshot(0, "a.py", "a = 1"),
            snapshot(10, "a.py", "a = 1\nb = 2"),
            snapshot(20, "a.py", "a = 1\nb = 2\nprint(a + b)"),
        ]
    }

    fn event_data(rows: &[MergedRow]) -> Vec<Option<&str>> {
        rows.iter()
            .map(|row| row.activity.as_ref().map(|a| a.event_data.as_str()))
            .collect()
    }

    #[test]
    fn single_event_attaches_to_enclosing_snapshot() {
        let snapshots = three_snapshots();
        let rows = merge_timeline(&snapshots, &[event(5, "Run", "a.py")]).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(event_data(&rows), vec![Some("Run"), None, None]);
        assert!(rows.iter().all(|row| !row.duplicate));
    }

    #[test]
    fn event_on_other_file_is_ignored() {
        let snapshots = three_snapshots();
        let rows = merge_timeline(&snapshots, &[event(5, "Run", "b.py")]).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.activity.is_none()));
    }

    #[test]
    fn second_event_in_interval_duplicates_snapshot() {
        let snapshots = three_snapshots();
        let events = [event(3, "EditorCopy", "a.py"), event(7, "EditorPaste", "a.py")];
        let rows = merge_timeline(&snapshots, &events).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(
            event_data(&rows),
            vec![Some("EditorCopy"), Some("EditorPaste"), None, None]
        );
        assert_eq!(rows[1].snapshot, snapshots[0]);
        assert_eq!(rows[1].snapshot_index, 0);
        assert!(rows[1].duplicate);
        assert_eq!(rows[2].snapshot, snapshots[1]);
        assert_eq!(rows[3].snapshot, snapshots[2]);
    }

    #[test]
    fn event_at_snapshot_time_binds_to_that_snapshot() {
        let snapshots = three_snapshots();
        let rows = merge_timeline(&snapshots, &[event(10, "Run", "a.py")]).unwrap();

        assert_eq!(event_data(&rows), vec![None, Some("Run"), None]);
    }

    #[test]
    fn event_before_first_snapshot_binds_to_first() {
        let snapshots = vec![snapshot(10, "a.py", "x"), snapshot(20, "a.py", "xy")];
        let rows = merge_timeline(&snapshots, &[event(2, "Run", "a.py")]).unwrap();

        assert_eq!(event_data(&rows), vec![Some("Run"), None]);
    }

    #[test]
    fn events_after_last_snapshot_attach_then_duplicate() {
        let snapshots = three_snapshots();
        let events = [
            event(25, "Run", "a.py"),
            event(30, "Stop", "a.py"),
            event(40, "Rerun", "a.py"),
        ];
        let rows = merge_timeline(&snapshots, &events).unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(
            event_data(&rows),
            vec![None, None, Some("Run"), Some("Stop"), Some("Rerun")]
        );
        assert!(rows[3..].iter().all(|row| row.snapshot_index == 2 && row.duplicate));
    }

    #[test]
    fn skipped_snapshots_keep_default_rows() {
        let snapshots = three_snapshots();
        let events = [event(1, "Run", "a.py"), event(21, "Stop", "a.py")];
        let rows = merge_timeline(&snapshots, &events).unwrap();

        assert_eq!(event_data(&rows), vec![Some("Run"), None, Some("Stop")]);
    }

    #[test]
    fn foreign_event_does_not_advance_cursor() {
        let snapshots = vec![
            snapshot(0, "a.py", "x"),
            snapshot(10, "b.py", "y"),
            snapshot(20, "a.py", "z"),
        ];
        // Belongs to b.py's interval but edits a.py: skipped.
        let events = [event(12, "Run", "a.py"), event(22, "Stop", "a.py")];
        let rows = merge_timeline(&snapshots, &events).unwrap();

        assert_eq!(event_data(&rows), vec![None, None, Some("Stop")]);
    }

    #[test]
    fn no_snapshots_yields_empty_timeline() {
        let rows = merge_timeline(&[], &[event(1, "Run", "a.py")]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn merge_is_deterministic() {
        let snapshots = three_snapshots();
        let events = [
            event(3, "EditorCopy", "a.py"),
            event(7, "EditorPaste", "a.py"),
            event(12, "Run", "b.py"),
            event(15, "Run", "a.py"),
        ];
        let first = merge_timeline(&snapshots, &events).unwrap();
        let second = merge_timeline(&snapshots, &events).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn merge_preserves_snapshots_for_many_layouts() {
        // Small LCG so the layouts vary deterministically.
        let mut seed: u32 = 17;
        let mut next = |bound: u32| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed >> 16) % bound
        };

        for _ in 0..50 {
            let snapshot_count = 1 + next(6);
            let snapshots: Vec<SnapshotRecord> = (0..snapshot_count)
                .map(|i| snapshot(i * 10, "a.py", &"x".repeat(i as usize)))
                .collect();
            let mut times: Vec<u32> = (0..next(12)).map(|_| next(70)).collect();
            times.sort_unstable();
            let events: Vec<ActivityEvent> = times
                .iter()
                .map(|&t| event(t, "Run", if next(4) == 0 { "b.py" } else { "a.py" }))
                .collect();

            let rows = merge_timeline(&snapshots, &events).unwrap();

            assert!(rows.len() >= snapshots.len());
            let originals: Vec<&SnapshotRecord> = rows
                .iter()
                .filter(|row| !row.duplicate)
                .map(|row| &row.snapshot)
                .collect();
            assert_eq!(originals, snapshots.iter().collect::<Vec<_>>());
            for row in &rows {
                assert_eq!(row.snapshot, snapshots[row.snapshot_index]);
            }
            let indices: Vec<usize> = rows.iter().map(|row| row.snapshot_index).collect();
            assert!(indices.windows(2).all(|w| w[0] <= w[1]));

            let matching = events.iter().filter(|e| e.is_on_file("a.py")).count();
            let with_activity = rows.iter().filter(|row| row.activity.is_some()).count();
            assert_eq!(with_activity, matching);
        }
    }

    #[test]
    fn insert_row_rejects_index_past_end() {
        let snapshots = three_snapshots();
        let mut rows = rows_without_activity(&snapshots);
        let row = MergedRow::from_snapshot(&snapshots[0], 0);

        let err = insert_row(&mut rows, 5, row.clone()).unwrap_err();
        assert_eq!(err, ValidationError::InsertionOutOfRange { index: 5, len: 3 });

        insert_row(&mut rows, 3, row).unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn merge_sessions_merges_each_session() {
        let sessions = vec![
            vec![snapshot(0, "a.py", "x"), snapshot(10, "a.py", "xy")],
            vec![snapshot(0, "b.py", "y")],
        ];
        let events = [event(1, "Run", "a.py"), event(2, "Stop", "b.py")];
        let merged = merge_sessions(&sessions, &events).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(event_data(&merged[0]), vec![Some("Run"), None]);
        assert_eq!(event_data(&merged[1]), vec![Some("Stop")]);
    }
}
