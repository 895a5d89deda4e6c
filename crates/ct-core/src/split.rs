//! Exercise boundary detection and labelling.
//!
//! A session usually covers several exercises one after another. Boundaries
//! are found either from tracker metadata alone ([`find_candidate_splits`])
//! or by asking a judge whether the code right before a large deletion
//! already solved something ([`confirm_splits`]).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::merge::MergedRow;
use crate::score::TestScore;
use crate::types::{ExerciseId, Language, ValidationError};

/// Status written on rows whose fragment fully solves their exercise.
pub const SOLVED_STATUS: &str = "solved";

/// Configuration for split detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Minimum fragment length change, in characters, for a boundary.
    pub threshold_chars: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { threshold_chars: 30 }
    }
}

/// Something that can tell whether a fragment solves any known exercise.
///
/// Implemented by the judge; tests use in-memory fakes.
pub trait ExerciseMatcher {
    type Error;

    /// Returns true if `fragment` passes at least one fixture of some exercise.
    fn solves_any(&self, fragment: &str, language: Language) -> Result<bool, Self::Error>;
}

/// Finds rows after which the student probably switched exercises.
///
/// Index `i` is flagged when the fragment length changes by at least the
/// threshold between rows `i` and `i + 1`, and both the exercise label and
/// its status change. Absent labels compare as their own value.
pub fn find_candidate_splits(rows: &[MergedRow], config: &SplitConfig) -> BTreeSet<usize> {
    rows.windows(2)
        .enumerate()
        .filter(|(_, pair)| {
            let (current, next) = (&pair[0].snapshot, &pair[1].snapshot);
            current.fragment_len().abs_diff(next.fragment_len()) >= config.threshold_chars
                && current.chosen_task != next.chosen_task
                && current.task_status != next.task_status
        })
        .map(|(index, _)| index)
        .collect()
}

/// Finds boundaries where a large deletion follows a working solution.
///
/// For every row whose fragment is at least the threshold longer than the
/// next one, the matcher is asked whether that fragment solves anything.
/// Each distinct fragment is judged once.
pub fn confirm_splits<M: ExerciseMatcher>(
    rows: &[MergedRow],
    language: Language,
    matcher: &M,
    config: &SplitConfig,
) -> Result<BTreeSet<usize>, M::Error> {
    let mut verdicts: HashMap<&str, bool> = HashMap::new();
    let mut splits = BTreeSet::new();

    for (index, pair) in rows.windows(2).enumerate() {
        let (current, next) = (&pair[0].snapshot, &pair[1].snapshot);
        let shrink = current.fragment_len().saturating_sub(next.fragment_len());
        if shrink < config.threshold_chars {
            continue;
        }

        let fragment = current.fragment.as_str();
        let solves = match verdicts.get(fragment) {
            Some(&known) => known,
            None => {
                let judged = matcher.solves_any(fragment, language)?;
                verdicts.insert(fragment, judged);
                judged
            }
        };
        if solves {
            tracing::debug!(index, shrink, "confirmed split");
            splits.insert(index);
        }
    }

    Ok(splits)
}

/// A merged row labelled with the exercise it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledRow {
    pub row: MergedRow,
    /// Exercise this row works towards, if any later row solves one.
    pub exercise: Option<ExerciseId>,
    /// True if this row's own fragment fully solves `exercise`.
    pub solved: bool,
}

impl LabelledRow {
    /// Status to report downstream for this row.
    pub fn status(&self) -> Option<&str> {
        self.solved.then_some(SOLVED_STATUS)
    }
}

/// Labels each row with the exercise it solves, then back-fills.
///
/// `scores[i]` holds the judge results for `rows[i]`. A row is solved when
/// exactly one exercise passes all of its fixtures; more than one is an
/// error. Unsolved rows take the label of the next solved row, so the work
/// leading up to a solution is attributed to it.
pub fn label_solved(
    rows: &[MergedRow],
    scores: &[BTreeMap<ExerciseId, TestScore>],
) -> Result<Vec<LabelledRow>, ValidationError> {
    if rows.len() != scores.len() {
        return Err(ValidationError::ScoreCountMismatch {
            rows: rows.len(),
            scores: scores.len(),
        });
    }

    let mut labelled = Vec::with_capacity(rows.len());
    for (row, row_scores) in rows.iter().zip(scores) {
        let solved: Vec<&ExerciseId> = row_scores
            .iter()
            .filter(|(_, score)| score.is_full())
            .map(|(exercise, _)| exercise)
            .collect();
        let exercise = match solved.as_slice() {
            [] => None,
            [only] => Some((*only).clone()),
            many => {
                tracing::error!(?many, "fragment solves several exercises");
                return Err(ValidationError::ConflictingSolutions {
                    exercises: many.iter().map(ToString::to_string).collect(),
                });
            }
        };
        labelled.push(LabelledRow {
            row: row.clone(),
            solved: exercise.is_some(),
            exercise,
        });
    }

    let mut next_label: Option<ExerciseId> = None;
    for row in labelled.iter_mut().rev() {
        match &row.exercise {
            Some(exercise) => next_label = Some(exercise.clone()),
            None => row.exercise.clone_from(&next_label),
        }
    }

    Ok(labelled)
}

/// Groups labelled rows per exercise, keeping timeline order.
///
/// Rows without a label are not part of any exercise.
pub fn partition_by_exercise(rows: &[LabelledRow]) -> BTreeMap<ExerciseId, Vec<LabelledRow>> {
    let mut partitions: BTreeMap<ExerciseId, Vec<LabelledRow>> = BTreeMap::new();
    for row in rows {
        if let Some(exercise) = &row.exercise {
            partitions
                .entry(exercise.clone())
                .or_default()
                .push(row.clone());
        }
    }
    partitions
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::convert::Infallible;

    use super::*;
    use crate::merge::rows_without_activity;
    use crate::snapshot::SnapshotRecord;

    fn row(fragment_len: usize, task: Option<&str>, status: Option<&str>) -> SnapshotRecord {
        SnapshotRecord::new("a.py", "2020-01-01T00:00:00+00:00", "x".repeat(fragment_len))
            .unwrap()
            .with_task(task, status)
    }

    fn id(name: &str) -> ExerciseId {
        ExerciseId::new(name).unwrap()
    }

    struct FakeMatcher {
        solving: Vec<String>,
        calls: Cell<usize>,
    }

    impl ExerciseMatcher for FakeMatcher {
        type Error = Infallible;

        fn solves_any(&self, fragment: &str, _language: Language) -> Result<bool, Infallible> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.solving.iter().any(|s| s == fragment))
        }
    }

    #[test]
    fn flags_when_length_label_and_status_change() {
        let rows = rows_without_activity(&[
            row(100, Some("pies"), Some("solved")),
            row(10, Some("zero"), None),
        ]);
        let splits = find_candidate_splits(&rows, &SplitConfig::default());
        assert_eq!(splits, BTreeSet::from([0]));
    }

    #[test]
    fn growth_counts_as_well_as_shrink() {
        let rows = rows_without_activity(&[
            row(10, Some("pies"), Some("solved")),
            row(100, Some("zero"), None),
        ]);
        let splits = find_candidate_splits(&rows, &SplitConfig::default());
        assert_eq!(splits, BTreeSet::from([0]));
    }

    #[test]
    fn small_delta_never_splits() {
        let rows = rows_without_activity(&[
            row(50, Some("pies"), Some("solved")),
            row(21, Some("zero"), None),
            row(50, None, Some("failed")),
        ]);
        let splits = find_candidate_splits(&rows, &SplitConfig::default());
        assert!(splits.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let rows = rows_without_activity(&[
            row(50, Some("pies"), Some("solved")),
            row(20, Some("zero"), None),
        ]);
        let splits = find_candidate_splits(&rows, &SplitConfig { threshold_chars: 30 });
        assert_eq!(splits, BTreeSet::from([0]));
    }

    #[test]
    fn all_three_conditions_are_required() {
        let config = SplitConfig::default();
        let label_only = rows_without_activity(&[
            row(100, Some("pies"), Some("solved")),
            row(10, Some("zero"), Some("solved")),
        ]);
        assert!(find_candidate_splits(&label_only, &config).is_empty());

        let status_only = rows_without_activity(&[
            row(100, Some("pies"), Some("solved")),
            row(10, Some("pies"), None),
        ]);
        assert!(find_candidate_splits(&status_only, &config).is_empty());
    }

    #[test]
    fn missing_label_counts_as_change() {
        let rows = rows_without_activity(&[row(100, None, None), row(10, Some("zero"), Some("x"))]);
        let splits = find_candidate_splits(&rows, &SplitConfig::default());
        assert_eq!(splits, BTreeSet::from([0]));
    }

    #[test]
    fn short_timelines_have_no_splits() {
        let config = SplitConfig::default();
        assert!(find_candidate_splits(&[], &config).is_empty());
        assert!(find_candidate_splits(&rows_without_activity(&[row(5, None, None)]), &config).is_empty());
    }

    #[test]
    fn confirm_splits_asks_matcher_after_large_deletions() {
        let solved = "x".repeat(60);
        let rows = rows_without_activity(&[
            row(60, None, None),
            row(5, None, None),
            row(60, None, None),
            row(2, None, None),
            row(40, None, None),
            row(35, None, None),
        ]);
        let matcher = FakeMatcher {
            solving: vec![solved],
            calls: Cell::new(0),
        };
        let splits =
            confirm_splits(&rows, Language::Python, &matcher, &SplitConfig::default()).unwrap();

        assert_eq!(splits, BTreeSet::from([0, 2]));
        // The repeated 60-char fragment is judged once; the 40 -> 35 step is too small.
        assert_eq!(matcher.calls.get(), 1);
    }

    #[test]
    fn confirm_splits_skips_unsolved_fragments() {
        let rows = rows_without_activity(&[row(60, None, None), row(5, None, None)]);
        let matcher = FakeMatcher {
            solving: Vec::new(),
            calls: Cell::new(0),
        };
        let splits =
            confirm_splits(&rows, Language::Python, &matcher, &SplitConfig::default()).unwrap();
        assert!(splits.is_empty());
        assert_eq!(matcher.calls.get(), 1);
    }

    fn scores(entries: &[(&str, u32, u32)]) -> BTreeMap<ExerciseId, TestScore> {
        entries
            .iter()
            .map(|&(name, total, passed)| (id(name), TestScore::new(total, passed)))
            .collect()
    }

    #[test]
    fn label_solved_back_fills_towards_solution() {
        let rows = rows_without_activity(&[
            row(1, None, None),
            row(2, None, None),
            row(3, None, None),
            row(4, None, None),
            row(5, None, None),
        ]);
        let results = vec![
            scores(&[("pies", 4, 0), ("zero", 4, 0)]),
            scores(&[("pies", 4, 4), ("zero", 4, 1)]),
            scores(&[("pies", 4, 0), ("zero", 4, 2)]),
            scores(&[("pies", 4, 0), ("zero", 4, 4)]),
            scores(&[("pies", 4, 0), ("zero", 4, 0)]),
        ];
        let labelled = label_solved(&rows, &results).unwrap();

        let labels: Vec<Option<&str>> = labelled
            .iter()
            .map(|r| r.exercise.as_ref().map(ExerciseId::as_str))
            .collect();
        assert_eq!(
            labels,
            vec![Some("pies"), Some("pies"), Some("zero"), Some("zero"), None]
        );
        let statuses: Vec<Option<&str>> = labelled.iter().map(LabelledRow::status).collect();
        assert_eq!(
            statuses,
            vec![None, Some("solved"), None, Some("solved"), None]
        );
    }

    #[test]
    fn label_solved_rejects_two_solutions() {
        let rows = rows_without_activity(&[row(1, None, None)]);
        let results = vec![scores(&[("pies", 2, 2), ("zero", 3, 3)])];
        let err = label_solved(&rows, &results).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ConflictingSolutions {
                exercises: vec!["pies".to_string(), "zero".to_string()]
            }
        );
    }

    #[test]
    fn label_solved_requires_one_result_per_row() {
        let rows = rows_without_activity(&[row(1, None, None), row(2, None, None)]);
        let err = label_solved(&rows, &[BTreeMap::new()]).unwrap_err();
        assert_eq!(err, ValidationError::ScoreCountMismatch { rows: 2, scores: 1 });
    }

    #[test]
    fn partition_groups_rows_by_label() {
        let rows = rows_without_activity(&[
            row(1, None, None),
            row(2, None, None),
            row(3, None, None),
        ]);
        let results = vec![
            scores(&[("pies", 1, 1)]),
            scores(&[("zero", 1, 1)]),
            scores(&[("zero", 1, 0)]),
        ];
        let labelled = label_solved(&rows, &results).unwrap();
        let partitions = partition_by_exercise(&labelled);

        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[&id("pies")].len(), 1);
        assert_eq!(partitions[&id("zero")].len(), 1);
        assert_eq!(partitions[&id("zero")][0].row.snapshot_index, 1);
    }
}
