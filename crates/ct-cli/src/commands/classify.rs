//! Classify command: scores every fragment of a timeline.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use ct_core::{
    ExerciseId, Language, LabelledRow, MergedRow, TestScore, label_solved, partition_by_exercise,
    read_timeline_file, write_timeline,
};
use ct_db::{Database, RunRecord};
use ct_judge::{Classification, Judge};

use super::util;
use crate::Config;

/// Columns appended to a classified timeline.
pub const RESULT_COLUMNS: [&str; 2] = ["testsResults", "bestExercises"];

/// Options for the classify command.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub fixtures: Option<PathBuf>,
    pub language: Option<Language>,
    pub label: bool,
    pub partition_dir: Option<PathBuf>,
    pub use_cache: bool,
}

/// Judges a fragment, going through the verdict cache when one is open.
fn classify_fragment(
    judge: &Judge,
    cache: Option<&mut Database>,
    language: Language,
    fragment: &str,
) -> Result<Classification> {
    let Some(db) = cache else {
        return Ok(judge.classify(fragment, language)?);
    };

    let cached = db.cached_scores(language, fragment)?;
    let hits: BTreeMap<ExerciseId, TestScore> = judge
        .catalogue()
        .ids()
        .filter_map(|id| cached.get(id).map(|score| (id.clone(), *score)))
        .collect();
    if hits.len() == judge.catalogue().exercises().len() {
        tracing::trace!("verdict cache hit");
        return Ok(Classification::from_scores(hits));
    }

    let classification = judge.classify(fragment, language)?;
    db.store_scores(judge.run_id(), language, fragment, &classification.scores)
        .context("failed to store verdicts")?;
    Ok(classification)
}

/// Row with its task columns replaced by the labelled exercise.
fn relabelled(row: &LabelledRow) -> MergedRow {
    let mut merged = row.row.clone();
    merged.snapshot.chosen_task = row.exercise.as_ref().map(ToString::to_string);
    merged.snapshot.task_status = row.status().map(str::to_string);
    merged
}

fn write_file(path: &Path, rows: &[MergedRow], values: &[Vec<String>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let headers: &[&str] = if values.is_empty() { &[] } else { &RESULT_COLUMNS };
    write_timeline(BufWriter::new(file), rows, headers, values)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Runs the classify command.
///
/// The classified timeline goes to `output`, or to `writer` when no output
/// file is given.
pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    input: &Path,
    output: Option<&Path>,
    options: &Options,
) -> Result<()> {
    let rows = read_timeline_file(input)
        .with_context(|| format!("failed to read timeline {}", input.display()))?;
    let language = util::resolve_language(options.language, &rows)?;
    let judge = util::load_judge(config, options.fixtures.as_deref())?;

    let mut cache = if options.use_cache {
        let mut db = util::open_database(config)?;
        db.record_run(&RunRecord {
            id: judge.run_id(),
            started_at: Utc::now(),
            input_path: input.display().to_string(),
            language,
        })
        .context("failed to record run")?;
        Some(db)
    } else {
        None
    };

    let mut by_fragment: HashMap<&str, Classification> = HashMap::new();
    for row in &rows {
        let fragment = row.snapshot.fragment.as_str();
        if !by_fragment.contains_key(fragment) {
            let classification = classify_fragment(&judge, cache.as_mut(), language, fragment)
                .with_context(|| format!("failed to judge row {}", row.snapshot_index))?;
            by_fragment.insert(fragment, classification);
        }
    }
    tracing::info!(
        rows = rows.len(),
        fragments = by_fragment.len(),
        run_id = %judge.run_id(),
        "classified timeline"
    );

    let classifications: Vec<&Classification> = rows
        .iter()
        .map(|row| &by_fragment[row.snapshot.fragment.as_str()])
        .collect();
    let values: Vec<Vec<String>> = classifications
        .iter()
        .map(|classification| {
            let results = judge.catalogue().ids().map(|id| {
                classification
                    .scores
                    .get(id)
                    .copied()
                    .unwrap_or_default()
            });
            vec![util::join(results), util::join(&classification.best)]
        })
        .collect();

    let output_rows: Vec<MergedRow> = if options.label {
        let scores: Vec<BTreeMap<ExerciseId, TestScore>> = classifications
            .iter()
            .map(|classification| classification.scores.clone())
            .collect();
        let labelled = label_solved(&rows, &scores).context("failed to label timeline")?;

        if let Some(dir) = &options.partition_dir {
            fs::create_dir_all(dir).context("failed to create partition directory")?;
            for (exercise, exercise_rows) in partition_by_exercise(&labelled) {
                let relabelled: Vec<MergedRow> = exercise_rows.iter().map(relabelled).collect();
                write_file(&dir.join(format!("{exercise}.csv")), &relabelled, &[])?;
            }
        }
        labelled.iter().map(relabelled).collect()
    } else {
        rows.clone()
    };

    match output {
        Some(path) => write_file(path, &output_rows, &values)?,
        None => write_timeline(&mut *writer, &output_rows, &RESULT_COLUMNS, &values)
            .context("failed to write timeline")?,
    }
    Ok(())
}
