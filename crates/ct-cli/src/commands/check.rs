//! Check command: scores one source file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ct_core::{ExerciseId, Language, TestScore};
use serde::Serialize;

use super::util;
use crate::Config;

/// Options for the check command.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub fixtures: Option<PathBuf>,
    pub language: Option<Language>,
    pub exercise: Option<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    language: Language,
    scores: BTreeMap<ExerciseId, TestScore>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    best: Vec<ExerciseId>,
}

/// Runs the check command.
pub fn run<W: Write>(writer: &mut W, config: &Config, source: &Path, options: &Options) -> Result<()> {
    let code = std::fs::read_to_string(source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let language = match options.language {
        Some(language) => language,
        None => source
            .file_name()
            .and_then(|name| Language::from_file_name(&name.to_string_lossy()))
            .with_context(|| {
                format!(
                    "cannot tell the language of {}; pass --language",
                    source.display()
                )
            })?,
    };
    let judge = util::load_judge(config, options.fixtures.as_deref())?;

    let report = if let Some(exercise) = &options.exercise {
        let exercise = ExerciseId::new(exercise.as_str())?;
        let score = judge.score_against(&code, language, &exercise)?;
        CheckReport {
            language,
            scores: BTreeMap::from([(exercise, score)]),
            best: Vec::new(),
        }
    } else {
        let classification = judge.classify(&code, language)?;
        CheckReport {
            language,
            scores: classification.scores,
            best: classification.best,
        }
    };

    if options.json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
        return Ok(());
    }

    let width = report
        .scores
        .keys()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0);
    writeln!(writer, "Language: {}", report.language)?;
    for (exercise, score) in &report.scores {
        writeln!(writer, "  {:<width$}  {score}", exercise.as_str())?;
    }
    if !report.best.is_empty() {
        writeln!(writer, "Best: {}", util::join(&report.best))?;
    }
    Ok(())
}
