//! Split command: finds exercise boundaries in a timeline.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ct_core::{Language, SplitConfig, confirm_splits, find_candidate_splits, read_timeline_file};
use serde::Serialize;

use super::util;
use crate::Config;

/// Options for the split command.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub threshold: Option<usize>,
    pub confirm: bool,
    pub fixtures: Option<PathBuf>,
    pub language: Option<Language>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SplitReport {
    rows: usize,
    threshold_chars: usize,
    /// Rows after which labels, status and fragment length all change.
    candidates: Vec<usize>,
    /// Rows whose code solved something right before a large deletion.
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmed: Option<Vec<usize>>,
}

fn list(indices: &[usize]) -> String {
    if indices.is_empty() {
        "none".to_string()
    } else {
        indices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Runs the split command.
pub fn run<W: Write>(writer: &mut W, config: &Config, input: &Path, options: &Options) -> Result<()> {
    let rows = read_timeline_file(input)
        .with_context(|| format!("failed to read timeline {}", input.display()))?;
    let split_config = SplitConfig {
        threshold_chars: options.threshold.unwrap_or(config.split.threshold_chars),
    };

    let candidates = find_candidate_splits(&rows, &split_config);
    let confirmed = if options.confirm {
        let language = util::resolve_language(options.language, &rows)?;
        let judge = util::load_judge(config, options.fixtures.as_deref())?;
        let confirmed = confirm_splits(&rows, language, &judge, &split_config)
            .context("failed to judge fragments")?;
        Some(confirmed.into_iter().collect())
    } else {
        None
    };

    let report = SplitReport {
        rows: rows.len(),
        threshold_chars: split_config.threshold_chars,
        candidates: candidates.into_iter().collect(),
        confirmed,
    };
    tracing::info!(
        rows = report.rows,
        candidates = report.candidates.len(),
        "found splits"
    );

    if options.json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "Rows: {}", report.rows)?;
    writeln!(writer, "Threshold: {} chars", report.threshold_chars)?;
    writeln!(writer, "Candidate splits after rows: {}", list(&report.candidates))?;
    if let Some(confirmed) = &report.confirmed {
        writeln!(writer, "Confirmed splits after rows: {}", list(confirmed))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::TempDir;

    fn timeline(dir: &TempDir) -> PathBuf {
        let long = "x".repeat(40);
        let log = format!(
            "fileName,date,fragment,chosenTask,taskStatus\n\
             a.py,2020-01-01T00:00:00.000+00:00,{long},pies,solved\n\
             a.py,2020-01-01T00:00:10.000+00:00,y,zero,\n\
             a.py,2020-01-01T00:00:20.000+00:00,yy,zero,\n"
        );
        let path = dir.path().join("timeline.csv");
        fs::write(&path, log).unwrap();
        path
    }

    #[test]
    fn reports_candidates_as_text() {
        let dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        run(&mut out, &Config::default(), &timeline(&dir), &Options::default()).unwrap();

        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        Rows: 3
        Threshold: 30 chars
        Candidate splits after rows: 0
        ");
    }

    #[test]
    fn threshold_override_applies() {
        let dir = TempDir::new().unwrap();
        let options = Options {
            threshold: Some(100),
            json: true,
            ..Options::default()
        };
        let mut out = Vec::new();
        run(&mut out, &Config::default(), &timeline(&dir), &options).unwrap();

        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["threshold_chars"], 100);
        assert_eq!(report["candidates"], serde_json::json!([]));
        assert!(report.get("confirmed").is_none());
    }

    #[test]
    fn confirm_needs_fixtures() {
        let dir = TempDir::new().unwrap();
        let options = Options {
            confirm: true,
            ..Options::default()
        };
        let err = run(&mut Vec::new(), &Config::default(), &timeline(&dir), &options).unwrap_err();
        assert!(err.to_string().contains("--fixtures"));
    }
}
