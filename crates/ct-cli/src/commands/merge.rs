//! Merge command: aligns activity events with code snapshots.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ct_core::{
    edited_file_names, merge_sessions, preprocess_activity, read_activity_file,
    read_snapshots_file, write_timeline,
};

/// Runs the merge command.
///
/// A single snapshot log may be merged to `writer`; several need an output
/// directory, where each timeline is written as `<stem>_merged.csv`.
pub fn run<W: Write>(
    writer: &mut W,
    activity: &Path,
    snapshots: &[PathBuf],
    output_dir: Option<&Path>,
) -> Result<()> {
    if output_dir.is_none() && snapshots.len() > 1 {
        anyhow::bail!("merging several snapshot logs needs --output-dir");
    }

    let mut events = read_activity_file(activity)
        .with_context(|| format!("failed to read activity log {}", activity.display()))?;
    events.sort_by_key(|event| event.timestamp);
    let events = preprocess_activity(&events);
    let files = edited_file_names(&events).context("activity log cannot be aligned by file name")?;
    tracing::info!(events = events.len(), ?files, "loaded activity");

    let sessions = snapshots
        .iter()
        .map(|path| {
            let mut session = read_snapshots_file(path)
                .with_context(|| format!("failed to read snapshot log {}", path.display()))?;
            session.sort_by_key(|snapshot| snapshot.date);
            Ok(session)
        })
        .collect::<Result<Vec<_>>>()?;
    let merged = merge_sessions(&sessions, &events).context("failed to merge timelines")?;

    let Some(output_dir) = output_dir else {
        if let Some(rows) = merged.first() {
            write_timeline(&mut *writer, rows, &[], &[]).context("failed to write timeline")?;
        }
        return Ok(());
    };

    fs::create_dir_all(output_dir).context("failed to create output directory")?;
    for (path, rows) in snapshots.iter().zip(&merged) {
        let stem = path
            .file_stem()
            .map_or_else(|| "timeline".into(), |stem| stem.to_string_lossy());
        let target = output_dir.join(format!("{stem}_merged.csv"));
        let file = File::create(&target)
            .with_context(|| format!("failed to create {}", target.display()))?;
        write_timeline(BufWriter::new(file), rows, &[], &[])
            .with_context(|| format!("failed to write {}", target.display()))?;
        writeln!(writer, "{}: {} rows", target.display(), rows.len())?;
    }

    Ok(())
}
