//! Reading and writing tracker logs.
//!
//! Both trackers write ISO-8859-1 CSV. Every byte is decoded to the code
//! point with the same value, and encoded back the same way on write.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use thiserror::Error;

use crate::activity::ActivityEvent;
use crate::merge::{AttachedActivity, MergedRow};
use crate::snapshot::{SnapshotRecord, normalize_label};
use crate::timestamp::parse_tracker_timestamp;

/// Snapshot log columns, in the order they are written back out.
pub const SNAPSHOT_COLUMNS: [&str; 9] = [
    "age",
    "programExperience",
    "fileName",
    "date",
    "timestamp",
    "language",
    "fragment",
    "chosenTask",
    "taskStatus",
];

/// Activity columns carried into a merged timeline.
pub const ACTIVITY_COLUMNS: [&str; 3] = ["timestampAti", "eventType", "eventData"];

/// Errors raised while reading or writing tracker logs.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("record {record}: invalid timestamp {value:?}")]
    Timestamp {
        record: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("snapshot log has no {0} column")]
    MissingColumn(&'static str),

    #[error("record {record} has {actual} extra values but {expected} extra columns were declared")]
    ExtraColumnCount {
        record: usize,
        expected: usize,
        actual: usize,
    },
}

/// Decodes ISO-8859-1 bytes.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Encodes text as ISO-8859-1, replacing unrepresentable characters with `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn open(path: &Path) -> Result<BufReader<File>, LogError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LogError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads a snapshot log file.
pub fn read_snapshots_file(path: &Path) -> Result<Vec<SnapshotRecord>, LogError> {
    read_snapshots(open(path)?)
}

/// Reads a snapshot log with a header row.
///
/// `fileName`, `date` and `fragment` are required; the other columns may be
/// missing and default to empty.
pub fn read_snapshots<R: Read>(reader: R) -> Result<Vec<SnapshotRecord>, LogError> {
    let records = read_records(reader)?;
    tracing::debug!(count = records.len(), "read snapshot log");
    Ok(records.into_iter().map(|(snapshot, _)| snapshot).collect())
}

/// Reads a timeline file.
pub fn read_timeline_file(path: &Path) -> Result<Vec<MergedRow>, LogError> {
    read_timeline(open(path)?)
}

/// Reads a merged timeline, or a plain snapshot log as a timeline without
/// activity.
///
/// A row whose snapshot fields equal the previous row's is taken to be a
/// duplicate carrying another event.
pub fn read_timeline<R: Read>(reader: R) -> Result<Vec<MergedRow>, LogError> {
    let mut rows: Vec<MergedRow> = Vec::new();
    for (snapshot, activity) in read_records(reader)? {
        let (snapshot_index, duplicate) = match rows.last() {
            Some(previous) if previous.snapshot == snapshot => (previous.snapshot_index, true),
            Some(previous) => (previous.snapshot_index + 1, false),
            None => (0, false),
        };
        rows.push(MergedRow {
            snapshot,
            snapshot_index,
            duplicate,
            activity,
        });
    }
    tracing::debug!(count = rows.len(), "read timeline");
    Ok(rows)
}

fn read_records<R: Read>(
    reader: R,
) -> Result<Vec<(SnapshotRecord, Option<AttachedActivity>)>, LogError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = csv.byte_headers()?.iter().map(decode_latin1).collect();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &'static str| column(name).ok_or(LogError::MissingColumn(name));

    let file_name = required("fileName")?;
    let date = required("date")?;
    let fragment = required("fragment")?;
    let age = column("age");
    let experience = column("programExperience");
    let timestamp = column("timestamp");
    let language = column("language");
    let chosen_task = column("chosenTask");
    let task_status = column("taskStatus");
    let [activity_time, event_type, event_data] = ACTIVITY_COLUMNS.map(column);

    let mut records = Vec::new();
    let mut record = ByteRecord::new();
    while csv.read_byte_record(&mut record)? {
        let field = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(decode_latin1)
                .unwrap_or_default()
        };
        let date_raw = field(Some(date));
        let parsed = parse_tracker_timestamp(&date_raw).map_err(|source| LogError::Timestamp {
            record: records.len() + 1,
            value: date_raw.clone(),
            source,
        })?;
        let snapshot = SnapshotRecord {
            age: field(age),
            experience: field(experience),
            file_name: field(Some(file_name)),
            date: parsed,
            date_raw,
            timestamp: field(timestamp),
            language: field(language),
            fragment: field(Some(fragment)),
            chosen_task: normalize_label(&field(chosen_task)),
            task_status: normalize_label(&field(task_status)),
        };
        let activity_raw = field(activity_time);
        let activity = (!activity_raw.trim().is_empty()).then(|| AttachedActivity {
            timestamp_raw: activity_raw,
            event_type: field(event_type),
            event_data: field(event_data),
        });
        records.push((snapshot, activity));
    }
    Ok(records)
}

/// Reads an activity log file.
pub fn read_activity_file(path: &Path) -> Result<Vec<ActivityEvent>, LogError> {
    read_activity(open(path)?)
}

/// Reads a header-less activity log.
///
/// Columns are positional: time, user, event type, event data, project,
/// focused component, current file. Later IDE-specific columns are ignored.
pub fn read_activity<R: Read>(reader: R) -> Result<Vec<ActivityEvent>, LogError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut events = Vec::new();
    let mut record = ByteRecord::new();
    while csv.read_byte_record(&mut record)? {
        let field = |index: usize| record.get(index).map(decode_latin1).unwrap_or_default();
        let timestamp_raw = field(0);
        let timestamp =
            parse_tracker_timestamp(&timestamp_raw).map_err(|source| LogError::Timestamp {
                record: events.len() + 1,
                value: timestamp_raw.clone(),
                source,
            })?;
        let current_file = field(6);
        let current_file = current_file.trim();
        events.push(ActivityEvent {
            timestamp,
            timestamp_raw,
            username: field(1),
            event_type: field(2),
            event_data: field(3),
            project_name: field(4),
            focused_component: field(5),
            current_file: (!current_file.is_empty()).then(|| current_file.to_string()),
        });
    }

    tracing::debug!(count = events.len(), "read activity log");
    Ok(events)
}

/// Writes a merged timeline as Latin-1 CSV.
///
/// `extra_headers` names additional columns appended after the activity
/// columns; `extra_values[i]` holds their values for `rows[i]`.
pub fn write_timeline<W: Write>(
    mut out: W,
    rows: &[MergedRow],
    extra_headers: &[&str],
    extra_values: &[Vec<String>],
) -> Result<(), LogError> {
    let mut csv = WriterBuilder::new().from_writer(Vec::new());

    let header = SNAPSHOT_COLUMNS
        .iter()
        .chain(ACTIVITY_COLUMNS.iter())
        .chain(extra_headers.iter());
    csv.write_record(header)?;

    for (index, row) in rows.iter().enumerate() {
        let extras = extra_values.get(index).map_or(&[][..], Vec::as_slice);
        if extras.len() != extra_headers.len() {
            return Err(LogError::ExtraColumnCount {
                record: index + 1,
                expected: extra_headers.len(),
                actual: extras.len(),
            });
        }

        let snapshot = &row.snapshot;
        let activity = row.activity.as_ref();
        let fields: [&str; 12] = [
            snapshot.age.as_str(),
            &snapshot.experience,
            &snapshot.file_name,
            &snapshot.date_raw,
            &snapshot.timestamp,
            &snapshot.language,
            &snapshot.fragment,
            snapshot.chosen_task.as_deref().unwrap_or_default(),
            snapshot.task_status.as_deref().unwrap_or_default(),
            activity.map_or("", |a| a.timestamp_raw.as_str()),
            activity.map_or("", |a| a.event_type.as_str()),
            activity.map_or("", |a| a.event_data.as_str()),
        ];
        csv.write_record(fields.iter().copied().chain(extras.iter().map(String::as_str)))?;
    }

    let buffer = csv
        .into_inner()
        .map_err(|err| LogError::Csv(csv::Error::from(err.into_error())))?;
    let text = String::from_utf8_lossy(&buffer);
    out.write_all(&encode_latin1(&text))
        .and_then(|()| out.flush())
        .map_err(|source| LogError::Io {
            path: PathBuf::from("<output>"),
            source,
        })?;

    tracing::debug!(rows = rows.len(), "wrote timeline");
    Ok(())
}
