//! Exercise working directories.
//!
//! Each exercise owns one directory. Access is serialized within the process
//! by a mutex and across processes by an advisory lock on `.lock`.

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ct_core::Language;
use fs2::FileExt;
use tempfile::NamedTempFile;

const LOCK_FILE: &str = ".lock";
const STAMP_SUFFIX: &str = ".stamp";

/// A working directory shared by every evaluation of one exercise.
#[derive(Debug)]
pub struct Workdir {
    path: PathBuf,
    local: Mutex<()>,
}

/// Exclusive access to a [`Workdir`], released on drop.
#[derive(Debug)]
pub struct WorkdirGuard<'a> {
    path: &'a Path,
    lock_file: File,
    _local: MutexGuard<'a, ()>,
}

impl Workdir {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            local: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until this process and every other one has let go.
    pub fn lock(&self) -> io::Result<WorkdirGuard<'_>> {
        // A panic while holding the guard leaves no state behind in the mutex.
        let local = self.local.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(&self.path)?;
        let lock_file = File::create(self.path.join(LOCK_FILE))?;
        lock_file.lock_exclusive()?;
        Ok(WorkdirGuard {
            path: &self.path,
            lock_file,
            _local: local,
        })
    }
}

impl WorkdirGuard<'_> {
    pub fn path(&self) -> &Path {
        self.path
    }

    /// Directory for one language's sources and build artifacts.
    pub fn language_dir(&self, language: Language) -> io::Result<PathBuf> {
        let dir = self.path.join(language.as_str());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for WorkdirGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}

/// Writes `contents` to `dir/name` through a temporary file and a rename.
///
/// Readers never see a partially written file.
pub fn write_atomic(dir: &Path, name: &str, contents: &str) -> io::Result<PathBuf> {
    let target = dir.join(name);
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    file.persist(&target).map_err(|err| err.error)?;
    Ok(target)
}

/// Identifies a source for artifact reuse.
pub fn fingerprint(language: Language, source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    language.hash(&mut hasher);
    source.hash(&mut hasher);
    format!("{}:{}:{:016x}", language, source.len(), hasher.finish())
}

fn stamp_path(dir: &Path, source_file: &str) -> PathBuf {
    dir.join(format!("{source_file}{STAMP_SUFFIX}"))
}

/// True if the artifacts in `dir` were built from this exact source.
pub fn is_built(dir: &Path, source_file: &str, fingerprint: &str) -> bool {
    fs::read_to_string(stamp_path(dir, source_file)).is_ok_and(|stamp| stamp == fingerprint)
}

/// Records that the artifacts in `dir` match `fingerprint`.
///
/// Only called after a successful build.
pub fn mark_built(dir: &Path, source_file: &str, fingerprint: &str) -> io::Result<()> {
    let name = format!("{source_file}{STAMP_SUFFIX}");
    write_atomic(dir, &name, fingerprint).map(|_| ())
}

/// Forgets any previous build, so a failed compile is never mistaken for a
/// successful one.
pub fn clear_built(dir: &Path, source_file: &str) -> io::Result<()> {
    match fs::remove_file(stamp_path(dir, source_file)) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
