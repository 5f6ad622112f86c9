//! Task repository contract and JSON file implementation.
//!
//! # Responsibility
//! - Own the on-disk container format (one JSON array of task records).
//! - Decode each persisted record independently so one bad record does not
//!   hide the rest.
//! - Replace the store file atomically on every save.
//!
//! # Invariants
//! - A missing store file reads as an empty task set.
//! - An unreadable or non-array container is reported, never overwritten.
//! - Saves go through a temp file in the same directory plus rename, so a
//!   crash mid-write leaves the previous file intact.
//! - Backups never replace an earlier backup.

use crate::model::format::TaskFormats;
use crate::model::task::{MalformedRecordError, Task, TaskRecord};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

const BACKUP_SUFFIX: &str = ".bak";
const MAX_BACKUP_FILES: u32 = 1000;

pub type RepoResult<T> = Result<T, RepoError>;

/// Decode outcome for one persisted record, in file order.
pub type RecordOutcome = Result<Task, MalformedRecordError>;

/// Storage error for task load/save operations.
#[derive(Debug)]
pub enum RepoError {
    /// The store file exists but could not be read.
    Read { path: PathBuf, source: io::Error },
    /// The store file was read but is not a JSON array of records.
    Corrupt { path: PathBuf, reason: String },
    Encode(serde_json::Error),
    /// Temp file creation, write, sync, rename or backup failed.
    Write { path: PathBuf, source: io::Error },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read task store `{}`: {source}", path.display())
            }
            Self::Corrupt { path, reason } => {
                write!(f, "task store `{}` is corrupt: {reason}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode tasks: {err}"),
            Self::Write { path, source } => {
                write!(f, "failed to write task store `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Corrupt { .. } => None,
            Self::Encode(err) => Some(err),
            Self::Write { source, .. } => Some(source),
        }
    }
}

/// Repository interface for whole-set task persistence.
pub trait TaskRepository {
    /// Reads every persisted record. Per-record failures are returned inline;
    /// only container-level failures are errors.
    fn load_tasks(&self, formats: &TaskFormats) -> RepoResult<Vec<RecordOutcome>>;
    /// Replaces the persisted set with `tasks`, in order.
    fn save_tasks(&self, tasks: &[Task], formats: &TaskFormats) -> RepoResult<()>;
    /// Copies the current persisted state aside before a lossy overwrite.
    /// Earlier backups are kept.
    ///
    /// Returns the backup location, or `None` when there was nothing to copy.
    fn backup(&self) -> RepoResult<Option<PathBuf>>;
}

/// JSON-file-backed task repository.
#[derive(Debug, Clone)]
pub struct JsonFileTaskRepository {
    path: PathBuf,
}

impl JsonFileTaskRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup name next to the store file: `<store file>.bak` for generation
    /// 0, `<store file>.bak.<n>` after that.
    pub fn backup_path(&self, generation: u32) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(BACKUP_SUFFIX);
        if generation > 0 {
            name.push(format!(".{generation}"));
        }
        self.path.with_file_name(name)
    }

    fn write_err(&self, source: io::Error) -> RepoError {
        RepoError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn write_atomically(&self, payload: &[u8]) -> RepoResult<()> {
        let dir = parent_dir(&self.path);
        fs::create_dir_all(dir).map_err(|err| self.write_err(err))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(|err| self.write_err(err))?;
        staged
            .write_all(payload)
            .map_err(|err| self.write_err(err))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|err| self.write_err(err))?;
        staged
            .persist(&self.path)
            .map_err(|err| self.write_err(err.error))?;
        Ok(())
    }
}

impl TaskRepository for JsonFileTaskRepository {
    fn load_tasks(&self, formats: &TaskFormats) -> RepoResult<Vec<RecordOutcome>> {
        let started_at = Instant::now();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("event=store_read module=repo status=ok mode=missing records=0");
                return Ok(Vec::new());
            }
            Err(source) => {
                error!(
                    "event=store_read module=repo status=error error_code=read_failed error={}",
                    source
                );
                return Err(RepoError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            info!("event=store_read module=repo status=ok mode=empty_file records=0");
            return Ok(Vec::new());
        }

        let values: Vec<Value> = serde_json::from_slice(&bytes).map_err(|err| {
            error!(
                "event=store_read module=repo status=error error_code=corrupt_container line={} column={}",
                err.line(),
                err.column()
            );
            RepoError::Corrupt {
                path: self.path.clone(),
                reason: err.to_string(),
            }
        })?;

        let outcomes: Vec<RecordOutcome> = values
            .into_iter()
            .map(|value| decode_record(value, formats))
            .collect();

        info!(
            "event=store_read module=repo status=ok mode=file records={} duration_ms={}",
            outcomes.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outcomes)
    }

    fn save_tasks(&self, tasks: &[Task], formats: &TaskFormats) -> RepoResult<()> {
        let started_at = Instant::now();

        let records: Vec<TaskRecord> = tasks.iter().map(|task| task.to_record(formats)).collect();
        let mut payload = serde_json::to_vec_pretty(&records).map_err(RepoError::Encode)?;
        payload.push(b'\n');

        match self.write_atomically(&payload) {
            Ok(()) => {
                info!(
                    "event=store_write module=repo status=ok records={} bytes={} duration_ms={}",
                    records.len(),
                    payload.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_write module=repo status=error records={} duration_ms={} error_code=write_failed error={}",
                    records.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn backup(&self) -> RepoResult<Option<PathBuf>> {
        let mut original = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RepoError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        for generation in 0..MAX_BACKUP_FILES {
            let target = self.backup_path(generation);
            let mut copy = match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(RepoError::Write {
                        path: target,
                        source,
                    })
                }
            };
            io::copy(&mut original, &mut copy)
                .and_then(|_| copy.sync_all())
                .map_err(|source| RepoError::Write {
                    path: target.clone(),
                    source,
                })?;
            warn!(
                "event=store_backup module=repo status=ok generation={}",
                generation
            );
            return Ok(Some(target));
        }

        error!("event=store_backup module=repo status=error error_code=backup_names_exhausted");
        Err(RepoError::Write {
            path: self.backup_path(0),
            source: io::Error::new(ErrorKind::AlreadyExists, "no free backup file name"),
        })
    }
}

fn decode_record(value: Value, formats: &TaskFormats) -> RecordOutcome {
    let record: TaskRecord = serde_json::from_value(value)?;
    Task::from_record(record, formats)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::{parent_dir, JsonFileTaskRepository, TaskRepository};
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn backup_path_appends_suffix_and_generation_to_file_name() {
        let repo = JsonFileTaskRepository::new("/data/tasks.json");
        assert_eq!(repo.backup_path(0), PathBuf::from("/data/tasks.json.bak"));
        assert_eq!(repo.backup_path(2), PathBuf::from("/data/tasks.json.bak.2"));
    }

    #[test]
    fn backup_keeps_earlier_backups() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileTaskRepository::new(dir.path().join("tasks.json"));
        assert_eq!(repo.backup().unwrap(), None);

        fs::write(repo.path(), "first").unwrap();
        assert_eq!(repo.backup().unwrap(), Some(repo.backup_path(0)));
        fs::write(repo.path(), "second").unwrap();
        assert_eq!(repo.backup().unwrap(), Some(repo.backup_path(1)));

        assert_eq!(fs::read_to_string(repo.backup_path(0)).unwrap(), "first");
        assert_eq!(fs::read_to_string(repo.backup_path(1)).unwrap(), "second");
    }

    #[test]
    fn parent_dir_falls_back_to_current_dir_for_bare_file_names() {
        assert_eq!(parent_dir(Path::new("tasks.json")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/var/tasks.json")), Path::new("/var"));
    }
}
