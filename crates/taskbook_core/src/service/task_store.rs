//! Task store: the authoritative in-memory task set and its durable mirror.
//!
//! # Responsibility
//! - Load the persisted set once at construction.
//! - Validate and deduplicate caller input before building a `Task`.
//! - Assign monotonically increasing ids.
//! - Persist the complete set on every mutation.
//!
//! # Invariants
//! - Ids are unique and never reused within a process; the next id is always
//!   greater than every id seen at load time.
//! - No two tasks share a `DuplicateKey`.
//! - In-memory state only changes after the repository save succeeded, so an
//!   `Err` from a mutating call means nothing changed.
//! - Records skipped at load time are backed up before the first overwrite.

use crate::model::format::TaskFormats;
use crate::model::task::{
    DuplicateKey, MalformedRecordError, Priority, Task, TaskId, TaskStatus, ValidationError,
};
use crate::repo::task_repo::{JsonFileTaskRepository, RepoError, TaskRepository};
use chrono::{Local, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type StoreResult<T> = Result<T, StoreError>;

/// Clock used to stamp `created_at`/`last_updated_at`.
pub type Clock = fn() -> NaiveDateTime;

/// Error returned by task store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Caller input was rejected; nothing changed.
    Validation(ValidationError),
    NotFound(TaskId),
    /// The largest id is already taken; no further task can be added.
    IdsExhausted,
    /// The persisted set could not be loaded; the store was not constructed.
    Load(RepoError),
    /// The save failed; the in-memory set was left as it was before the call.
    Persistence(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::IdsExhausted => write!(f, "no task id left to assign"),
            Self::Load(err) => write!(f, "failed to load tasks: {err}"),
            Self::Persistence(err) => write!(f, "failed to persist tasks: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::IdsExhausted => None,
            Self::Load(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Construction-time settings for a file-backed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Location of the JSON store file.
    pub path: PathBuf,
    pub formats: TaskFormats,
}

impl StoreConfig {
    /// Config with the default date/timestamp formats.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            formats: TaskFormats::default(),
        }
    }
}

/// Persisted record that was left out of the in-memory set at load time.
#[derive(Debug)]
pub struct SkippedRecord {
    /// Zero-based position in the persisted container.
    pub index: usize,
    pub error: MalformedRecordError,
}

/// Request model for adding a task. All fields are raw caller input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    /// Due date text in the store's date format.
    pub due_date: String,
    /// `low|medium|high`, case-insensitive.
    pub priority: String,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            due_date: due_date.into(),
            priority: priority.into(),
            is_recurring: false,
            recurrence_pattern: None,
        }
    }

    /// Marks the task recurring with an opaque pattern note.
    pub fn recurring(mut self, pattern: impl Into<String>) -> Self {
        self.is_recurring = true;
        self.recurrence_pattern = Some(pattern.into());
        self
    }
}

/// Partial update for an existing task. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub status: Option<TaskStatus>,
    /// `Some(Some(pattern))` makes the task recurring, `Some(None)` clears it.
    pub recurrence: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn recurring(mut self, pattern: impl Into<String>) -> Self {
        self.recurrence = Some(Some(pattern.into()));
        self
    }

    pub fn not_recurring(mut self) -> Self {
        self.recurrence = Some(None);
        self
    }
}

/// File-backed task set with save-on-every-mutation semantics.
pub struct TaskStore<R: TaskRepository = JsonFileTaskRepository> {
    repo: R,
    formats: TaskFormats,
    tasks: Vec<Task>,
    /// `None` once the id space is used up.
    next_id: Option<TaskId>,
    skipped: Vec<SkippedRecord>,
    backup_pending: bool,
    clock: Clock,
}

impl TaskStore<JsonFileTaskRepository> {
    /// Opens the JSON file store at `config.path` and loads it.
    ///
    /// # Errors
    /// - `StoreError::Load` when the file exists but is unreadable or is not a
    ///   JSON array. The file is left untouched.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        Self::with_repository(JsonFileTaskRepository::new(config.path), config.formats)
    }

    pub fn path(&self) -> &Path {
        self.repo.path()
    }
}

impl<R: TaskRepository> TaskStore<R> {
    /// Creates a store over `repo` and loads the persisted set.
    ///
    /// Malformed records, repeated ids and repeated duplicate keys are
    /// skipped and reported through [`TaskStore::skipped_records`].
    pub fn with_repository(repo: R, formats: TaskFormats) -> StoreResult<Self> {
        let outcomes = repo.load_tasks(&formats).map_err(StoreError::Load)?;

        let mut tasks = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut seen_keys = HashSet::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let checked = outcome.and_then(|task| {
                if !seen_ids.insert(task.id()) {
                    return Err(MalformedRecordError::DuplicateId(task.id()));
                }
                if !seen_keys.insert(task.duplicate_key()) {
                    return Err(MalformedRecordError::DuplicateTask { id: task.id() });
                }
                Ok(task)
            });

            match checked {
                Ok(task) => tasks.push(task),
                Err(error) => {
                    warn!(
                        "event=record_skipped module=store status=warn index={} error_code={}",
                        index,
                        error.code()
                    );
                    skipped.push(SkippedRecord { index, error });
                }
            }
        }

        let next_id = tasks
            .iter()
            .map(Task::id)
            .max()
            .map_or(Some(TaskId::first()), TaskId::next);

        info!(
            "event=store_load module=store status=ok tasks={} skipped={} next_id={}",
            tasks.len(),
            skipped.len(),
            next_id.map_or_else(|| "exhausted".to_string(), |id| id.to_string())
        );

        Ok(Self {
            repo,
            formats,
            tasks,
            next_id,
            backup_pending: !skipped.is_empty(),
            skipped,
            clock: local_now,
        })
    }

    /// Replaces the timestamp source. Intended for deterministic callers.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn formats(&self) -> &TaskFormats {
        &self.formats
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// All tasks in insertion order.
    pub fn list_all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Records left out at load time.
    pub fn skipped_records(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    /// Validates `request`, appends a new `NotDone` task and persists the set.
    ///
    /// # Errors
    /// - `Validation`, checked in order: empty title, missing/malformed due
    ///   date, invalid priority, duplicate `(title, due_date)`.
    /// - `IdsExhausted` when a task with id `u64::MAX` already exists.
    /// - `Persistence` when the save fails; the task is not kept.
    pub fn add_task(&mut self, request: NewTask) -> StoreResult<Task> {
        let validated = self.validate_new(&request).inspect_err(|err| {
            debug!(
                "event=task_add module=store status=rejected reason={}",
                err.code()
            );
        })?;
        let id = self.next_id.ok_or_else(|| {
            warn!("event=task_add module=store status=rejected reason=ids_exhausted");
            StoreError::IdsExhausted
        })?;

        let now = (self.clock)();
        let task = Task {
            id,
            title: validated.title,
            description: request.description.trim().to_string(),
            due_date: validated.due_date,
            priority: validated.priority,
            status: TaskStatus::NotDone,
            created_at: now,
            last_updated_at: now,
            is_recurring: request.is_recurring,
            recurrence_pattern: normalize_recurrence(
                request.is_recurring,
                request.recurrence_pattern.as_deref(),
            ),
        };

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next, id.next())?;

        info!(
            "event=task_add module=store status=ok task_id={} tasks={}",
            task.id(),
            self.tasks.len()
        );
        Ok(task)
    }

    /// Applies `update` to the task with `id`, refreshes `last_updated_at`
    /// and persists the set.
    ///
    /// # Errors
    /// - `NotFound` for an unknown id.
    /// - `Validation` for rejected fields, with the same rules as `add_task`;
    ///   the duplicate check ignores the task being updated.
    /// - `Persistence` when the save fails; the previous version is kept.
    pub fn update_task(&mut self, id: TaskId, update: TaskUpdate) -> StoreResult<Task> {
        let position = self.position(id)?;
        let current = &self.tasks[position];

        let title = match update.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => current.title.clone(),
        };
        let due_date = match update.due_date.as_deref() {
            Some(text) => self.validate_due_date(text)?,
            None => current.due_date,
        };
        let priority = match update.priority.as_deref() {
            Some(text) => validate_priority(text)?,
            None => current.priority,
        };
        self.ensure_unique(&title, due_date, Some(id))?;

        let (is_recurring, recurrence_pattern) = match update.recurrence {
            Some(Some(pattern)) => (true, normalize_recurrence(true, Some(&pattern))),
            Some(None) => (false, None),
            None => (current.is_recurring, current.recurrence_pattern.clone()),
        };

        let revised = Task {
            id,
            title,
            description: update
                .description
                .map(|text| text.trim().to_string())
                .unwrap_or_else(|| current.description.clone()),
            due_date,
            priority,
            status: update.status.unwrap_or(current.status),
            created_at: current.created_at,
            last_updated_at: (self.clock)(),
            is_recurring,
            recurrence_pattern,
        };

        let mut next = self.tasks.clone();
        next[position] = revised.clone();
        self.commit(next, self.next_id)?;

        info!("event=task_update module=store status=ok task_id={}", id);
        Ok(revised)
    }

    pub fn mark_done(&mut self, id: TaskId) -> StoreResult<Task> {
        self.update_task(id, TaskUpdate::new().status(TaskStatus::Done))
    }

    pub fn mark_not_done(&mut self, id: TaskId) -> StoreResult<Task> {
        self.update_task(id, TaskUpdate::new().status(TaskStatus::NotDone))
    }

    /// Removes the task with `id` and persists the remaining set.
    ///
    /// The id is not handed out again by this store instance.
    pub fn delete_task(&mut self, id: TaskId) -> StoreResult<Task> {
        let position = self.position(id)?;

        let mut next = self.tasks.clone();
        let removed = next.remove(position);
        self.commit(next, self.next_id)?;

        info!(
            "event=task_delete module=store status=ok task_id={} tasks={}",
            id,
            self.tasks.len()
        );
        Ok(removed)
    }

    fn position(&self, id: TaskId) -> StoreResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn validate_new(&self, request: &NewTask) -> Result<ValidatedFields, ValidationError> {
        let title = validate_title(&request.title)?;
        let due_date = self.validate_due_date(&request.due_date)?;
        let priority = validate_priority(&request.priority)?;
        self.ensure_unique(&title, due_date, None)?;
        Ok(ValidatedFields {
            title,
            due_date,
            priority,
        })
    }

    fn validate_due_date(&self, text: &str) -> Result<NaiveDate, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::MissingDueDate);
        }
        self.formats
            .parse_date(text)
            .ok_or_else(|| ValidationError::MalformedDueDate {
                value: text.to_string(),
                expected_format: self.formats.date_pattern().to_string(),
            })
    }

    fn ensure_unique(
        &self,
        title: &str,
        due_date: NaiveDate,
        exclude: Option<TaskId>,
    ) -> Result<(), ValidationError> {
        let key = DuplicateKey::new(title, due_date);
        let taken = self
            .tasks
            .iter()
            .filter(|task| Some(task.id()) != exclude)
            .any(|task| task.duplicate_key() == key);
        if taken {
            return Err(ValidationError::DuplicateTask {
                title: title.to_string(),
                due_date,
            });
        }
        Ok(())
    }

    /// Saves `next` and only then swaps it in.
    fn commit(&mut self, next: Vec<Task>, next_id: Option<TaskId>) -> StoreResult<()> {
        if self.backup_pending {
            let backup = self.repo.backup().map_err(StoreError::Persistence)?;
            warn!(
                "event=store_backup module=store status=ok skipped={} backup_written={}",
                self.skipped.len(),
                backup.is_some()
            );
            self.backup_pending = false;
        }

        self.repo
            .save_tasks(&next, &self.formats)
            .map_err(StoreError::Persistence)?;

        self.tasks = next;
        self.next_id = next_id;
        Ok(())
    }
}

struct ValidatedFields {
    title: String,
    due_date: NaiveDate,
    priority: Priority,
}

fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn validate_priority(value: &str) -> Result<Priority, ValidationError> {
    Priority::parse(value).ok_or_else(|| ValidationError::InvalidPriority {
        value: value.to_string(),
    })
}

fn normalize_recurrence(is_recurring: bool, pattern: Option<&str>) -> Option<String> {
    if !is_recurring {
        return None;
    }
    pattern
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
