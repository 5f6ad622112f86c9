//! Task domain model and persisted record.
//!
//! # Responsibility
//! - Define the canonical `Task` value handed out by the store.
//! - Convert losslessly between `Task` and its persisted `TaskRecord`.
//! - Define caller-input validation errors shared by store operations.
//!
//! # Invariants
//! - `id` is never 0 and never reused for another task.
//! - `title` is never empty after trimming.
//! - `recurrence_pattern` is only kept when `is_recurring` is true.
//! - External code cannot mutate a `Task`; only the store builds or replaces one.

use crate::model::format::TaskFormats;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable integer identifier, assigned by the store starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw identifier. Returns `None` for 0, which is never assigned.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The following id, or `None` once `u64::MAX` has been handed out.
    pub(crate) fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    pub(crate) fn first() -> Self {
        Self(1)
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task importance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parses a caller-supplied label (`low|medium|high`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Task lifecycle flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Every task starts here.
    #[default]
    NotDone,
    Done,
}

/// One to-do item.
///
/// Fields are readable through getters only; the store is the single writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) due_date: NaiveDate,
    pub(crate) priority: Priority,
    pub(crate) status: TaskStatus,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) last_updated_at: NaiveDateTime,
    pub(crate) is_recurring: bool,
    pub(crate) recurrence_pattern: Option<String>,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn last_updated_at(&self) -> NaiveDateTime {
        self.last_updated_at
    }

    pub fn is_recurring(&self) -> bool {
        self.is_recurring
    }

    /// Opaque recurrence note. Always `None` for non-recurring tasks.
    pub fn recurrence_pattern(&self) -> Option<&str> {
        self.recurrence_pattern.as_deref()
    }

    /// Returns the `(title, due_date)` pair used for duplicate detection.
    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey::new(&self.title, self.due_date)
    }

    /// Converts this task into its persisted form.
    pub fn to_record(&self, formats: &TaskFormats) -> TaskRecord {
        TaskRecord {
            id: self.id.get(),
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: formats.format_date(self.due_date),
            priority: self.priority,
            status: self.status,
            created_at: formats.format_timestamp(self.created_at),
            last_updated_at: formats.format_timestamp(self.last_updated_at),
            is_recurring: self.is_recurring,
            recurrence_pattern: self.recurrence_pattern.clone(),
        }
    }

    /// Rebuilds a task from its persisted form.
    ///
    /// # Errors
    /// - `InvalidId` when `id` is 0.
    /// - `EmptyTitle` when the stored title is blank.
    /// - `InvalidDate`/`InvalidTimestamp` when text does not match `formats`.
    pub fn from_record(
        record: TaskRecord,
        formats: &TaskFormats,
    ) -> Result<Self, MalformedRecordError> {
        let id = TaskId::new(record.id).ok_or(MalformedRecordError::InvalidId(record.id))?;
        if record.title.trim().is_empty() {
            return Err(MalformedRecordError::EmptyTitle { id: record.id });
        }

        let due_date = formats.parse_date(&record.due_date).ok_or_else(|| {
            MalformedRecordError::InvalidDate {
                field: "due_date",
                value: record.due_date.clone(),
            }
        })?;
        let created_at = parse_timestamp_field(formats, "created_at", &record.created_at)?;
        let last_updated_at =
            parse_timestamp_field(formats, "last_updated_at", &record.last_updated_at)?;

        let recurrence_pattern = if record.is_recurring {
            record.recurrence_pattern
        } else {
            None
        };

        Ok(Self {
            id,
            title: record.title,
            description: record.description,
            due_date,
            priority: record.priority,
            status: record.status,
            created_at,
            last_updated_at,
            is_recurring: record.is_recurring,
            recurrence_pattern,
        })
    }
}

fn parse_timestamp_field(
    formats: &TaskFormats,
    field: &'static str,
    value: &str,
) -> Result<NaiveDateTime, MalformedRecordError> {
    formats
        .parse_timestamp(value)
        .ok_or_else(|| MalformedRecordError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Case-insensitive `(title, due_date)` identity used to reject duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    title: String,
    due_date: NaiveDate,
}

impl DuplicateKey {
    pub fn new(title: &str, due_date: NaiveDate) -> Self {
        Self {
            title: title.trim().to_lowercase(),
            due_date,
        }
    }
}

/// Persisted form of one task.
///
/// Serialized field names are the on-disk schema. Missing `status`,
/// `description` and recurrence fields fall back to defaults; every other
/// field is required, `priority` included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: String,
    pub last_updated_at: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<String>,
}

/// One persisted record that cannot be turned back into a `Task`.
#[derive(Debug)]
pub enum MalformedRecordError {
    /// Missing required field or wrong value shape.
    Decode(serde_json::Error),
    InvalidId(u64),
    EmptyTitle {
        id: u64,
    },
    InvalidDate {
        field: &'static str,
        value: String,
    },
    InvalidTimestamp {
        field: &'static str,
        value: String,
    },
    /// Well-formed, but reuses an id already taken by an earlier record.
    DuplicateId(TaskId),
    /// Well-formed, but repeats the title and due date of an earlier record.
    DuplicateTask {
        id: TaskId,
    },
}

impl MalformedRecordError {
    /// Stable code for log lines; never includes record content.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_failed",
            Self::InvalidId(_) => "invalid_id",
            Self::EmptyTitle { .. } => "empty_title",
            Self::InvalidDate { .. } => "invalid_date",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::DuplicateId(_) => "duplicate_id",
            Self::DuplicateTask { .. } => "duplicate_task",
        }
    }
}

impl Display for MalformedRecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "malformed task record: {err}"),
            Self::InvalidId(id) => write!(f, "invalid task id `{id}`"),
            Self::EmptyTitle { id } => write!(f, "task {id} has an empty title"),
            Self::InvalidDate { field, value } => {
                write!(f, "invalid date `{value}` in field `{field}`")
            }
            Self::InvalidTimestamp { field, value } => {
                write!(f, "invalid timestamp `{value}` in field `{field}`")
            }
            Self::DuplicateId(id) => write!(f, "task id {id} is already taken"),
            Self::DuplicateTask { id } => {
                write!(f, "task {id} duplicates the title and due date of another task")
            }
        }
    }
}

impl Error for MalformedRecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MalformedRecordError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

/// Rejected caller input. Raised before any state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    MissingDueDate,
    MalformedDueDate {
        value: String,
        expected_format: String,
    },
    InvalidPriority {
        value: String,
    },
    DuplicateTask {
        title: String,
        due_date: NaiveDate,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::MissingDueDate => write!(f, "due date must not be empty"),
            Self::MalformedDueDate {
                value,
                expected_format,
            } => write!(
                f,
                "malformed due date `{value}`; expected format `{expected_format}`"
            ),
            Self::InvalidPriority { value } => {
                write!(f, "invalid priority `{value}`; expected low|medium|high")
            }
            Self::DuplicateTask { title, due_date } => {
                write!(f, "task `{title}` already exists for due date {due_date}")
            }
        }
    }
}

impl ValidationError {
    /// Stable code for log lines; never includes caller input.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "empty_title",
            Self::MissingDueDate => "missing_due_date",
            Self::MalformedDueDate { .. } => "malformed_due_date",
            Self::InvalidPriority { .. } => "invalid_priority",
            Self::DuplicateTask { .. } => "duplicate_task",
        }
    }
}

impl Error for ValidationError {}
