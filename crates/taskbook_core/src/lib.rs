//! Core domain logic for Taskbook.
//! This crate is the single source of truth for task invariants.

pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::format::{
    InvalidFormatError, TaskFormats, DEFAULT_DATE_FORMAT, DEFAULT_TIMESTAMP_FORMAT,
};
pub use model::task::{
    DuplicateKey, MalformedRecordError, Priority, Task, TaskId, TaskRecord, TaskStatus,
    ValidationError,
};
pub use repo::task_repo::{
    JsonFileTaskRepository, RecordOutcome, RepoError, RepoResult, TaskRepository,
};
pub use service::task_store::{
    Clock, NewTask, SkippedRecord, StoreConfig, StoreError, StoreResult, TaskStore, TaskUpdate,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
