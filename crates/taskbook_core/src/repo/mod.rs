//! Repository layer for task persistence.
//!
//! # Responsibility
//! - Define the whole-set load/save contract used by the task store.
//! - Isolate file format and file-system details from store orchestration.
//!
//! # Invariants
//! - Repositories never print; every failure is returned as `RepoError`.
//! - Malformed individual records are reported per record, not as a failed load.

pub mod task_repo;
