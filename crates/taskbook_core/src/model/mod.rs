//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its persisted form.
//! - Own the fixed textual formats used for dates and timestamps.
//!
//! # Invariants
//! - Every task is identified by a stable, never reused `TaskId`.
//! - Conversions between `Task` and `TaskRecord` are lossless.

pub mod format;
pub mod task;
