//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into task-level operations.
//! - Keep front-end callers decoupled from storage details.

pub mod task_store;
