//! Core task abstractions: tasks, dependent tasks, the shared context and
//! launch identifiers.

pub mod context;
pub mod task;
pub mod types;
