//! Tideline: a terminal task manager with recurring task expansion.

pub mod analytics;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod storage;
pub mod tui;

pub use config::Config;
pub use error::{Result, TaskError};
pub use models::{Priority, RecurrenceSettings, Task, TaskDraft, TaskFilter};
pub use recurrence::{expand, Expansion, ExpansionLimits};
