//! Task module - task descriptors, date scheduling, and dependency gating.
//!
//! Tasks reference each other by title rather than by identifier, because
//! that is the only key the decomposition provider can produce. Everything in
//! this module is pure: no IO, no clock access (callers pass "today").
//!
//! - `task`: descriptor and record types
//! - `schedule`: dependency-aware start/end date assignment
//! - `gate`: whether a task's dependencies allow it to progress
//! - `dependencies`: stored form of a dependency list

mod dependencies;
mod gate;
mod schedule;
pub mod task;

pub use dependencies::{decode_dependencies, encode_dependencies};
pub use gate::{blocking_dependencies, is_eligible, DependencyView};
pub use schedule::{schedule, ScheduleError};
pub use task::{
    duplicate_titles, DuplicateTitles, Priority, ScheduledTask, TaskDraft, TaskRecord, TaskStatus,
};
