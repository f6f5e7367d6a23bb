//! Task descriptors as produced by decomposition, and tasks as persisted.
//!
//! # Invariants
//! - A `ScheduledTask` satisfies `end_date - start_date + 1 == days()`
//! - `TaskDraft::days()` is always `>= 1`

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Relative importance assigned by the decomposition provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Parse a provider-supplied priority. Unrecognised values become `Medium`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Progress of a task.
///
/// Any transition between the three states is allowed; whether a task may
/// move forward while its dependencies are unfinished is decided by the
/// dependency gate, not by this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Parse the wire form. Returns `None` for anything outside the three states.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Whether moving into this status counts as starting or progressing the task.
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unscheduled task from a decomposition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    /// Estimated duration in whole days. Values below 1 are treated as 1.
    pub estimated_days: i64,
    pub priority: Priority,
    /// Titles of tasks this one waits for, in provider order.
    pub dependencies: Vec<String>,
    /// Provider sequencing hint; not guaranteed to be a topological order.
    pub task_order: i64,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, estimated_days: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            estimated_days,
            priority: Priority::default(),
            dependencies: Vec::new(),
            task_order: 0,
        }
    }

    pub fn with_dependencies<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(titles.into_iter().map(Into::into));
        self
    }

    pub fn with_order(mut self, task_order: i64) -> Self {
        self.task_order = task_order;
        self
    }

    /// Normalized duration in days (always `>= 1`).
    pub fn days(&self) -> i64 {
        self.estimated_days.max(1)
    }
}

/// A draft with its computed calendar window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTask {
    #[serde(flatten)]
    pub draft: TaskDraft,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A task as stored for a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub goal_id: i64,
    pub title: String,
    pub description: String,
    pub estimated_days: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TaskStatus,
    pub priority: Priority,
    pub dependencies: Vec<String>,
    pub task_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// How to treat two drafts in one decomposition that share a title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateTitles {
    /// Title lookups resolve to the last draft carrying the title.
    #[default]
    LastWins,
    /// Refuse the whole decomposition.
    Reject,
}

impl DuplicateTitles {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "reject" => Self::Reject,
            _ => Self::LastWins,
        }
    }
}

/// Titles that appear more than once, in order of first repetition.
pub fn duplicate_titles(drafts: &[TaskDraft]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for draft in drafts {
        let count = seen.entry(draft.title.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(draft.title.clone());
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_are_clamped_to_one() {
        assert_eq!(TaskDraft::new("a", 0).days(), 1);
        assert_eq!(TaskDraft::new("a", -4).days(), 1);
        assert_eq!(TaskDraft::new("a", 3).days(), 3);
    }

    #[test]
    fn status_parse_accepts_only_known_values() {
        assert_eq!(TaskStatus::parse("pending"), Some(TaskStatus::Pending));
        assert_eq!(TaskStatus::parse("in_progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("completed"), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::parse("done"), None);
        assert_eq!(TaskStatus::parse("Completed"), None);
    }

    #[test]
    fn priority_falls_back_to_medium() {
        assert_eq!(Priority::from_str_lossy("HIGH"), Priority::High);
        assert_eq!(Priority::from_str_lossy(" low "), Priority::Low);
        assert_eq!(Priority::from_str_lossy("urgent"), Priority::Medium);
    }

    #[test]
    fn duplicate_titles_reported_once() {
        let drafts = vec![
            TaskDraft::new("Design", 1),
            TaskDraft::new("Build", 1),
            TaskDraft::new("Design", 2),
            TaskDraft::new("Design", 3),
        ];
        assert_eq!(duplicate_titles(&drafts), vec!["Design".to_string()]);
        assert!(duplicate_titles(&drafts[..2]).is_empty());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
