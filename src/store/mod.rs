//! Goal storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database with cascading goal -> task deletes
//!
//! A goal and its tasks are only ever written together, in one atomic unit;
//! afterwards only task status (and the `updated_at` stamps) change.

mod memory;
mod sqlite;

pub use memory::InMemoryGoalStore;
pub use sqlite::SqliteGoalStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::{ScheduledTask, TaskRecord, TaskStatus};

/// A user goal as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub goal_text: String,
    /// Provider's explanation of the breakdown
    pub reasoning: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A goal with aggregated task counts (not stored, computed on read).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalSummary {
    #[serde(flatten)]
    pub goal: Goal,
    pub task_count: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing database cannot be reached or opened.
    #[error("Goal store unavailable: {0}")]
    Unavailable(String),

    #[error("Goal store error: {0}")]
    Backend(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Backend(format!("Task join error: {}", e))
    }
}

/// Current timestamp as a fixed-width RFC 3339 string (sorts lexicographically).
pub fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Goal store trait - implemented by all storage backends.
#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a goal and all of its tasks atomically.
    ///
    /// Either every row is written or none is.
    async fn insert_goal_with_tasks(
        &self,
        goal_text: &str,
        reasoning: &str,
        tasks: &[ScheduledTask],
    ) -> Result<(Goal, Vec<TaskRecord>), StoreError>;

    /// List goals with task counts, newest first.
    async fn list_goals(&self) -> Result<Vec<GoalSummary>, StoreError>;

    /// Get a single goal by ID.
    async fn get_goal(&self, id: i64) -> Result<Option<Goal>, StoreError>;

    /// Tasks of a goal ordered by `task_order`, then `id`.
    async fn list_tasks(&self, goal_id: i64) -> Result<Vec<TaskRecord>, StoreError>;

    /// Get a single task by ID.
    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, StoreError>;

    /// Set a task's status. Returns `None` if no such task exists.
    async fn update_task_status(
        &self,
        id: i64,
        status: TaskStatus,
    ) -> Result<Option<TaskRecord>, StoreError>;

    /// Delete a goal and, by cascade, its tasks. Returns whether a goal was removed.
    async fn delete_goal(&self, id: i64) -> Result<bool, StoreError>;
}

/// Goal store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl GoalStoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a goal store based on type and configuration.
pub async fn create_goal_store(
    store_type: GoalStoreType,
    database_path: PathBuf,
) -> Result<Arc<dyn GoalStore>, StoreError> {
    match store_type {
        GoalStoreType::Memory => Ok(Arc::new(InMemoryGoalStore::new())),
        GoalStoreType::Sqlite => {
            let store = SqliteGoalStore::open(database_path).await?;
            Ok(Arc::new(store))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_type_parses_env_values() {
        assert_eq!(GoalStoreType::from_str("memory"), GoalStoreType::Memory);
        assert_eq!(GoalStoreType::from_str("SQLite"), GoalStoreType::Sqlite);
        assert_eq!(GoalStoreType::from_str("postgres"), GoalStoreType::Sqlite);
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let a = now_string();
        assert!(a.ends_with('Z'));
        assert_eq!(a.len(), "2025-01-01T00:00:00.000Z".len());
    }

    #[tokio::test]
    async fn memory_backend_from_factory() {
        let store = create_goal_store(GoalStoreType::Memory, PathBuf::new())
            .await
            .unwrap();
        assert!(!store.is_persistent());
        test_support::exercise_store(store.as_ref()).await;
    }
}
