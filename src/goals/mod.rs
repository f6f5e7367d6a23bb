//! Goal orchestration.
//!
//! `GoalService` drives goal creation (validate, decompose, schedule, insert)
//! and exposes read, status update and delete operations over stored goals.
//! The store and the decomposer are both optional: a missing store puts the
//! service in limited mode, a missing decomposer only disables creation.
//!
//! Creation never holds a store transaction across the provider call. The
//! goal and its tasks are written in a single `insert_goal_with_tasks` once
//! the schedule is known, so any earlier failure leaves nothing behind.

mod error;

pub use error::GoalError;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::ai_providers::ProviderSelection;
use crate::config::Config;
use crate::decompose::{Decomposer, LlmDecomposer};
use crate::llm::OpenAiCompatibleClient;
use crate::store::{create_goal_store, Goal, GoalStore, GoalSummary};
use crate::task::{
    blocking_dependencies, duplicate_titles, schedule, DuplicateTitles, TaskRecord, TaskStatus,
};

/// Accepted goal text length (in characters, after trimming).
pub const GOAL_TEXT_MIN_CHARS: usize = 10;
pub const GOAL_TEXT_MAX_CHARS: usize = 1000;

/// Trim and length-check goal text.
pub fn validate_goal_text(raw: &str) -> Result<String, GoalError> {
    let text = raw.trim();
    let chars = text.chars().count();
    if chars < GOAL_TEXT_MIN_CHARS {
        return Err(GoalError::Validation(format!(
            "Goal must be at least {} characters long",
            GOAL_TEXT_MIN_CHARS
        )));
    }
    if chars > GOAL_TEXT_MAX_CHARS {
        return Err(GoalError::Validation(format!(
            "Goal must be at most {} characters",
            GOAL_TEXT_MAX_CHARS
        )));
    }
    Ok(text.to_string())
}

/// A task as presented to clients, with its gate state.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: TaskRecord,
    /// Some dependency that exists in the goal is not completed yet.
    pub blocked: bool,
}

/// A goal with its tasks and progress.
#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub tasks: Vec<TaskView>,
    pub task_count: usize,
    pub completed_tasks: usize,
    /// Completed share in whole percent.
    pub progress: u8,
}

impl GoalView {
    pub fn new(goal: Goal, tasks: Vec<TaskRecord>) -> Self {
        let completed_tasks = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let task_count = tasks.len();
        let views = tasks
            .iter()
            .map(|task| TaskView {
                task: task.clone(),
                blocked: !blocking_dependencies(task, &tasks).is_empty(),
            })
            .collect();
        Self {
            goal,
            tasks: views,
            task_count,
            completed_tasks,
            progress: progress_percent(completed_tasks, task_count),
        }
    }
}

fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

pub struct GoalService {
    store: Option<Arc<dyn GoalStore>>,
    decomposer: Option<Arc<dyn Decomposer>>,
    unconfigured_reason: String,
    duplicate_titles: DuplicateTitles,
    enforce_dependency_gate: bool,
}

impl GoalService {
    pub fn new(
        store: Option<Arc<dyn GoalStore>>,
        decomposer: Option<Arc<dyn Decomposer>>,
    ) -> Self {
        Self {
            store,
            decomposer,
            unconfigured_reason: "AI provider is not configured".to_string(),
            duplicate_titles: DuplicateTitles::default(),
            enforce_dependency_gate: false,
        }
    }

    pub fn with_unconfigured_reason(mut self, reason: impl Into<String>) -> Self {
        self.unconfigured_reason = reason.into();
        self
    }

    pub fn with_duplicate_titles(mut self, policy: DuplicateTitles) -> Self {
        self.duplicate_titles = policy;
        self
    }

    pub fn with_dependency_gate(mut self, enforce: bool) -> Self {
        self.enforce_dependency_gate = enforce;
        self
    }

    /// Open the configured store and build the provider client.
    ///
    /// A store that fails to open is logged and the service runs without one.
    pub async fn from_config(config: &Config) -> Self {
        let store = match create_goal_store(config.store_type, config.database_path.clone()).await
        {
            Ok(store) => {
                tracing::info!(
                    persistent = store.is_persistent(),
                    "Goal store ready ({:?})",
                    config.store_type
                );
                Some(store)
            }
            Err(e) => {
                tracing::warn!("Failed to open goal store, running in limited mode: {}", e);
                None
            }
        };

        let (decomposer, unconfigured_reason) = match &config.provider {
            ProviderSelection::Configured(provider) => {
                let client = Arc::new(OpenAiCompatibleClient::for_provider(provider));
                let decomposer: Arc<dyn Decomposer> = Arc::new(LlmDecomposer::new(
                    client,
                    provider.model.clone(),
                    config.decompose_timeout,
                    provider.describe(),
                ));
                (Some(decomposer), None)
            }
            ProviderSelection::Unconfigured { reason } => (None, Some(reason.clone())),
        };

        let mut service = Self::new(store, decomposer)
            .with_duplicate_titles(config.duplicate_titles)
            .with_dependency_gate(config.enforce_dependency_gate);
        if let Some(reason) = unconfigured_reason {
            service = service.with_unconfigured_reason(reason);
        }
        service
    }

    fn store(&self) -> Result<&Arc<dyn GoalStore>, GoalError> {
        self.store.as_ref().ok_or_else(|| {
            GoalError::StoreUnavailable("the goal store could not be opened at startup".to_string())
        })
    }

    /// Whether a store is open and answering.
    pub async fn store_connected(&self) -> bool {
        match &self.store {
            Some(store) => store.ping().await.is_ok(),
            None => false,
        }
    }

    pub fn provider_description(&self) -> Option<String> {
        self.decomposer.as_ref().map(|d| d.describe())
    }

    /// Create a goal, scheduling its tasks from today.
    pub async fn create_goal(&self, goal_text: &str) -> Result<GoalView, GoalError> {
        self.create_goal_on(goal_text, Local::now().date_naive()).await
    }

    /// Create a goal, scheduling its tasks from `today`.
    pub async fn create_goal_on(
        &self,
        goal_text: &str,
        today: NaiveDate,
    ) -> Result<GoalView, GoalError> {
        let goal_text = validate_goal_text(goal_text)?;
        let store = self.store()?;
        store.ping().await?;
        let decomposer = self
            .decomposer
            .as_ref()
            .ok_or_else(|| GoalError::ProviderUnconfigured(self.unconfigured_reason.clone()))?;

        let decomposition = decomposer.decompose(&goal_text).await.map_err(|e| {
            tracing::warn!("Goal decomposition failed: {}", e);
            GoalError::from(e)
        })?;

        let duplicates = duplicate_titles(&decomposition.tasks);
        if !duplicates.is_empty() {
            match self.duplicate_titles {
                DuplicateTitles::Reject => {
                    return Err(GoalError::Validation(format!(
                        "Task breakdown repeats task titles: {}",
                        duplicates.join(", ")
                    )));
                }
                DuplicateTitles::LastWins => {
                    tracing::warn!(
                        "Task breakdown repeats titles {:?}; dependencies resolve to the last one",
                        duplicates
                    );
                }
            }
        }

        let scheduled = schedule(decomposition.tasks, today)?;
        let (goal, tasks) = store
            .insert_goal_with_tasks(&goal_text, &decomposition.reasoning, &scheduled)
            .await?;
        tracing::info!(goal_id = goal.id, tasks = tasks.len(), "Created goal");
        Ok(GoalView::new(goal, tasks))
    }

    /// All goals with task counts, newest first.
    pub async fn list_goals(&self) -> Result<Vec<GoalSummary>, GoalError> {
        Ok(self.store()?.list_goals().await?)
    }

    pub async fn get_goal(&self, id: i64) -> Result<Option<GoalView>, GoalError> {
        let store = self.store()?;
        let Some(goal) = store.get_goal(id).await? else {
            return Ok(None);
        };
        let tasks = store.list_tasks(id).await?;
        Ok(Some(GoalView::new(goal, tasks)))
    }

    /// Tasks of a goal that are neither completed nor blocked, in task order.
    pub async fn ready_tasks(&self, goal_id: i64) -> Result<Option<Vec<TaskRecord>>, GoalError> {
        let store = self.store()?;
        if store.get_goal(goal_id).await?.is_none() {
            return Ok(None);
        }
        let tasks = store.list_tasks(goal_id).await?;
        let ready = tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Completed)
            .filter(|t| blocking_dependencies(*t, &tasks).is_empty())
            .cloned()
            .collect();
        Ok(Some(ready))
    }

    /// Set a task's status. `Ok(None)` if no such task exists.
    ///
    /// With the dependency gate enforced, a blocked task may only move to
    /// `pending`.
    pub async fn update_task_status(
        &self,
        task_id: i64,
        status: &str,
    ) -> Result<Option<TaskRecord>, GoalError> {
        let status = TaskStatus::parse(status.trim()).ok_or_else(|| {
            GoalError::Validation(
                "Invalid status. Must be one of: pending, in_progress, completed".to_string(),
            )
        })?;
        let store = self.store()?;

        if self.enforce_dependency_gate && status.is_forward() {
            let Some(task) = store.get_task(task_id).await? else {
                return Ok(None);
            };
            let siblings = store.list_tasks(task.goal_id).await?;
            let blocking = blocking_dependencies(&task, &siblings);
            if !blocking.is_empty() {
                tracing::debug!(task_id, ?blocking, "Rejected status change on blocked task");
                return Err(GoalError::DependencyBlocked {
                    task: task.title.clone(),
                    blocking: blocking.into_iter().map(str::to_string).collect(),
                });
            }
        }

        let updated = store.update_task_status(task_id, status).await?;
        if let Some(task) = &updated {
            tracing::debug!(task_id, status = %task.status, "Updated task status");
        }
        Ok(updated)
    }

    /// Delete a goal and its tasks. `Ok(false)` if there was no such goal.
    pub async fn delete_goal(&self, id: i64) -> Result<bool, GoalError> {
        let deleted = self.store()?.delete_goal(id).await?;
        if deleted {
            tracing::info!(goal_id = id, "Deleted goal");
        }
        Ok(deleted)
    }
}
