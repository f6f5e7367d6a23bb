//! In-memory goal store (non-persistent).

use super::{now_string, Goal, GoalStore, GoalSummary, StoreError};
use crate::task::{ScheduledTask, TaskRecord, TaskStatus};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    next_goal_id: i64,
    next_task_id: i64,
    goals: BTreeMap<i64, Goal>,
    tasks: BTreeMap<i64, TaskRecord>,
}

impl MemoryState {
    fn tasks_of(&self, goal_id: i64) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self
            .tasks
            .values()
            .filter(|t| t.goal_id == goal_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.task_order, t.id));
        tasks
    }
}

/// One lock over goals and tasks, so a goal and its tasks appear together.
#[derive(Clone, Default)]
pub struct InMemoryGoalStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryGoalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GoalStore for InMemoryGoalStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_goal_with_tasks(
        &self,
        goal_text: &str,
        reasoning: &str,
        tasks: &[ScheduledTask],
    ) -> Result<(Goal, Vec<TaskRecord>), StoreError> {
        let now = now_string();
        let mut state = self.state.write().await;

        state.next_goal_id += 1;
        let goal = Goal {
            id: state.next_goal_id,
            goal_text: goal_text.to_string(),
            reasoning: Some(reasoning.to_string()),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        state.goals.insert(goal.id, goal.clone());

        for task in tasks {
            state.next_task_id += 1;
            let draft = &task.draft;
            let record = TaskRecord {
                id: state.next_task_id,
                goal_id: goal.id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                estimated_days: draft.days(),
                start_date: task.start_date,
                end_date: task.end_date,
                status: TaskStatus::Pending,
                priority: draft.priority,
                dependencies: draft.dependencies.clone(),
                task_order: draft.task_order,
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            state.tasks.insert(record.id, record);
        }

        let records = state.tasks_of(goal.id);
        Ok((goal, records))
    }

    async fn list_goals(&self) -> Result<Vec<GoalSummary>, StoreError> {
        let state = self.state.read().await;
        let mut goals: Vec<GoalSummary> = state
            .goals
            .values()
            .map(|goal| {
                let tasks = state.tasks.values().filter(|t| t.goal_id == goal.id);
                let (task_count, completed_tasks) =
                    tasks.fold((0, 0), |(total, done), t| {
                        (total + 1, done + usize::from(t.status == TaskStatus::Completed))
                    });
                GoalSummary {
                    goal: goal.clone(),
                    task_count,
                    completed_tasks,
                }
            })
            .collect();
        goals.sort_by(|a, b| {
            b.goal
                .created_at
                .cmp(&a.goal.created_at)
                .then(b.goal.id.cmp(&a.goal.id))
        });
        Ok(goals)
    }

    async fn get_goal(&self, id: i64) -> Result<Option<Goal>, StoreError> {
        Ok(self.state.read().await.goals.get(&id).cloned())
    }

    async fn list_tasks(&self, goal_id: i64) -> Result<Vec<TaskRecord>, StoreError> {
        Ok(self.state.read().await.tasks_of(goal_id))
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn update_task_status(
        &self,
        id: i64,
        status: TaskStatus,
    ) -> Result<Option<TaskRecord>, StoreError> {
        let now = now_string();
        let mut state = self.state.write().await;
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        task.status = status;
        task.updated_at = now.clone();
        let task = task.clone();
        if let Some(goal) = state.goals.get_mut(&task.goal_id) {
            goal.updated_at = now;
        }
        Ok(Some(task))
    }

    async fn delete_goal(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.goals.remove(&id).is_none() {
            return Ok(false);
        }
        state.tasks.retain(|_, t| t.goal_id != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{exercise_store, sample_tasks};
    use super::*;

    #[tokio::test]
    async fn shared_store_behaviour() {
        exercise_store(&InMemoryGoalStore::new()).await;
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryGoalStore::new();
        let (first, first_tasks) = store
            .insert_goal_with_tasks("One", "", &sample_tasks())
            .await
            .unwrap();
        store.delete_goal(first.id).await.unwrap();
        let (second, second_tasks) = store
            .insert_goal_with_tasks("Two", "", &sample_tasks())
            .await
            .unwrap();
        assert!(second.id > first.id);
        assert!(second_tasks[0].id > first_tasks[2].id);
    }

    #[tokio::test]
    async fn goal_without_tasks_is_listed_with_zero_counts() {
        let store = InMemoryGoalStore::new();
        store.insert_goal_with_tasks("Empty", "", &[]).await.unwrap();
        let goals = store.list_goals().await.unwrap();
        assert_eq!(goals[0].task_count, 0);
        assert_eq!(goals[0].completed_tasks, 0);
    }
}
