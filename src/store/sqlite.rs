//! SQLite-based goal store.

use super::{now_string, Goal, GoalStore, GoalSummary, StoreError};
use crate::task::{
    decode_dependencies, encode_dependencies, Priority, ScheduledTask, TaskRecord, TaskStatus,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    goal_text TEXT NOT NULL,
    reasoning TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_goals_created_at ON goals(created_at DESC);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    goal_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    estimated_days INTEGER NOT NULL CHECK (estimated_days >= 1),
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL CHECK (end_date >= start_date),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'in_progress', 'completed')),
    priority TEXT NOT NULL DEFAULT 'medium'
        CHECK (priority IN ('low', 'medium', 'high')),
    dependencies TEXT,
    task_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (goal_id) REFERENCES goals(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_goal ON tasks(goal_id, task_order, id);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
"#;

const TASK_COLUMNS: &str = "id, goal_id, title, description, estimated_days, start_date, end_date, \
     status, priority, dependencies, task_order, created_at, updated_at";

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::ReadOnly,
            ) => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

pub struct SqliteGoalStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGoalStore {
    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("Failed to create database dir: {}", e))
            })?;
        }

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            tracing::debug!("Opened goal database at {}", db_path.display());
            Ok::<_, StoreError>(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    let status: String = row.get(7)?;
    let priority: String = row.get(8)?;
    let dependencies: Option<String> = row.get(9)?;
    Ok(TaskRecord {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        estimated_days: row.get(4)?,
        start_date: parse_date(row, 5)?,
        end_date: parse_date(row, 6)?,
        status: TaskStatus::parse(&status).unwrap_or_default(),
        priority: Priority::from_str_lossy(&priority),
        dependencies: decode_dependencies(dependencies.as_deref()),
        task_order: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_goal(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        goal_text: row.get(1)?,
        reasoning: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn fetch_goal(conn: &Connection, id: i64) -> rusqlite::Result<Option<Goal>> {
    conn.query_row(
        "SELECT id, goal_text, reasoning, created_at, updated_at FROM goals WHERE id = ?1",
        params![id],
        row_to_goal,
    )
    .optional()
}

fn fetch_task(conn: &Connection, id: i64) -> rusqlite::Result<Option<TaskRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
        params![id],
        row_to_task,
    )
    .optional()
}

fn fetch_tasks(conn: &Connection, goal_id: i64) -> rusqlite::Result<Vec<TaskRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tasks WHERE goal_id = ?1 ORDER BY task_order ASC, id ASC",
        TASK_COLUMNS
    ))?;
    let tasks = stmt
        .query_map(params![goal_id], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

#[async_trait]
impl GoalStore for SqliteGoalStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let conn = conn.blocking_lock();
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await?
    }

    async fn insert_goal_with_tasks(
        &self,
        goal_text: &str,
        reasoning: &str,
        tasks: &[ScheduledTask],
    ) -> Result<(Goal, Vec<TaskRecord>), StoreError> {
        let conn = self.conn.clone();
        let goal_text = goal_text.to_string();
        let reasoning = reasoning.to_string();
        let tasks = tasks.to_vec();
        let now = now_string();

        tokio::task::spawn_blocking(move || -> Result<(Goal, Vec<TaskRecord>), StoreError> {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO goals (goal_text, reasoning, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![goal_text, reasoning, now],
            )?;
            let goal_id = tx.last_insert_rowid();

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO tasks (goal_id, title, description, estimated_days, start_date,
                                        end_date, status, priority, dependencies, task_order,
                                        created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                )?;
                for task in &tasks {
                    let draft = &task.draft;
                    stmt.execute(params![
                        goal_id,
                        draft.title,
                        draft.description,
                        draft.days(),
                        task.start_date.to_string(),
                        task.end_date.to_string(),
                        TaskStatus::Pending.as_str(),
                        draft.priority.as_str(),
                        encode_dependencies(&draft.dependencies),
                        draft.task_order,
                        now,
                    ])?;
                }
            }
            // Dropping `tx` on an early return above rolls everything back.
            tx.commit()?;

            let goal = fetch_goal(&conn, goal_id)?.ok_or_else(|| {
                StoreError::Backend(format!("Goal {} vanished after insert", goal_id))
            })?;
            let records = fetch_tasks(&conn, goal_id)?;
            Ok((goal, records))
        })
        .await?
    }

    async fn list_goals(&self) -> Result<Vec<GoalSummary>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<GoalSummary>, StoreError> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT g.id, g.goal_text, g.reasoning, g.created_at, g.updated_at,
                        COUNT(t.id),
                        COALESCE(SUM(CASE WHEN t.status = 'completed' THEN 1 ELSE 0 END), 0)
                 FROM goals g
                 LEFT JOIN tasks t ON t.goal_id = g.id
                 GROUP BY g.id
                 ORDER BY g.created_at DESC, g.id DESC",
            )?;
            let goals = stmt
                .query_map([], |row| {
                    let task_count: i64 = row.get(5)?;
                    let completed_tasks: i64 = row.get(6)?;
                    Ok(GoalSummary {
                        goal: row_to_goal(row)?,
                        task_count: task_count.max(0) as usize,
                        completed_tasks: completed_tasks.max(0) as usize,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(goals)
        })
        .await?
    }

    async fn get_goal(&self, id: i64) -> Result<Option<Goal>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Goal>, StoreError> {
            let conn = conn.blocking_lock();
            Ok(fetch_goal(&conn, id)?)
        })
        .await?
    }

    async fn list_tasks(&self, goal_id: i64) -> Result<Vec<TaskRecord>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<TaskRecord>, StoreError> {
            let conn = conn.blocking_lock();
            Ok(fetch_tasks(&conn, goal_id)?)
        })
        .await?
    }

    async fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<TaskRecord>, StoreError> {
            let conn = conn.blocking_lock();
            Ok(fetch_task(&conn, id)?)
        })
        .await?
    }

    async fn update_task_status(
        &self,
        id: i64,
        status: TaskStatus,
    ) -> Result<Option<TaskRecord>, StoreError> {
        let conn = self.conn.clone();
        let now = now_string();
        tokio::task::spawn_blocking(move || -> Result<Option<TaskRecord>, StoreError> {
            let mut conn = conn.blocking_lock();
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            tx.execute(
                "UPDATE goals SET updated_at = ?1
                 WHERE id = (SELECT goal_id FROM tasks WHERE id = ?2)",
                params![now, id],
            )?;
            tx.commit()?;
            Ok(fetch_task(&conn, id)?)
        })
        .await?
    }

    async fn delete_goal(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let conn = conn.blocking_lock();
            let deleted = conn.execute("DELETE FROM goals WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{exercise_store, sample_tasks};
    use super::*;

    async fn open_temp() -> (tempfile::TempDir, SqliteGoalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteGoalStore::open(dir.path().join("nested").join("goals.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn shared_store_behaviour() {
        let (_dir, store) = open_temp().await;
        assert!(store.is_persistent());
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn failed_task_insert_rolls_back_goal() {
        let (_dir, store) = open_temp().await;
        let mut tasks = sample_tasks();
        // Violates CHECK (end_date >= start_date) on the last row.
        let last = tasks.last_mut().unwrap();
        last.end_date = last.start_date.pred_opt().unwrap();

        let result = store
            .insert_goal_with_tasks("Doomed goal", "", &tasks)
            .await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(store.list_goals().await.unwrap().is_empty());

        let conn = store.conn.lock().await;
        let task_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(task_rows, 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_task_rows() {
        let (_dir, store) = open_temp().await;
        let (goal, _) = store
            .insert_goal_with_tasks("Learn Rust", "", &sample_tasks())
            .await
            .unwrap();
        assert!(store.delete_goal(goal.id).await.unwrap());

        let conn = store.conn.lock().await;
        let task_rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tasks WHERE goal_id = ?1",
                params![goal.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(task_rows, 0);
    }

    #[tokio::test]
    async fn status_update_touches_goal() {
        let (_dir, store) = open_temp().await;
        let (goal, tasks) = store
            .insert_goal_with_tasks("Learn Rust", "", &sample_tasks())
            .await
            .unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "UPDATE goals SET updated_at = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                params![goal.id],
            )
            .unwrap();
        }

        let task = store
            .update_task_status(tasks[1].id, TaskStatus::InProgress)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        let goal = store.get_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(goal.updated_at, task.updated_at);
    }

    #[tokio::test]
    async fn malformed_stored_dependencies_read_as_empty() {
        let (_dir, store) = open_temp().await;
        let (_, tasks) = store
            .insert_goal_with_tasks("Learn Rust", "", &sample_tasks())
            .await
            .unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "UPDATE tasks SET dependencies = 'not json' WHERE id = ?1",
                params![tasks[2].id],
            )
            .unwrap();
            conn.execute(
                "UPDATE tasks SET dependencies = NULL WHERE id = ?1",
                params![tasks[1].id],
            )
            .unwrap();
        }

        let reread = store.list_tasks(tasks[0].goal_id).await.unwrap();
        assert!(reread[1].dependencies.is_empty());
        assert!(reread[2].dependencies.is_empty());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goals.db");
        let goal_id = {
            let store = SqliteGoalStore::open(path.clone()).await.unwrap();
            let (goal, _) = store
                .insert_goal_with_tasks("Learn Rust", "because", &sample_tasks())
                .await
                .unwrap();
            goal.id
        };

        let store = SqliteGoalStore::open(path).await.unwrap();
        let goal = store.get_goal(goal_id).await.unwrap().unwrap();
        assert_eq!(goal.reasoning.as_deref(), Some("because"));
        assert_eq!(store.list_tasks(goal_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unopenable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let result = SqliteGoalStore::open(dir.path().to_path_buf()).await;
        assert!(result.is_err());
    }
}
