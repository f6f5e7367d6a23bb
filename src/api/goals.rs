//! API endpoints for goals and their tasks.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};

use crate::goals::{GoalError, GoalView};
use crate::store::GoalSummary;
use crate::task::TaskRecord;

use super::error::ApiError;
use super::routes::AppState;
use super::types::{CreateGoalRequest, MessageResponse, UpdateTaskStatusRequest};

/// Create the goal API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/tasks/:id", patch(update_task_status))
        .route("/:id", get(get_goal).delete(delete_goal))
        .route("/:id/tasks/ready", get(ready_tasks))
}

/// POST /api/goals
/// Decompose a goal into scheduled tasks and store it.
async fn create_goal(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateGoalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GoalView>), ApiError> {
    let Json(req) = payload?;
    let goal_text = req
        .goal_text
        .ok_or_else(|| GoalError::Validation("Goal text is required".to_string()))?;
    let goal = state.goals.create_goal(&goal_text).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// GET /api/goals
async fn list_goals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GoalSummary>>, ApiError> {
    Ok(Json(state.goals.list_goals().await?))
}

/// GET /api/goals/:id
async fn get_goal(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<GoalView>, ApiError> {
    let Path(id) = id?;
    state
        .goals
        .get_goal(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Goal not found"))
}

/// GET /api/goals/:id/tasks/ready
/// Tasks that can be worked on now.
async fn ready_tasks(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    let Path(id) = id?;
    state
        .goals
        .ready_tasks(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Goal not found"))
}

/// PATCH /api/goals/tasks/:id
async fn update_task_status(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTaskStatusRequest>, JsonRejection>,
) -> Result<Json<TaskRecord>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let status = req.status.unwrap_or_default();
    state
        .goals
        .update_task_status(id, &status)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// DELETE /api/goals/:id
async fn delete_goal(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    if state.goals.delete_goal(id).await? {
        Ok(Json(MessageResponse {
            message: "Goal deleted successfully".to_string(),
        }))
    } else {
        Err(ApiError::not_found("Goal not found"))
    }
}
