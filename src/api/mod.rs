//! HTTP API for the task planner.
//!
//! ## Endpoints
//!
//! - `POST /api/goals` - Decompose and store a new goal
//! - `GET /api/goals` - List goals with task counts
//! - `GET /api/goals/{id}` - Get a goal with its tasks
//! - `GET /api/goals/{id}/tasks/ready` - Tasks that are not blocked or done
//! - `PATCH /api/goals/tasks/{id}` - Update a task's status
//! - `DELETE /api/goals/{id}` - Delete a goal and its tasks
//! - `GET /api/health` - Health check

mod error;
mod goals;
mod routes;
pub mod types;

pub use error::{status_for, ApiError};
pub use routes::{router, serve, AppState};
pub use types::*;
