//! API request/response types.

use serde::{Deserialize, Serialize};

/// Request to create a new goal.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGoalRequest {
    /// Free-text goal (10 to 1000 characters after trimming)
    #[serde(default)]
    pub goal_text: Option<String>,
}

/// Request to change a task's status.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskStatusRequest {
    /// One of `pending`, `in_progress`, `completed`
    #[serde(default)]
    pub status: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    pub message: String,

    /// Service version
    pub version: String,

    /// `connected` or `unavailable`
    pub store: String,

    /// Decomposition provider and model, if one is configured
    pub provider: Option<String>,
}

/// Plain confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Machine-readable failure class
    pub kind: String,
}
