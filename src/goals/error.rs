//! Goal orchestration errors.

use std::time::Duration;

use thiserror::Error;

use crate::decompose::DecomposeError;
use crate::llm::{LlmError, LlmErrorKind};
use crate::store::StoreError;
use crate::task::ScheduleError;

/// Every way a goal operation can fail.
///
/// "Not found" is not an error: lookups return `Option`.
#[derive(Debug, Error)]
pub enum GoalError {
    /// Bad input from the caller.
    #[error("{0}")]
    Validation(String),

    #[error("Database is not available: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Store(String),

    /// No usable decomposition credentials.
    #[error("{0}")]
    ProviderUnconfigured(String),

    #[error("AI provider rate limit reached: {message}")]
    ProviderRateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("AI provider quota exhausted: {0}")]
    ProviderQuotaExceeded(String),

    #[error("AI provider rejected the configured API key: {0}")]
    ProviderInvalidCredentials(String),

    #[error("AI provider request failed: {0}")]
    Provider(LlmError),

    #[error("{0}")]
    DecompositionFormat(String),

    #[error("Cyclic dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Task '{task}' is blocked by unfinished dependencies: {}", blocking.join(", "))]
    DependencyBlocked { task: String, blocking: Vec<String> },
}

impl GoalError {
    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Store(_) => "store_error",
            Self::ProviderUnconfigured(_) => "provider_unconfigured",
            Self::ProviderRateLimited { .. } => "provider_rate_limited",
            Self::ProviderQuotaExceeded(_) => "provider_quota_exceeded",
            Self::ProviderInvalidCredentials(_) => "provider_invalid_credentials",
            Self::Provider(e) if e.kind == LlmErrorKind::Timeout => "provider_timeout",
            Self::Provider(_) => "provider_error",
            Self::DecompositionFormat(_) => "decomposition_format_error",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::DependencyBlocked { .. } => "dependency_blocked",
        }
    }

    /// Suggested wait before resubmitting, when the provider sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ProviderRateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<StoreError> for GoalError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl From<LlmError> for GoalError {
    fn from(e: LlmError) -> Self {
        match e.kind {
            LlmErrorKind::RateLimited => Self::ProviderRateLimited {
                message: e.message,
                retry_after: e.retry_after,
            },
            LlmErrorKind::QuotaExceeded => Self::ProviderQuotaExceeded(e.message),
            LlmErrorKind::InvalidCredentials => Self::ProviderInvalidCredentials(e.message),
            _ => Self::Provider(e),
        }
    }
}

impl From<DecomposeError> for GoalError {
    fn from(e: DecomposeError) -> Self {
        match e {
            DecomposeError::Provider(e) => e.into(),
            DecomposeError::Format(msg) => Self::DecompositionFormat(format!(
                "Failed to parse AI response. Please try again. ({})",
                msg
            )),
        }
    }
}

impl From<ScheduleError> for GoalError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::CyclicDependency { cycle } => Self::CyclicDependency { cycle },
            // Only an absurd provider estimate can push a date out of range.
            e @ ScheduleError::DateOutOfRange { .. } => Self::DecompositionFormat(e.to_string()),
        }
    }
}
