//! LLM error types with failure classification.
//!
//! Provider calls are never retried here; the classification only decides
//! how a failure is surfaced to callers (retry later, fix configuration, or
//! plain failure).

use std::time::Duration;

use crate::util::redact_secrets;

/// Error from LLM API calls.
#[derive(Debug, Clone)]
pub struct LlmError {
    /// The kind of error
    pub kind: LlmErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message, with anything resembling an API key redacted
    pub message: String,
    /// Suggested wait before resubmitting (from Retry-After header)
    pub retry_after: Option<Duration>,
}

impl LlmError {
    fn with_kind(kind: LlmErrorKind, status_code: Option<u16>, message: String) -> Self {
        Self {
            kind,
            status_code,
            message: redact_secrets(&message),
            retry_after: None,
        }
    }

    /// Create a rate limit error.
    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::with_kind(LlmErrorKind::RateLimited, Some(429), message)
        }
    }

    /// Create a quota/billing exhaustion error.
    pub fn quota_exceeded(status_code: u16, message: String) -> Self {
        Self::with_kind(LlmErrorKind::QuotaExceeded, Some(status_code), message)
    }

    /// Create an authentication error.
    pub fn invalid_credentials(status_code: u16, message: String) -> Self {
        Self::with_kind(LlmErrorKind::InvalidCredentials, Some(status_code), message)
    }

    /// Create an error for a model that does not exist or was retired.
    pub fn model_unavailable(status_code: u16, message: String) -> Self {
        Self::with_kind(LlmErrorKind::ModelUnavailable, Some(status_code), message)
    }

    /// Create a server error.
    pub fn server_error(status_code: u16, message: String) -> Self {
        Self::with_kind(LlmErrorKind::ServerError, Some(status_code), message)
    }

    /// Create a client error (bad request etc.).
    pub fn client_error(status_code: u16, message: String) -> Self {
        Self::with_kind(LlmErrorKind::ClientError, Some(status_code), message)
    }

    /// Create a network error.
    pub fn network_error(message: String) -> Self {
        Self::with_kind(LlmErrorKind::NetworkError, None, message)
    }

    /// Create a timeout error.
    pub fn timeout(after: Duration) -> Self {
        Self::with_kind(
            LlmErrorKind::Timeout,
            None,
            format!("No response within {}s", after.as_secs()),
        )
    }

    /// Create a parse error.
    pub fn parse_error(message: String) -> Self {
        Self::with_kind(LlmErrorKind::ParseError, None, message)
    }

    /// Build an error from a non-success HTTP response.
    pub fn from_response(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = body.to_string();
        match classify_http_status(status, body) {
            LlmErrorKind::RateLimited => Self::rate_limited(message, retry_after),
            LlmErrorKind::QuotaExceeded => Self::quota_exceeded(status, message),
            LlmErrorKind::InvalidCredentials => Self::invalid_credentials(status, message),
            LlmErrorKind::ModelUnavailable => Self::model_unavailable(status, message),
            LlmErrorKind::ClientError => Self::client_error(status, message),
            _ => Self::server_error(status, message),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Rate limited (429) - retry after a delay
    RateLimited,
    /// Account quota or billing exhausted - retry only after the account is topped up
    QuotaExceeded,
    /// API key rejected (401) - operator must fix configuration
    InvalidCredentials,
    /// Requested model missing, retired, or not accessible
    ModelUnavailable,
    /// Server error (5xx)
    ServerError,
    /// Other client error (4xx)
    ClientError,
    /// Connection failed
    NetworkError,
    /// No response within the configured deadline
    Timeout,
    /// Response body was not a chat completion
    ParseError,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::RateLimited => write!(f, "Rate limited"),
            LlmErrorKind::QuotaExceeded => write!(f, "Quota exceeded"),
            LlmErrorKind::InvalidCredentials => write!(f, "Invalid credentials"),
            LlmErrorKind::ModelUnavailable => write!(f, "Model unavailable"),
            LlmErrorKind::ServerError => write!(f, "Server error"),
            LlmErrorKind::ClientError => write!(f, "Client error"),
            LlmErrorKind::NetworkError => write!(f, "Network error"),
            LlmErrorKind::Timeout => write!(f, "Timeout"),
            LlmErrorKind::ParseError => write!(f, "Parse error"),
        }
    }
}

/// Classify an HTTP failure from its status code and response body.
///
/// Providers report quota exhaustion with the same 429 as rate limiting, so
/// the body text is inspected to tell them apart.
pub fn classify_http_status(status: u16, body: &str) -> LlmErrorKind {
    let body = body.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| body.contains(n));

    if mentions(&["insufficient_quota", "exceeded your current quota", "billing"]) {
        return LlmErrorKind::QuotaExceeded;
    }
    if status == 401 || mentions(&["invalid_api_key", "incorrect api key"]) {
        return LlmErrorKind::InvalidCredentials;
    }
    if status == 429 {
        return LlmErrorKind::RateLimited;
    }
    if mentions(&[
        "model_not_found",
        "does not exist or you do not have access",
        "decommissioned",
    ]) {
        return LlmErrorKind::ModelUnavailable;
    }
    match status {
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(429, ""), LlmErrorKind::RateLimited);
        assert_eq!(classify_http_status(500, ""), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(503, ""), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(400, ""), LlmErrorKind::ClientError);
        assert_eq!(classify_http_status(401, ""), LlmErrorKind::InvalidCredentials);
    }

    #[test]
    fn test_body_refines_classification() {
        let quota = r#"{"error":{"code":"insufficient_quota","message":"You exceeded your current quota"}}"#;
        assert_eq!(classify_http_status(429, quota), LlmErrorKind::QuotaExceeded);

        let bad_key = r#"{"error":{"code":"invalid_api_key"}}"#;
        assert_eq!(classify_http_status(403, bad_key), LlmErrorKind::InvalidCredentials);

        let retired = "The model `llama3-70b-8192` has been decommissioned";
        assert_eq!(classify_http_status(400, retired), LlmErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_retry_after_kept_for_rate_limits() {
        let error = LlmError::from_response(429, "slow down", Some(Duration::from_secs(30)));
        assert_eq!(error.kind, LlmErrorKind::RateLimited);
        assert_eq!(error.retry_after, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_messages_are_redacted() {
        let error = LlmError::from_response(
            401,
            "Incorrect API key provided: sk-proj-abcdef1234567890",
            None,
        );
        assert!(!error.message.contains("abcdef1234567890"));
        assert!(!error.to_string().contains("sk-proj-abcdef"));
    }
}
