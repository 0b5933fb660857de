use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use async_openai::error::{ApiError, OpenAIError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    #[error("Upstream service rate limited: {0}")]
    RateLimited(String),

    #[error("Could not parse model output: {0}")]
    ParseError(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::UpstreamError(_) => "UPSTREAM_ERROR",
            AppError::RateLimited(_) => "RATE_LIMITED",
            AppError::ParseError(_) => "PARSE_ERROR",
            AppError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::RateLimited(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamError(_) | AppError::ParseError(_) => StatusCode::BAD_GATEWAY,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

const RATE_LIMIT_CODES: [&str; 2] = ["rate_limit_exceeded", "rate_limit_error"];

fn is_rate_limit(err: &ApiError) -> bool {
    [err.code.as_deref(), err.r#type.as_deref()]
        .into_iter()
        .flatten()
        .any(|value| RATE_LIMIT_CODES.contains(&value))
}

impl From<OpenAIError> for AppError {
    fn from(err: OpenAIError) -> Self {
        match &err {
            OpenAIError::ApiError(api) if is_rate_limit(api) => {
                AppError::RateLimited(err.to_string())
            }
            OpenAIError::Reqwest(inner) if inner.is_timeout() => AppError::Timeout(err.to_string()),
            _ => AppError::UpstreamError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            AppError::RateLimited(err.to_string())
        } else if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::UpstreamError(err.to_string())
        }
    }
}

impl From<qdrant_client::QdrantError> for AppError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        AppError::UpstreamError(format!("vector index: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Why a quiz could not be generated although nothing failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotGeneratedReason {
    #[error("quiz attempt '{attempt_id}' not found")]
    AttemptNotFound { attempt_id: String },

    #[error("course '{course_id}' not found")]
    CourseNotFound { course_id: String },

    #[error("module {module_number} not found in course")]
    ModuleNotFound { module_number: u32 },

    #[error("module {module_number} has no recorded attempts")]
    ModuleNotAttempted { module_number: u32 },

    #[error("module {module_number} has an empty question bank")]
    EmptyQuestionBank { module_number: u32 },

    #[error("attempt refers to question bank {attempt_snapshot}, module now holds {current_snapshot}")]
    StaleQuestionBank {
        attempt_snapshot: String,
        current_snapshot: String,
    },

    #[error("model selected {actual} questions, expected {expected}")]
    SelectionCountMismatch { expected: usize, actual: usize },

    #[error("allocated {actual} final exam questions, expected {expected}")]
    AllocationSumMismatch { expected: usize, actual: usize },

    #[error("model selected question {number}, bank holds {bank_len}")]
    SelectionOutOfRange { number: usize, bank_len: usize },

    #[error("model selected question {number} more than once")]
    DuplicateSelection { number: usize },
}

impl NotGeneratedReason {
    pub fn code(&self) -> &'static str {
        match self {
            NotGeneratedReason::AttemptNotFound { .. }
            | NotGeneratedReason::CourseNotFound { .. }
            | NotGeneratedReason::ModuleNotFound { .. } => "NOT_FOUND",
            NotGeneratedReason::ModuleNotAttempted { .. }
            | NotGeneratedReason::EmptyQuestionBank { .. }
            | NotGeneratedReason::StaleQuestionBank { .. } => "PRECONDITION_FAILED",
            NotGeneratedReason::SelectionCountMismatch { .. }
            | NotGeneratedReason::AllocationSumMismatch { .. }
            | NotGeneratedReason::SelectionOutOfRange { .. }
            | NotGeneratedReason::DuplicateSelection { .. } => "INVARIANT_VIOLATION",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Result of a quiz generation request whose preconditions may legitimately fail.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome<T> {
    Generated(T),
    NotGenerated(NotGeneratedReason),
}

impl<T> GenerationOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GenerationOutcome<U> {
        match self {
            GenerationOutcome::Generated(value) => GenerationOutcome::Generated(f(value)),
            GenerationOutcome::NotGenerated(reason) => GenerationOutcome::NotGenerated(reason),
        }
    }

    pub fn generated(self) -> Option<T> {
        match self {
            GenerationOutcome::Generated(value) => Some(value),
            GenerationOutcome::NotGenerated(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&NotGeneratedReason> {
        match self {
            GenerationOutcome::Generated(_) => None,
            GenerationOutcome::NotGenerated(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotGeneratedResponse {
    pub generated: bool,
    pub reason: String,
    pub code: &'static str,
    pub detail: NotGeneratedReason,
}

impl From<NotGeneratedReason> for NotGeneratedResponse {
    fn from(reason: NotGeneratedReason) -> Self {
        NotGeneratedResponse {
            generated: false,
            reason: reason.to_string(),
            code: reason.code(),
            detail: reason,
        }
    }
}

pub fn not_generated_response(reason: NotGeneratedReason) -> HttpResponse {
    let status = reason.status_code();
    HttpResponse::build(status).json(NotGeneratedResponse::from(reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::AlreadyExists("test".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ValidationError("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::RateLimited("slow down".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ParseError("bad toc".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::NotFound("course".into());
        assert_eq!(err.to_string(), "Not found: course");
    }

    #[test]
    fn only_rate_limits_are_retryable() {
        assert!(AppError::RateLimited("429".into()).is_retryable());
        assert!(!AppError::UpstreamError("boom".into()).is_retryable());
        assert!(!AppError::ParseError("garbled".into()).is_retryable());
    }

    #[test]
    fn not_generated_reasons_map_to_distinct_statuses() {
        let missing = NotGeneratedReason::AttemptNotFound {
            attempt_id: "a-1".into(),
        };
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let unattempted = NotGeneratedReason::ModuleNotAttempted { module_number: 2 };
        assert_eq!(unattempted.code(), "PRECONDITION_FAILED");
        assert_eq!(unattempted.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let mismatch = NotGeneratedReason::SelectionCountMismatch {
            expected: 10,
            actual: 9,
        };
        assert_eq!(mismatch.code(), "INVARIANT_VIOLATION");
    }

    fn api_error(code: Option<&str>, kind: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: "upstream said no".to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn openai_rate_limits_are_classified_by_error_code() {
        assert!(matches!(
            AppError::from(api_error(Some("rate_limit_exceeded"), Some("requests"))),
            AppError::RateLimited(_)
        ));
        assert!(matches!(
            AppError::from(api_error(None, Some("rate_limit_error"))),
            AppError::RateLimited(_)
        ));
        assert!(matches!(
            AppError::from(api_error(Some("insufficient_quota"), None)),
            AppError::UpstreamError(_)
        ));

        let mentions_limit = OpenAIError::InvalidArgument("429 rate limit in text".to_string());
        assert!(matches!(
            AppError::from(mentions_limit),
            AppError::UpstreamError(_)
        ));
    }

    #[test]
    fn generation_outcome_map_preserves_reason() {
        let outcome: GenerationOutcome<u32> = GenerationOutcome::NotGenerated(
            NotGeneratedReason::ModuleNotFound { module_number: 3 },
        );
        let mapped = outcome.map(|n| n * 2);
        assert_eq!(
            mapped.reason(),
            Some(&NotGeneratedReason::ModuleNotFound { module_number: 3 })
        );

        let generated = GenerationOutcome::Generated(4).map(|n| n * 2);
        assert_eq!(generated.generated(), Some(8));
    }
}
