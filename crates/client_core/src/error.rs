//! Failure taxonomy shared by every effect result and client-side validation.

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_QUERY_LEN: usize = 100;
pub const PRIORITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
pub const POSITION_LIMIT: i32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("session expired or not signed in")]
    Auth,
    #[error("not permitted: {0}")]
    Permission(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("changed on the server: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Auth,
    Permission,
    Validation,
    Conflict,
    NotFound,
    Transport,
}

impl Failure {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Auth => FailureCategory::Auth,
            Self::Permission(_) => FailureCategory::Permission,
            Self::Validation(_) => FailureCategory::Validation,
            Self::Conflict(_) => FailureCategory::Conflict,
            Self::NotFound(_) => FailureCategory::NotFound,
            Self::Transport(_) => FailureCategory::Transport,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category() == FailureCategory::Auth
    }

    pub fn is_conflict(&self) -> bool {
        self.category() == FailureCategory::Conflict
    }
}

impl From<ApiError> for Failure {
    fn from(value: ApiError) -> Self {
        match value.code() {
            ErrorCode::Unauthorized => Self::Auth,
            ErrorCode::Forbidden => Self::Permission(value.message),
            ErrorCode::NotFound => Self::NotFound(value.message),
            ErrorCode::Conflict => Self::Conflict(value.message),
            ErrorCode::Validation => Self::Validation(value.message),
            ErrorCode::Transport => Self::Transport(value.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("priority {value} is outside {min}..={max}")]
    PriorityOutOfRange { value: u8, min: u8, max: u8 },
    #[error("position ({x}, {y}) is outside the canvas")]
    PositionOutOfRange { x: i32, y: i32 },
    #[error("search query must be at most {max} characters")]
    QueryTooLong { max: usize },
    #[error("select a project first")]
    NoProjectSelected,
    #[error("task {0} is not loaded")]
    UnknownTask(i64),
}

impl From<ValidationError> for Failure {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(title.to_string())
}

pub fn validate_priority(value: u8) -> Result<u8, ValidationError> {
    if PRIORITY_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::PriorityOutOfRange {
            value,
            min: *PRIORITY_RANGE.start(),
            max: *PRIORITY_RANGE.end(),
        })
    }
}

pub fn validate_position(x: i32, y: i32) -> Result<(), ValidationError> {
    let range = -POSITION_LIMIT..=POSITION_LIMIT;
    if range.contains(&x) && range.contains(&y) {
        Ok(())
    } else {
        Err(ValidationError::PositionOutOfRange { x, y })
    }
}

/// Trimmed query, or `None` when there is nothing to search for.
pub fn normalize_query(raw: &str) -> Result<Option<String>, ValidationError> {
    let query = raw.trim();
    if query.is_empty() {
        return Ok(None);
    }
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::QueryTooLong { max: MAX_QUERY_LEN });
    }
    Ok(Some(query.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_onto_failure_taxonomy() {
        assert_eq!(Failure::from(ApiError::new(401, "expired")), Failure::Auth);
        assert_eq!(
            Failure::from(ApiError::new(403, "members only")),
            Failure::Permission("members only".to_string())
        );
        assert!(Failure::from(ApiError::new(409, "stale")).is_conflict());
        assert_eq!(
            Failure::from(ApiError::new(500, "boom")).category(),
            FailureCategory::Transport
        );
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(validate_title("  fix login  ").as_deref(), Ok("fix login"));
        assert_eq!(validate_title("   "), Err(ValidationError::EmptyTitle));
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn priority_and_position_ranges() {
        assert!(validate_priority(1).is_ok());
        assert!(validate_priority(5).is_ok());
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(6).is_err());
        assert!(validate_position(-5, 40).is_ok());
        assert!(validate_position(POSITION_LIMIT + 1, 0).is_err());
    }

    #[test]
    fn blank_query_means_no_search() {
        assert_eq!(normalize_query("  "), Ok(None));
        assert_eq!(normalize_query(" bug ").unwrap(), Some("bug".to_string()));
    }
}
