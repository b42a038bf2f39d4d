//! Structured error types shared by the services and the HTTP layer.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    HierarchyTooDeep,
    SelfParent,
    CategoryCycle,

    // Not found errors
    CategoryNotFound,
    TaskNotFound,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Internal,
}

impl ErrorCode {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::HierarchyTooDeep
            | ErrorCode::SelfParent
            | ErrorCode::CategoryCycle => ErrorKind::Validation,
            ErrorCode::CategoryNotFound | ErrorCode::TaskNotFound => ErrorKind::NotFound,
            ErrorCode::DatabaseError | ErrorCode::InternalError => ErrorKind::Internal,
        }
    }
}

/// Structured application error.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    // Convenience constructors

    pub fn missing_field(field: &str, message: &str) -> Self {
        Self::new(ErrorCode::MissingRequiredField, message).with_field(field)
    }

    pub fn invalid_value(field: &str, message: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, message).with_field(field)
    }

    pub fn hierarchy_too_deep() -> Self {
        Self::new(
            ErrorCode::HierarchyTooDeep,
            "Category hierarchy allows at most 2 levels.",
        )
        .with_field("parent_id")
    }

    pub fn self_parent() -> Self {
        Self::new(
            ErrorCode::SelfParent,
            "A category cannot be its own parent.",
        )
        .with_field("parent_id")
    }

    pub fn category_cycle() -> Self {
        Self::new(
            ErrorCode::CategoryCycle,
            "Cycle detected: the parent cannot be a child of the category.",
        )
        .with_field("parent_id")
    }

    pub fn category_not_found(id: i64) -> Self {
        Self::new(
            ErrorCode::CategoryNotFound,
            format!("Category not found: {}", id),
        )
    }

    pub fn task_not_found(id: i64) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {}", id))
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(sql_err) => AppError::database(sql_err),
                Err(err) => AppError::internal(err),
            },
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::database(err)
    }
}

/// Result type for service operations.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_roundtrip_keeps_code_and_field() {
        let err: anyhow::Error = AppError::hierarchy_too_deep().into();
        let back = AppError::from(err);
        assert_eq!(back.code, ErrorCode::HierarchyTooDeep);
        assert_eq!(back.field.as_deref(), Some("parent_id"));
        assert!(back.is_validation());
    }

    #[test]
    fn foreign_errors_become_internal() {
        let back = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(back.code, ErrorCode::InternalError);
        assert_eq!(back.kind(), ErrorKind::Internal);
    }

    #[test]
    fn serializes_without_empty_field() {
        let json = serde_json::to_value(AppError::task_not_found(7)).unwrap();
        assert_eq!(json["code"], "TASK_NOT_FOUND");
        assert!(json.get("field").is_none());
    }
}
