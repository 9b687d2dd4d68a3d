// src/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use serde_json::json;
use validator::{ValidationErrors, ValidationErrorsKind};

/// A single field-level validation problem.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {message}")]
    Validation { message: String, issues: Vec<FieldIssue> },
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation { message: msg.into(), issues: Vec::new() }
    }

    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        let message = msg.into();
        AppError::Validation {
            message: message.clone(),
            issues: vec![FieldIssue { field: field.to_string(), message }],
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn db(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                json!({ "error": "Database error occurred" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                json!({ "error": "Internal server error" })
            }
            AppError::Validation { message, issues } if !issues.is_empty() => {
                json!({ "error": message, "issues": issues })
            }
            AppError::Validation { message, .. } => json!({ "error": message }),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => json!({ "error": msg }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut issues = Vec::new();
        collect_issues("", &errors, &mut issues);
        issues.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::Validation { message: "Validation failed".to_string(), issues }
    }
}

/// Flattens nested validator output into `items[0].quantity` style paths.
fn collect_issues(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldIssue>) {
    for (field, kind) in errors.errors() {
        // Struct-level checks are reported under "__all__".
        let path = match (prefix.is_empty(), field == "__all__") {
            (true, true) => "request".to_string(),
            (false, true) => prefix.to_string(),
            (true, false) => field.to_string(),
            (false, false) => format!("{prefix}.{field}"),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldIssue {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value ({})", e.code)),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_issues(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_issues(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

/// Maps a unique-key violation (SQLSTATE 23505) to a conflict, everything
/// else to a database error.
pub fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    if is_unique_violation(&err) {
        return AppError::conflict(message);
    }
    AppError::db(err)
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .as_deref()
        == Some("23505")
}

/// Foreign-key violation (SQLSTATE 23503), raised when deleting a referenced row.
pub fn map_in_use(err: sqlx::Error, message: &str) -> AppError {
    if err.as_database_error().and_then(|db| db.code()).as_deref() == Some("23503") {
        return AppError::conflict(message);
    }
    AppError::db(err)
}
