//! Error types for ScholarPort services
//!
//! Provides:
//! - Distinct error types for the CRUD failure modes
//! - HTTP status code mapping
//! - Structured error responses in the API envelope
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidIdFormat,
    BadRequest,

    // Resource errors (4xxx)
    NotFound,
    ArticleNotFound,
    CitationNotFound,

    // Conflict errors (5xxx)
    Conflict,
    DuplicateDoi,
    DuplicateCitation,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidIdFormat => 1002,
            ErrorCode::BadRequest => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ArticleNotFound => 4002,
            ErrorCode::CitationNotFound => 4003,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::DuplicateDoi => 5002,
            ErrorCode::DuplicateCitation => 5003,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed")]
    Validation { errors: Vec<String> },

    #[error("{message}")]
    InvalidId { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    // Resource errors
    #[error("Article not found")]
    ArticleNotFound { id: String },

    #[error("Citation not found")]
    CitationNotFound { id: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    // Conflict errors
    #[error("{message}")]
    Duplicate { message: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Duplicate DOI conflict
    pub fn duplicate_doi() -> Self {
        AppError::Duplicate {
            message: "Article with this DOI already exists".to_string(),
        }
    }

    /// Duplicate (articleId, title, year) conflict
    pub fn duplicate_citation() -> Self {
        AppError::Duplicate {
            message: "Citation with this title and year already exists for this article"
                .to_string(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidId { .. } => ErrorCode::InvalidIdFormat,
            AppError::BadRequest { .. } => ErrorCode::BadRequest,
            AppError::ArticleNotFound { .. } => ErrorCode::ArticleNotFound,
            AppError::CitationNotFound { .. } => ErrorCode::CitationNotFound,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidId { .. }
            | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::ArticleNotFound { .. }
            | AppError::CitationNotFound { .. }
            | AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Duplicate { .. } => StatusCode::CONFLICT,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to return to clients. Server-side detail stays in the logs.
    fn public_message(&self) -> String {
        if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Error body in the API envelope: `{ success: false, message, errors? }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let detail = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %detail,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %detail,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let errors = match &self {
            AppError::Validation { errors } => Some(errors.clone()),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            message: self.public_message(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errs
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: invalid value"),
                })
            })
            .collect();
        messages.sort();

        AppError::Validation { errors: messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ArticleNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::ArticleNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_id_is_bad_request() {
        let err = AppError::InvalidId {
            message: "Invalid article ID format".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_duplicate_is_conflict() {
        assert_eq!(
            AppError::duplicate_doi().status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::duplicate_citation().status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::duplicate_citation().code(), ErrorCode::Conflict);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            errors: vec!["title: Title is required".into()],
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_error_hides_detail() {
        let err = AppError::Internal {
            message: "connection refused at 10.0.0.3".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
