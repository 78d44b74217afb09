use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A single rejected input field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("no fields provided")]
    NoFieldsProvided,

    #[error("invalid movie id {0:?}")]
    InvalidId(String),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    #[error("unsupported value {value:?} for `{parameter}`")]
    UnsupportedParameter {
        parameter: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("missing or invalid API key")]
    Unauthorized,

    #[error("movie {0} not found")]
    MovieNotFound(i32),

    #[error("route not found")]
    RouteNotFound,

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<jiff::Error> for AppError {
    fn from(err: jiff::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidJson(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::NoFieldsProvided
            | Self::InvalidId(_)
            | Self::InvalidJson(_)
            | Self::InvalidQuery(_)
            | Self::UnsupportedParameter { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MovieNotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NoFieldsProvided => "NO_FIELDS_PROVIDED",
            Self::InvalidId(_) => "INVALID_ID",
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::UnsupportedParameter { .. } => "UNSUPPORTED_PARAMETER",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::MovieNotFound(_) => "MOVIE_NOT_FOUND",
            Self::RouteNotFound => "NOT_FOUND",
            Self::Timeout => "REQUEST_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to send to clients. Storage and internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(_) => "Validation failed".to_string(),
            Self::NoFieldsProvided => "No fields provided for update".to_string(),
            Self::InvalidId(raw) => format!("Movie id must be a positive integer, got {raw:?}"),
            Self::InvalidJson(detail) => format!("Invalid JSON body: {detail}"),
            Self::InvalidQuery(detail) => format!("Invalid query string: {detail}"),
            Self::UnsupportedParameter { parameter, value, allowed } => format!(
                "Unsupported value {value:?} for `{parameter}`; allowed: {}",
                allowed.join(", ")
            ),
            Self::Unauthorized => "Unauthorized: missing or invalid API key".to_string(),
            Self::MovieNotFound(id) => format!("Movie with id {id} not found"),
            Self::RouteNotFound => "Route not found".to_string(),
            Self::Timeout => "Request timed out".to_string(),
            Self::Database(_) => "A database error occurred".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed: Option<&'static [&'static str]>,
    timestamp: jiff::Timestamp,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Database(err) => tracing::error!(error = %err, "database error"),
            Self::Internal(err) => tracing::error!(error = ?err, "internal error"),
            _ => tracing::debug!(status = %status, code = self.code(), error = %self, "request rejected"),
        }

        let body = ErrorBody {
            success: false,
            message: self.public_message(),
            code: self.code(),
            errors: match &self {
                Self::Validation(errors) => Some(errors.as_slice()),
                _ => None,
            },
            allowed: match &self {
                Self::UnsupportedParameter { allowed, .. } => Some(*allowed),
                _ => None,
            },
            timestamp: jiff::Timestamp::now(),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
