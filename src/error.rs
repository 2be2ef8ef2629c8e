// src/error.rs
//! Application error types with structured error handling.
//!
//! Each variant names one failure mode of the outreach run. None of them is
//! retried inside the library: they unwind to `main`, which turns them into
//! an exit status through [`AppError::exit_code`].

use std::fmt;
use thiserror::Error;

/// Remote API error categories as a typed vocabulary.
///
/// HubSpot error bodies carry a `category` string such as `"RATE_LIMITS"`;
/// other services only contribute their HTTP status.
/// Matching on this enum keeps those strings in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Daily or per-second quota exhausted
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// Token is invalid or expired
    InvalidAuthentication,
    /// Token lacks the scope for this endpoint
    MissingScopes,
    /// Request parameters failed validation
    ValidationError,
    /// Conflict with current state of the resource
    Conflict,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// A category this client doesn't recognize yet
    Unknown(String),
}

impl ApiErrorCode {
    /// Parse a HubSpot error category into the typed vocabulary.
    pub fn from_category(category: &str) -> Self {
        match category {
            "RATE_LIMITS" => Self::RateLimited,
            "OBJECT_NOT_FOUND" => Self::ObjectNotFound,
            "INVALID_AUTHENTICATION" => Self::InvalidAuthentication,
            "MISSING_SCOPES" => Self::MissingScopes,
            "VALIDATION_ERROR" => Self::ValidationError,
            "CONFLICT" => Self::Conflict,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::InvalidAuthentication,
            404 => Self::ObjectNotFound,
            _ => Self::HttpStatus(status),
        }
    }

    /// Whether retrying later could succeed. Informational only: nothing retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::HttpStatus(500..=599))
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "RATE_LIMITS"),
            Self::ObjectNotFound => write!(f, "OBJECT_NOT_FOUND"),
            Self::InvalidAuthentication => write!(f, "INVALID_AUTHENTICATION"),
            Self::MissingScopes => write!(f, "MISSING_SCOPES"),
            Self::ValidationError => write!(f, "VALIDATION_ERROR"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// The external system a failed call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalService {
    Crm,
    Mail,
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crm => write!(f, "CRM"),
            Self::Mail => write!(f, "mail provider"),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status} ({code}): {body}")]
    UnexpectedStatus {
        service: ExternalService,
        status: reqwest::StatusCode,
        code: ApiErrorCode,
        body: String,
    },

    #[error("Endpoint '{endpoint}' reported more pages than this client consumes")]
    UnsupportedPagination { endpoint: String },

    #[error("Create call for {resource} succeeded but returned no usable identifier")]
    NoIdentifierReturned { resource: &'static str },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Mail provider rejected {rejected} recipient(s) for {recipient}")]
    MailRejected { recipient: String, rejected: u64 },

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Maps the error taxonomy onto the process exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingConfiguration(_)
            | Self::ValidationError(_)
            | Self::JsonParseError { .. } => 2,
            Self::Transport(_) => 3,
            Self::UnexpectedStatus { .. } | Self::MailRejected { .. } => 4,
            Self::UnsupportedPagination { .. } => 5,
            Self::NoIdentifierReturned { .. } => 6,
            Self::MalformedResponse(_) => 7,
            Self::InternalError { .. } => 1,
        }
    }

    /// Whether running again later could succeed where this run failed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UnexpectedStatus { code, .. } => code.is_transient(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_codes() {
        assert_eq!(
            ApiErrorCode::from_category("RATE_LIMITS"),
            ApiErrorCode::RateLimited
        );
        assert_eq!(
            ApiErrorCode::from_category("OBJECT_NOT_FOUND"),
            ApiErrorCode::ObjectNotFound
        );
        assert_eq!(
            ApiErrorCode::from_category("SOMETHING_NEW"),
            ApiErrorCode::Unknown("SOMETHING_NEW".to_string())
        );
    }

    #[test]
    fn status_fallback() {
        assert_eq!(ApiErrorCode::from_http_status(429), ApiErrorCode::RateLimited);
        assert_eq!(
            ApiErrorCode::from_http_status(502),
            ApiErrorCode::HttpStatus(502)
        );
        assert!(ApiErrorCode::HttpStatus(503).is_transient());
        assert!(!ApiErrorCode::ObjectNotFound.is_transient());
    }

    #[test]
    fn exit_codes_follow_the_taxonomy() {
        let pagination = AppError::UnsupportedPagination {
            endpoint: "companies/v2/companies/1/vids".to_string(),
        };
        let no_id = AppError::NoIdentifierReturned { resource: "deal" };
        let status = AppError::UnexpectedStatus {
            service: ExternalService::Crm,
            status: reqwest::StatusCode::BAD_REQUEST,
            code: ApiErrorCode::ValidationError,
            body: "{}".to_string(),
        };
        let config = AppError::MissingConfiguration("campaign".to_string());

        assert_eq!(pagination.exit_code(), 5);
        assert_eq!(no_id.exit_code(), 6);
        assert_eq!(status.exit_code(), 4);
        assert_eq!(config.exit_code(), 2);
    }

    #[test]
    fn only_rate_limits_and_server_errors_are_transient() {
        let throttled = AppError::UnexpectedStatus {
            service: ExternalService::Crm,
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            code: ApiErrorCode::RateLimited,
            body: String::new(),
        };
        let forbidden = AppError::UnexpectedStatus {
            service: ExternalService::Crm,
            status: reqwest::StatusCode::FORBIDDEN,
            code: ApiErrorCode::MissingScopes,
            body: String::new(),
        };

        assert!(throttled.is_transient());
        assert!(!forbidden.is_transient());
        assert!(!AppError::NoIdentifierReturned { resource: "deal" }.is_transient());
    }

    #[test]
    fn messages_name_the_failure() {
        let err = AppError::UnexpectedStatus {
            service: ExternalService::Mail,
            status: reqwest::StatusCode::UNAUTHORIZED,
            code: ApiErrorCode::HttpStatus(401),
            body: "bad key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "mail provider returned HTTP 401 Unauthorized (http_401): bad key"
        );
    }
}
