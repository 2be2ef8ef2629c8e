// src/api/parser.rs
//! Turns raw HTTP responses into typed payloads or classified errors.

use super::client::ApiResponse;
use super::responses::ServiceErrorBody;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{ApiErrorCode, AppError};
use serde::de::DeserializeOwned;

/// Parses a response body, or classifies a non-2xx response as an error.
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    ensure_success(&result)?;
    serde_json::from_str(&result.data).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", result.url, e);
        AppError::MalformedResponse(format!(
            "{} from {}; body: {}",
            e,
            result.url,
            preview(&result.data)
        ))
    })
}

/// Accepts any 2xx response, ignoring the body.
pub fn expect_success(result: ApiResponse<String>) -> Result<(), AppError> {
    ensure_success(&result)
}

fn ensure_success(result: &ApiResponse<String>) -> Result<(), AppError> {
    if result.status.is_success() {
        return Ok(());
    }

    let body = serde_json::from_str::<ServiceErrorBody>(&result.data).ok();
    let code = match body.as_ref().and_then(|b| b.category.as_deref()) {
        Some(category) => ApiErrorCode::from_category(category),
        None => ApiErrorCode::from_http_status(result.status.as_u16()),
    };

    if let Some(ServiceErrorBody {
        message: Some(message),
        correlation_id,
        ..
    }) = &body
    {
        log::debug!(
            "{} {} from {}: {} (correlation id {})",
            result.service,
            result.status,
            result.url,
            message,
            correlation_id.as_deref().unwrap_or("none")
        );
    }
    Err(AppError::UnexpectedStatus {
        service: result.service,
        status: result.status,
        code,
        body: preview(&result.data),
    })
}

/// Truncates a body for inclusion in error messages.
fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalService;
    use reqwest::StatusCode;

    fn response(status: StatusCode, body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status,
            url: "http://localhost/deals/v1/deal".to_string(),
            service: ExternalService::Crm,
        }
    }

    #[test]
    fn hubspot_category_is_classified() {
        let body = r#"{"status":"error","message":"Property values were not valid","correlationId":"abc","category":"VALIDATION_ERROR"}"#;
        let err = parse_api_response::<serde_json::Value>(response(StatusCode::BAD_REQUEST, body))
            .unwrap_err();

        match err {
            AppError::UnexpectedStatus { code, status, .. } => {
                assert_eq!(code, ApiErrorCode::ValidationError);
                assert_eq!(status, StatusCode::BAD_REQUEST);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_error_body_falls_back_to_status() {
        let err = expect_success(response(StatusCode::TOO_MANY_REQUESTS, "slow down")).unwrap_err();

        assert!(matches!(
            err,
            AppError::UnexpectedStatus {
                code: ApiErrorCode::RateLimited,
                ..
            }
        ));
    }

    #[test]
    fn invalid_json_on_success_is_malformed() {
        let err = parse_api_response::<serde_json::Value>(response(StatusCode::OK, "<html>"))
            .unwrap_err();

        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "é".repeat(ERROR_BODY_PREVIEW_LENGTH + 10);
        let shown = preview(&body);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), ERROR_BODY_PREVIEW_LENGTH + 3);
    }
}
