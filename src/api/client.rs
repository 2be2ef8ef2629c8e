// src/api/client.rs
//! Thin HTTP wrapper shared by the CRM and mail clients.
//!
//! It authenticates, resolves endpoints against a configurable base URL and
//! waits on the rate limiter before every request. Parsing and business
//! logic live elsewhere.

use super::rate_limit::{RateLimiter, ServiceKey};
use crate::constants::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, ExternalService};
use crate::types::{AccessToken, ValidatedUrl};
use reqwest::{header, Client, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How the access token is presented to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: <token>`
    RawKey,
}

/// A reqwest client bound to one external service.
#[derive(Clone)]
pub struct ServiceHttpClient {
    client: Client,
    base_url: ValidatedUrl,
    service: ExternalService,
    limiter: Arc<RateLimiter>,
    pace: ServiceKey,
    request_timeout: Duration,
}

impl ServiceHttpClient {
    /// Creates a client with authentication and JSON headers preset.
    pub fn new(
        service: ExternalService,
        token: &AccessToken,
        scheme: AuthScheme,
        base_url: ValidatedUrl,
        limiter: Arc<RateLimiter>,
        pace: ServiceKey,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(token, scheme)?)
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url,
            service,
            limiter,
            pace,
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Bounds each request, connect included. Expiry surfaces as [`AppError::Transport`].
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn create_headers(
        token: &AccessToken,
        scheme: AuthScheme,
    ) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = match scheme {
            AuthScheme::Bearer => format!("Bearer {}", token.as_str()),
            AuthScheme::RawKey => token.as_str().to_string(),
        };
        let mut auth_value = header::HeaderValue::from_str(&auth_header).map_err(|e| {
            AppError::MissingConfiguration(format!("Invalid access token format: {}", e))
        })?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Makes a GET request to `endpoint` (relative to the base URL).
    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Response, AppError> {
        let url = self.base_url.join_path(endpoint)?;
        self.limiter.wait(self.pace).await;
        log::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.request_timeout)
            .send()
            .await?;
        log::debug!("{} answered {} for {}", self.service, response.status(), endpoint);
        Ok(response)
    }

    /// Makes a POST request with a JSON body to `endpoint`.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, AppError> {
        let url = self.base_url.join_path(endpoint)?;
        self.limiter.wait(self.pace).await;
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await?;
        log::debug!("{} answered {} for {}", self.service, response.status(), endpoint);
        Ok(response)
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
    pub service: ExternalService,
}

/// Reads the response body as text, keeping the status and URL for error reporting.
pub async fn extract_response_text(
    service: ExternalService,
    response: Response,
) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
        service,
    })
}
