// src/mail/sparkpost.rs
//! SparkPost transmissions API.

use super::{EmailMessage, Notifier};
use crate::api::parser::parse_api_response;
use crate::api::{extract_response_text, AuthScheme, RateLimiter, ServiceHttpClient, ServiceKey};
use crate::error::{AppError, ExternalService};
use crate::types::{AccessToken, ValidatedUrl};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const TRANSMISSIONS_ENDPOINT: &str = "api/v1/transmissions";

#[derive(Debug, Serialize)]
struct Transmission<'a> {
    recipients: Vec<Recipient<'a>>,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    address: Address<'a>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    from: FromAddress<'a>,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Serialize)]
struct FromAddress<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct TransmissionResponse {
    results: TransmissionResults,
}

#[derive(Debug, Deserialize)]
struct TransmissionResults {
    #[serde(default)]
    total_rejected_recipients: u64,
    #[serde(default)]
    total_accepted_recipients: u64,
    #[serde(default)]
    id: Option<String>,
}

impl<'a> Transmission<'a> {
    fn single(message: &'a EmailMessage) -> Self {
        Self {
            recipients: vec![Recipient {
                address: Address {
                    email: &message.to,
                },
            }],
            content: Content {
                from: FromAddress {
                    email: message.from.address.as_str(),
                    name: &message.from.display_name,
                },
                subject: &message.subject,
                html: &message.html_body,
            },
        }
    }
}

/// Sends through SparkPost. Every request waits on [`ServiceKey::Mail`].
#[derive(Clone)]
pub struct SparkPostNotifier {
    http: ServiceHttpClient,
}

impl SparkPostNotifier {
    pub fn new(
        api_key: &AccessToken,
        base_url: ValidatedUrl,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, AppError> {
        let http = ServiceHttpClient::new(
            ExternalService::Mail,
            api_key,
            AuthScheme::RawKey,
            base_url,
            limiter,
            ServiceKey::Mail,
        )?;
        Ok(Self { http })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_request_timeout(timeout);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for SparkPostNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), AppError> {
        let body = Transmission::single(message);
        let response = self.http.post(TRANSMISSIONS_ENDPOINT, &body).await?;
        let result = extract_response_text(ExternalService::Mail, response).await?;
        let sent: TransmissionResponse = parse_api_response(result)?;

        let results = sent.results;
        if results.total_rejected_recipients > 0 || results.total_accepted_recipients == 0 {
            return Err(AppError::MailRejected {
                recipient: message.to.clone(),
                rejected: results.total_rejected_recipients.max(1),
            });
        }

        log::debug!(
            "Transmission {} accepted for {}",
            results.id.as_deref().unwrap_or("?"),
            message.to
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Sender;
    use crate::types::EmailAddress;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn transmission_body_shape() {
        let message = EmailMessage {
            to: "radio@cibl.ca".to_string(),
            subject: "New single".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            from: Sender {
                address: EmailAddress::parse("alex@doloreanne.com").unwrap(),
                display_name: "Alexandre Vézina".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(Transmission::single(&message)).unwrap(),
            json!({
                "recipients": [{"address": {"email": "radio@cibl.ca"}}],
                "content": {
                    "from": {"email": "alex@doloreanne.com", "name": "Alexandre Vézina"},
                    "subject": "New single",
                    "html": "<p>Hello</p>"
                }
            })
        );
    }
}
