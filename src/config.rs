// src/config.rs
use crate::api::{RateLimiter, ServiceKey};
use crate::campaign::FailurePolicy;
use crate::constants::{
    DEFAULT_CRM_INTERVAL_MS, DEFAULT_MAIL_INTERVAL_MS, DEFAULT_ORGANIZATION_INTERVAL_MS,
    DEFAULT_PERSON_LOOKUP_INTERVAL_MS, DEFAULT_SEGMENT_PROPERTY, HTTP_REQUEST_TIMEOUT_SECS,
    HUBSPOT_API_BASE_URL, SPARKPOST_API_BASE_URL,
};
use crate::error::AppError;
use crate::mail::{EmailMessage, Sender};
use crate::model::{EmailMetadata, EmailMetadataFrom, EmailMetadataRecipient, EngagementMetadata};
use crate::types::{AccessToken, EmailAddress, PipelineId, StageId, ValidatedUrl};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// CRM (HubSpot) private app token
    #[arg(long, env = "CRM_TOKEN", hide_env_values = true)]
    pub crm_token: String,

    /// Mail provider (SparkPost) API key
    #[arg(long, env = "MAIL_TOKEN", hide_env_values = true)]
    pub mail_token: String,

    /// Campaign definition (JSON): segment, pipeline, stage, email and pacing
    #[arg(short, long)]
    pub campaign: PathBuf,

    /// Keep going when one organization fails, instead of stopping the run
    #[arg(long, default_value_t = false)]
    pub isolate_failures: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// CRM API base URL
    #[arg(long, default_value = HUBSPOT_API_BASE_URL)]
    pub crm_base_url: String,

    /// Mail provider API base URL
    #[arg(long, default_value = SPARKPOST_API_BASE_URL)]
    pub mail_base_url: String,

    /// Seconds before an HTTP request to either service is abandoned
    #[arg(long, default_value_t = HTTP_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,
}

/// Minimum intervals between paced calls, in milliseconds. Zero disables pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    pub organization_interval_ms: u64,
    pub person_lookup_interval_ms: u64,
    pub crm_interval_ms: u64,
    pub mail_interval_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            organization_interval_ms: DEFAULT_ORGANIZATION_INTERVAL_MS,
            person_lookup_interval_ms: DEFAULT_PERSON_LOOKUP_INTERVAL_MS,
            crm_interval_ms: DEFAULT_CRM_INTERVAL_MS,
            mail_interval_ms: DEFAULT_MAIL_INTERVAL_MS,
        }
    }
}

impl PacingConfig {
    /// No pacing at all.
    pub fn none() -> Self {
        Self {
            organization_interval_ms: 0,
            person_lookup_interval_ms: 0,
            crm_interval_ms: 0,
            mail_interval_ms: 0,
        }
    }

    pub fn interval(&self, key: ServiceKey) -> Duration {
        let ms = match key {
            ServiceKey::Organization => self.organization_interval_ms,
            ServiceKey::PersonLookup => self.person_lookup_interval_ms,
            ServiceKey::Crm => self.crm_interval_ms,
            ServiceKey::Mail => self.mail_interval_ms,
        };
        Duration::from_millis(ms)
    }

    /// A limiter enforcing these intervals on `clock`.
    pub fn rate_limiter(&self, clock: Arc<dyn crate::api::Clock>) -> RateLimiter {
        ServiceKey::ALL
            .into_iter()
            .fold(RateLimiter::new(clock), |limiter, key| {
                limiter.with_interval(key, self.interval(key))
            })
    }
}

/// The static email sent to every organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailTemplateConfig {
    pub subject: String,
    /// Inline HTML body.
    #[serde(default)]
    pub html_body: Option<String>,
    /// HTML body read from a file, relative to the campaign file.
    #[serde(default)]
    pub html_body_path: Option<PathBuf>,
    pub from_address: EmailAddress,
    pub from_name: String,
}

/// Campaign definition as written in the campaign file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct CampaignFile {
    segment_tag: String,
    #[serde(default = "default_segment_property")]
    segment_property: String,
    pipeline_id: PipelineId,
    stage_id: StageId,
    email: EmailTemplateConfig,
    #[serde(default)]
    pacing: PacingConfig,
}

fn default_segment_property() -> String {
    DEFAULT_SEGMENT_PROPERTY.to_string()
}

/// Email content with the body resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub html_body: String,
    pub sender: Sender,
}

impl EmailTemplate {
    /// The message for one recipient.
    pub fn message_to(&self, recipient: &str) -> EmailMessage {
        EmailMessage {
            to: recipient.to_string(),
            subject: self.subject.clone(),
            html_body: self.html_body.clone(),
            from: self.sender.clone(),
        }
    }

    /// What the CRM records about a message sent to `recipient`.
    pub fn engagement_metadata(&self, recipient: &str) -> EngagementMetadata {
        let (first_name, last_name) = split_display_name(&self.sender.display_name);
        EngagementMetadata::Email(EmailMetadata {
            from: EmailMetadataFrom {
                email: self.sender.address.as_str().to_string(),
                first_name,
                last_name,
            },
            to: vec![EmailMetadataRecipient {
                email: recipient.to_string(),
            }],
            subject: self.subject.clone(),
            html: self.html_body.clone(),
        })
    }
}

/// Splits on the first whitespace: "Alexandre Vézina" -> ("Alexandre", "Vézina").
fn split_display_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

/// Everything the orchestrator needs to know about one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    pub segment_tag: String,
    pub segment_property: String,
    pub pipeline_id: PipelineId,
    pub stage_id: StageId,
    pub email: EmailTemplate,
    pub pacing: PacingConfig,
}

impl CampaignConfig {
    /// Loads and validates a campaign file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::MissingConfiguration(format!(
                "cannot read campaign file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: CampaignFile =
            serde_json::from_str(&raw).map_err(|source| AppError::JsonParseError {
                path: path.to_path_buf(),
                source,
            })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base_dir)
    }

    /// Parses a campaign from JSON text; relative body paths resolve against `base_dir`.
    pub fn from_json(json: &str, base_dir: &Path) -> Result<Self, AppError> {
        let file: CampaignFile =
            serde_json::from_str(json).map_err(|source| AppError::JsonParseError {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        Self::from_file(file, base_dir)
    }

    fn from_file(file: CampaignFile, base_dir: &Path) -> Result<Self, AppError> {
        if file.segment_tag.trim().is_empty() {
            return Err(crate::types::ValidationError::EmptyField("segment_tag").into());
        }
        if file.segment_property.trim().is_empty() {
            return Err(crate::types::ValidationError::EmptyField("segment_property").into());
        }
        if file.email.subject.trim().is_empty() {
            return Err(crate::types::ValidationError::EmptyField("email.subject").into());
        }

        let html_body = match (file.email.html_body, file.email.html_body_path) {
            (Some(body), None) => body,
            (None, Some(relative)) => {
                let path = base_dir.join(relative);
                std::fs::read_to_string(&path).map_err(|e| {
                    AppError::MissingConfiguration(format!(
                        "cannot read email body {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
            (Some(_), Some(_)) => {
                return Err(AppError::MissingConfiguration(
                    "email sets both html_body and html_body_path".to_string(),
                ))
            }
            (None, None) => {
                return Err(AppError::MissingConfiguration(
                    "email needs html_body or html_body_path".to_string(),
                ))
            }
        };
        if html_body.trim().is_empty() {
            return Err(crate::types::ValidationError::EmptyField("email body").into());
        }

        Ok(Self {
            segment_tag: file.segment_tag,
            segment_property: file.segment_property,
            pipeline_id: file.pipeline_id,
            stage_id: file.stage_id,
            email: EmailTemplate {
                subject: file.email.subject,
                html_body,
                sender: Sender {
                    address: file.email.from_address,
                    display_name: file.email.from_name.trim().to_string(),
                },
            },
            pacing: file.pacing,
        })
    }
}

/// Resolved run configuration: validated and ready to build the clients.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    pub crm_token: AccessToken,
    pub mail_token: AccessToken,
    pub crm_base_url: ValidatedUrl,
    pub mail_base_url: ValidatedUrl,
    pub campaign: CampaignConfig,
    pub failure_policy: FailurePolicy,
    pub request_timeout: Duration,
}

impl OutreachConfig {
    /// Resolves a complete run configuration from CLI input and the campaign file.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let crm_token = AccessToken::new(cli.crm_token)?;
        let mail_token = AccessToken::new(cli.mail_token)?;
        let crm_base_url = ValidatedUrl::parse(&cli.crm_base_url)?;
        let mail_base_url = ValidatedUrl::parse(&cli.mail_base_url)?;
        let campaign = CampaignConfig::load(&cli.campaign)?;
        if cli.request_timeout == 0 {
            return Err(AppError::MissingConfiguration(
                "--request-timeout must be at least one second".to_string(),
            ));
        }

        let failure_policy = if cli.isolate_failures {
            FailurePolicy::IsolatePerOrganization
        } else {
            FailurePolicy::FailFast
        };

        Ok(Self {
            crm_token,
            mail_token,
            crm_base_url,
            mail_base_url,
            campaign,
            failure_policy,
            request_timeout: Duration::from_secs(cli.request_timeout),
        })
    }
}
