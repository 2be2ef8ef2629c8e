// src/lib.rs
//! crm-outreach library: idempotent, paced email outreach driven by CRM state.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ApiErrorCode`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `OutreachConfig`, `CampaignConfig`
//! - **Domain model**: `Organization`, `Person`, `Deal`, `EngagementMetadata`
//! - **Domain types**: `OrganizationId`, `PersonId`, `AccessToken`, etc.
//! - **CRM client**: `CrmRepository`, `HubspotClient`, `PagedFetcher`, `RateLimiter`
//! - **Mail**: `Notifier`, `SparkPostNotifier`
//! - **Campaign**: `CampaignOrchestrator`, `RunReport`

mod api;
mod campaign;
mod config;
mod constants;
mod error;
mod mail;
mod model;
mod types;

// --- Error Handling ---
pub use crate::error::{ApiErrorCode, AppError, ExternalService, Result};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{
    CampaignConfig, CommandLineInput, EmailTemplate, EmailTemplateConfig, OutreachConfig,
    PacingConfig,
};

// --- Domain Model ---
pub use crate::model::{
    Deal, EmailMetadata, EmailMetadataFrom, EmailMetadataRecipient, EngagementKind,
    EngagementMetadata, EngagementRecord, Organization, Person,
};

// --- Domain Types ---
pub use crate::types::{
    AccessToken, DealId, EmailAddress, Id, OrganizationId, PersonId, PipelineId, StageId,
    StringOrNumber, ValidatedUrl,
};

// --- CRM Client ---
pub use crate::api::{
    Clock, Continuation, CrmRepository, Cursor, HubspotClient, ManualClock, Page, PageRequest,
    PagedFetcher, RateLimiter, ServiceKey, TokioClock,
};

// --- Mail ---
pub use crate::mail::{EmailMessage, Notifier, Sender, SparkPostNotifier};

// --- Campaign ---
pub use crate::campaign::{
    select_contact, CampaignOrchestrator, CancellationFlag, FailurePolicy, OrganizationState,
    RunOutcome, RunReport, RunTally, SkipReason, CANCELLED_EXIT_CODE,
};
