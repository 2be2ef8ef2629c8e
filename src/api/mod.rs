// src/api/mod.rs
//! CRM interaction: the ability to read and write outreach state.
//!
//! Business logic depends on [`CrmRepository`], never on HTTP details.
//! Pagination and pacing are shared with the mail client.

pub mod client;
mod hubspot;
mod pagination;
pub mod parser;
mod rate_limit;
mod responses;

use crate::error::AppError;
use crate::model::{Deal, EngagementMetadata, Organization, Person};
use crate::types::{OrganizationId, PersonId, PipelineId, StageId};

/// The CRM operations an outreach run needs.
///
/// # Laws
///
/// - `find_deal(org, pipeline)` returns `Some` after a successful
///   `create_deal(org, _, pipeline, _)`, in this run or any later one.
/// - `list_people` never returns a partial list: if the CRM has more
///   contacts than one page, it fails with `UnsupportedPagination`.
/// - No operation retries; every failure reaches the caller.
#[async_trait::async_trait]
pub trait CrmRepository: Send + Sync {
    /// All organizations whose segment tag equals `segment_tag`, in CRM order.
    async fn find_organizations(&self, segment_tag: &str) -> Result<Vec<Organization>, AppError>;

    async fn list_people(&self, organization: &OrganizationId) -> Result<Vec<PersonId>, AppError>;

    async fn get_person(&self, person: &PersonId) -> Result<Person, AppError>;

    /// The first deal in `pipeline` associated with `organization`, if any.
    async fn find_deal(
        &self,
        organization: &OrganizationId,
        pipeline: &PipelineId,
    ) -> Result<Option<Deal>, AppError>;

    /// Records the outreach witness. Fails with `NoIdentifierReturned`
    /// when the CRM accepts the deal but does not say which id it got.
    async fn create_deal(
        &self,
        organization: &Organization,
        person: &Person,
        pipeline: &PipelineId,
        stage: &StageId,
    ) -> Result<Deal, AppError>;

    async fn log_engagement(
        &self,
        organization: &Organization,
        person: &Person,
        deal: &Deal,
        metadata: &EngagementMetadata,
    ) -> Result<(), AppError>;
}

// Re-export the public interface
pub use client::{extract_response_text, AuthScheme, ServiceHttpClient};
pub use hubspot::HubspotClient;
pub use pagination::{Continuation, Cursor, Page, PageRequest, PagedFetcher};
pub use rate_limit::{Clock, ManualClock, RateLimiter, ServiceKey, TokioClock};
