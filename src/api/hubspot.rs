// src/api/hubspot.rs
//! HubSpot implementation of [`CrmRepository`] over the legacy v1/v2 endpoints.

use super::client::{extract_response_text, AuthScheme, ServiceHttpClient};
use super::pagination::{Cursor, Page, PageRequest, PagedFetcher};
use super::parser::{expect_success, parse_api_response};
use super::rate_limit::{RateLimiter, ServiceKey};
use super::responses::{
    CompaniesPage, CompanyVidsPage, ContactProfile, CreateDealRequest, CreateEngagementRequest,
    CreatedDeal, DealAssociations, DealRecord, DealsPage, EngagementAssociations,
    EngagementHeader, NamedProperty, ToDomain,
};
use super::CrmRepository;
use crate::constants::{
    DEFAULT_SEGMENT_PROPERTY, HUBSPOT_COMPANY_CONTACTS_PAGE_SIZE, HUBSPOT_COMPANY_NAME_PROPERTY,
    HUBSPOT_PAGE_SIZE,
};
use crate::error::{AppError, ExternalService};
use crate::model::{Deal, EngagementMetadata, Organization, Person};
use crate::types::{AccessToken, OrganizationId, PersonId, PipelineId, StageId, ValidatedUrl};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;

const COMPANIES_ENDPOINT: &str = "companies/v2/companies/paged";
const DEALS_ENDPOINT: &str = "deals/v1/deal/paged";
const CREATE_DEAL_ENDPOINT: &str = "deals/v1/deal";
const ENGAGEMENTS_ENDPOINT: &str = "engagements/v1/engagements";

/// HubSpot CRM client. Every request waits on [`ServiceKey::Crm`].
#[derive(Clone)]
pub struct HubspotClient {
    http: ServiceHttpClient,
    segment_property: String,
}

impl HubspotClient {
    pub fn new(
        token: &AccessToken,
        base_url: ValidatedUrl,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, AppError> {
        let http = ServiceHttpClient::new(
            ExternalService::Crm,
            token,
            AuthScheme::Bearer,
            base_url,
            limiter,
            ServiceKey::Crm,
        )?;
        Ok(Self {
            http,
            segment_property: DEFAULT_SEGMENT_PROPERTY.to_string(),
        })
    }

    /// Reads the segment tag from `property` instead of the default company type.
    pub fn with_segment_property(mut self, property: impl Into<String>) -> Self {
        self.segment_property = property.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_request_timeout(timeout);
        self
    }

    fn offset_query(request: &PageRequest) -> (&'static str, String) {
        let offset = request
            .cursor
            .as_ref()
            .map(Cursor::as_str)
            .unwrap_or("0")
            .to_string();
        ("offset", offset)
    }

    async fn companies_page(&self, request: PageRequest) -> Result<Page<Organization>, AppError> {
        let query = [
            ("limit", request.page_size.to_string()),
            Self::offset_query(&request),
            ("properties", HUBSPOT_COMPANY_NAME_PROPERTY.to_string()),
            ("properties", self.segment_property.clone()),
        ];
        let response = self.http.get(COMPANIES_ENDPOINT, &query).await?;
        let result = extract_response_text(ExternalService::Crm, response).await?;
        let page: CompaniesPage = parse_api_response(result)?;
        Ok(page.into_page(HUBSPOT_COMPANY_NAME_PROPERTY, &self.segment_property))
    }

    async fn vids_page(
        &self,
        endpoint: &str,
        request: PageRequest,
    ) -> Result<Page<PersonId>, AppError> {
        let mut query = vec![("count", request.page_size.to_string())];
        if let Some(cursor) = &request.cursor {
            query.push(("vidOffset", cursor.as_str().to_string()));
        }
        let response = self.http.get(endpoint, &query).await?;
        let result = extract_response_text(ExternalService::Crm, response).await?;
        let page: CompanyVidsPage = parse_api_response(result)?;
        Ok(page.into_page())
    }

    async fn deals_page(&self, request: PageRequest) -> Result<Page<DealRecord>, AppError> {
        let query = [
            ("includeAssociations", "true".to_string()),
            ("limit", request.page_size.to_string()),
            ("properties", "dealname".to_string()),
            ("properties", "pipeline".to_string()),
            ("properties", "dealstage".to_string()),
            Self::offset_query(&request),
        ];
        let response = self.http.get(DEALS_ENDPOINT, &query).await?;
        let result = extract_response_text(ExternalService::Crm, response).await?;
        let page: DealsPage = parse_api_response(result)?;
        Ok(page.into_page())
    }
}

#[async_trait::async_trait]
impl CrmRepository for HubspotClient {
    async fn find_organizations(&self, segment_tag: &str) -> Result<Vec<Organization>, AppError> {
        let organizations = PagedFetcher::new(COMPANIES_ENDPOINT, HUBSPOT_PAGE_SIZE)
            .collect_all(|request| self.companies_page(request))
            .await?;
        let total = organizations.len();

        let matching: Vec<Organization> = organizations
            .into_iter()
            .filter(|org| org.segment_tag == segment_tag)
            .collect();

        log::info!(
            "{} of {} companies have {} = {}",
            matching.len(),
            total,
            self.segment_property,
            segment_tag
        );
        Ok(matching)
    }

    async fn list_people(&self, organization: &OrganizationId) -> Result<Vec<PersonId>, AppError> {
        let endpoint = format!("companies/v2/companies/{}/vids", organization);
        PagedFetcher::single_page(endpoint.clone(), HUBSPOT_COMPANY_CONTACTS_PAGE_SIZE)
            .collect_all(|request| self.vids_page(&endpoint, request))
            .await
    }

    async fn get_person(&self, person: &PersonId) -> Result<Person, AppError> {
        let endpoint = format!("contacts/v1/contact/vid/{}/profile", person);
        let response = self.http.get(&endpoint, &[]).await?;
        let result = extract_response_text(ExternalService::Crm, response).await?;
        let profile: ContactProfile = parse_api_response(result)?;
        profile.to_domain()
    }

    async fn find_deal(
        &self,
        organization: &OrganizationId,
        pipeline: &PipelineId,
    ) -> Result<Option<Deal>, AppError> {
        let pages = PagedFetcher::new(DEALS_ENDPOINT, HUBSPOT_PAGE_SIZE)
            .stream(|request| self.deals_page(request));
        futures::pin_mut!(pages);

        while let Some(deals) = pages.try_next().await? {
            let found = deals.into_iter().find(|deal| {
                deal.property("pipeline").as_deref() == Some(pipeline.as_str())
                    && deal.is_associated_with(organization)
            });

            if let Some(record) = found {
                log::debug!("Deal {} already exists for company {}", record.deal_id, organization);
                return Ok(Some(Deal {
                    name: record.property("dealname").unwrap_or_default(),
                    stage_id: record
                        .property("dealstage")
                        .and_then(|s| StageId::parse(&s).ok()),
                    id: record.deal_id,
                    organization_id: organization.clone(),
                    pipeline_id: pipeline.clone(),
                }));
            }
        }

        Ok(None)
    }

    async fn create_deal(
        &self,
        organization: &Organization,
        person: &Person,
        pipeline: &PipelineId,
        stage: &StageId,
    ) -> Result<Deal, AppError> {
        let request = CreateDealRequest {
            associations: DealAssociations {
                associated_company_ids: vec![organization.id.clone()],
                associated_vids: vec![person.id.clone()],
            },
            properties: vec![
                NamedProperty {
                    name: "dealname",
                    value: organization.name.clone(),
                },
                NamedProperty {
                    name: "pipeline",
                    value: pipeline.to_string(),
                },
                NamedProperty {
                    name: "dealstage",
                    value: stage.to_string(),
                },
            ],
        };

        let response = self.http.post(CREATE_DEAL_ENDPOINT, &request).await?;
        let result = extract_response_text(ExternalService::Crm, response).await?;
        let created: CreatedDeal = parse_api_response(result)?;
        let id = created
            .identifier()
            .ok_or(AppError::NoIdentifierReturned { resource: "deal" })?;

        Ok(Deal {
            id,
            name: organization.name.clone(),
            organization_id: organization.id.clone(),
            pipeline_id: pipeline.clone(),
            stage_id: Some(stage.clone()),
        })
    }

    async fn log_engagement(
        &self,
        organization: &Organization,
        person: &Person,
        deal: &Deal,
        metadata: &EngagementMetadata,
    ) -> Result<(), AppError> {
        let request = CreateEngagementRequest {
            engagement: EngagementHeader {
                active: true,
                kind: metadata.kind(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
            associations: EngagementAssociations {
                contact_ids: vec![person.id.clone()],
                company_ids: vec![organization.id.clone()],
                deal_ids: vec![deal.id.clone()],
            },
            metadata,
        };

        let response = self.http.post(ENGAGEMENTS_ENDPOINT, &request).await?;
        let result = extract_response_text(ExternalService::Crm, response).await?;
        expect_success(result)
    }
}
