// tests/common/mod.rs
//! In-memory fakes of the CRM and mail capabilities, sharing one event log.
#![allow(dead_code)]

use async_trait::async_trait;
use crm_outreach::{
    AppError, CampaignConfig, CampaignOrchestrator, CancellationFlag, CrmRepository, Deal, DealId,
    EmailMessage, EngagementMetadata, ManualClock, Notifier, Organization, OrganizationId,
    PacingConfig, Person, PersonId, PipelineId, RateLimiter, StageId, TokioClock,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something a fake observed, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FindOrganizations,
    ListPeople(String),
    GetPerson(String),
    FindDeal(String),
    SendEmail(String),
    CreateDeal(String),
    LogEngagement { organization: String, deal: String },
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn all(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.all().iter().filter(|e| matches(e)).count()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.all().iter().position(|e| e == event)
    }

    pub fn sends(&self) -> usize {
        self.count(|e| matches!(e, Event::SendEmail(_)))
    }
}

pub fn organization(id: &str, name: &str) -> Organization {
    Organization {
        id: OrganizationId::parse(id).unwrap(),
        name: name.to_string(),
        segment_tag: "RADIO".to_string(),
    }
}

pub fn person(id: &str, email: Option<&str>) -> Person {
    Person::new(
        PersonId::parse(id).unwrap(),
        email.map(str::to_string),
        Some("Marie".to_string()),
        Some("Tremblay".to_string()),
        None,
    )
}

/// A CRM whose deals persist for as long as the fake lives, across runs.
#[derive(Default)]
pub struct FakeCrm {
    organizations: Vec<Organization>,
    people: HashMap<String, Vec<Person>>,
    deals: Mutex<Vec<Deal>>,
    next_deal: Mutex<u64>,
    events: EventLog,
    clock: Option<Arc<ManualClock>>,
    lookup_times: Mutex<Vec<Duration>>,
    paginated_people: HashSet<String>,
    failing_deal_creation: HashSet<String>,
    cancel_on_lookup: Option<CancellationFlag>,
}

impl FakeCrm {
    pub fn new(events: &EventLog) -> Self {
        Self {
            events: events.clone(),
            next_deal: Mutex::new(9000),
            ..Self::default()
        }
    }

    pub fn with_organization(mut self, organization: Organization, people: Vec<Person>) -> Self {
        self.people
            .insert(organization.id.as_str().to_string(), people);
        self.organizations.push(organization);
        self
    }

    /// `list_people` for this organization reports more pages than one.
    pub fn with_paginated_people(mut self, organization: &str) -> Self {
        self.paginated_people.insert(organization.to_string());
        self
    }

    /// `create_deal` for this organization succeeds without returning an id.
    pub fn with_failing_deal_creation(mut self, organization: &str) -> Self {
        self.failing_deal_creation.insert(organization.to_string());
        self
    }

    pub fn with_existing_deal(self, organization: &str, pipeline: &str) -> Self {
        self.deals.lock().unwrap().push(Deal {
            id: DealId::parse("1").unwrap(),
            name: "earlier".to_string(),
            organization_id: OrganizationId::parse(organization).unwrap(),
            pipeline_id: PipelineId::parse(pipeline).unwrap(),
            stage_id: None,
        });
        self
    }

    /// Raises `flag` during the first contact lookup, as an interrupt would.
    pub fn cancelling_on_lookup(mut self, flag: CancellationFlag) -> Self {
        self.cancel_on_lookup = Some(flag);
        self
    }

    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn deals(&self) -> Vec<Deal> {
        self.deals.lock().unwrap().clone()
    }

    /// Virtual time of each `get_person` call.
    pub fn lookup_times(&self) -> Vec<Duration> {
        self.lookup_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrmRepository for FakeCrm {
    async fn find_organizations(&self, segment_tag: &str) -> Result<Vec<Organization>, AppError> {
        self.events.push(Event::FindOrganizations);
        Ok(self
            .organizations
            .iter()
            .filter(|o| o.segment_tag == segment_tag)
            .cloned()
            .collect())
    }

    async fn list_people(&self, organization: &OrganizationId) -> Result<Vec<PersonId>, AppError> {
        self.events
            .push(Event::ListPeople(organization.as_str().to_string()));
        if self.paginated_people.contains(organization.as_str()) {
            return Err(AppError::UnsupportedPagination {
                endpoint: format!("companies/v2/companies/{}/vids", organization),
            });
        }
        Ok(self
            .people
            .get(organization.as_str())
            .map(|people| people.iter().map(|p| p.id.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_person(&self, person: &PersonId) -> Result<Person, AppError> {
        self.events.push(Event::GetPerson(person.as_str().to_string()));
        if let Some(clock) = &self.clock {
            self.lookup_times.lock().unwrap().push(clock.elapsed());
        }
        if let Some(flag) = &self.cancel_on_lookup {
            flag.cancel();
        }
        self.people
            .values()
            .flatten()
            .find(|p| &p.id == person)
            .cloned()
            .ok_or_else(|| AppError::MalformedResponse(format!("unknown contact {}", person)))
    }

    async fn find_deal(
        &self,
        organization: &OrganizationId,
        pipeline: &PipelineId,
    ) -> Result<Option<Deal>, AppError> {
        self.events
            .push(Event::FindDeal(organization.as_str().to_string()));
        Ok(self
            .deals
            .lock()
            .unwrap()
            .iter()
            .find(|d| &d.organization_id == organization && &d.pipeline_id == pipeline)
            .cloned())
    }

    async fn create_deal(
        &self,
        organization: &Organization,
        _person: &Person,
        pipeline: &PipelineId,
        stage: &StageId,
    ) -> Result<Deal, AppError> {
        self.events
            .push(Event::CreateDeal(organization.id.as_str().to_string()));
        if self.failing_deal_creation.contains(organization.id.as_str()) {
            return Err(AppError::NoIdentifierReturned { resource: "deal" });
        }

        let id = {
            let mut next = self.next_deal.lock().unwrap();
            *next += 1;
            *next
        };
        let deal = Deal {
            id: DealId::parse(&id.to_string()).unwrap(),
            name: organization.name.clone(),
            organization_id: organization.id.clone(),
            pipeline_id: pipeline.clone(),
            stage_id: Some(stage.clone()),
        };
        self.deals.lock().unwrap().push(deal.clone());
        Ok(deal)
    }

    async fn log_engagement(
        &self,
        organization: &Organization,
        _person: &Person,
        deal: &Deal,
        _metadata: &EngagementMetadata,
    ) -> Result<(), AppError> {
        self.events.push(Event::LogEngagement {
            organization: organization.id.as_str().to_string(),
            deal: deal.id.as_str().to_string(),
        });
        Ok(())
    }
}

/// Records every message; can reject addresses or raise a cancellation after sending.
#[derive(Default)]
pub struct RecordingNotifier {
    events: EventLog,
    sent: Mutex<Vec<EmailMessage>>,
    rejected: HashSet<String>,
    cancel_after_send: Option<CancellationFlag>,
}

impl RecordingNotifier {
    pub fn new(events: &EventLog) -> Self {
        Self {
            events: events.clone(),
            ..Self::default()
        }
    }

    pub fn rejecting(mut self, address: &str) -> Self {
        self.rejected.insert(address.to_string());
        self
    }

    pub fn cancelling_after_send(mut self, flag: CancellationFlag) -> Self {
        self.cancel_after_send = Some(flag);
        self
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), AppError> {
        if self.rejected.contains(&message.to) {
            return Err(AppError::MailRejected {
                recipient: message.to.clone(),
                rejected: 1,
            });
        }
        self.events.push(Event::SendEmail(message.to.clone()));
        self.sent.lock().unwrap().push(message.clone());
        if let Some(flag) = &self.cancel_after_send {
            flag.cancel();
        }
        Ok(())
    }
}

pub const PIPELINE: &str = "3682c689-4605-4437-abde-e0604828bf06";

pub fn campaign() -> CampaignConfig {
    let json = format!(
        r#"{{
            "segment_tag": "RADIO",
            "pipeline_id": "{}",
            "stage_id": "appointmentscheduled",
            "email": {{
                "subject": "Doloréanne: Comme une actrice",
                "html_body": "<p>Bonjour</p>",
                "from_address": "alex@doloreanne.com",
                "from_name": "Alexandre Vézina"
            }}
        }}"#,
        PIPELINE
    );
    CampaignConfig::from_json(&json, Path::new(".")).unwrap()
}

pub fn unpaced() -> Arc<RateLimiter> {
    Arc::new(PacingConfig::none().rate_limiter(Arc::new(TokioClock)))
}

pub fn orchestrator(
    crm: &Arc<FakeCrm>,
    notifier: &Arc<RecordingNotifier>,
    limiter: Arc<RateLimiter>,
) -> CampaignOrchestrator {
    CampaignOrchestrator::new(crm.clone(), notifier.clone(), limiter, campaign())
}
