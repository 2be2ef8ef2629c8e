// src/campaign/mod.rs
//! The outreach run: at most one email per organization, ever.
//!
//! The deal created after a send is the witness that an organization was
//! contacted. It lives in the CRM, so the guarantee holds across runs
//! without any local state.

mod report;
mod selection;
mod state;

pub use report::{RunOutcome, RunReport, RunTally, CANCELLED_EXIT_CODE};
pub use selection::select_contact;
pub use state::{OrganizationState, SkipReason};

use crate::api::{CrmRepository, RateLimiter, ServiceKey};
use crate::config::CampaignConfig;
use crate::error::AppError;
use crate::mail::Notifier;
use crate::model::{EngagementRecord, Organization, Person};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What to do when processing one organization fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run on the first error.
    #[default]
    FailFast,
    /// Log the error, count it, and move on to the next organization.
    IsolatePerOrganization,
}

/// Cooperative stop signal, checked between organizations and between people.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Progress {
    Finished(OrganizationState),
    Interrupted,
}

/// Drives one campaign over every organization in its segment.
pub struct CampaignOrchestrator {
    crm: Arc<dyn CrmRepository>,
    notifier: Arc<dyn Notifier>,
    limiter: Arc<RateLimiter>,
    campaign: CampaignConfig,
    policy: FailurePolicy,
    cancellation: CancellationFlag,
}

impl CampaignOrchestrator {
    pub fn new(
        crm: Arc<dyn CrmRepository>,
        notifier: Arc<dyn Notifier>,
        limiter: Arc<RateLimiter>,
        campaign: CampaignConfig,
    ) -> Self {
        Self {
            crm,
            notifier,
            limiter,
            campaign,
            policy: FailurePolicy::default(),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// A handle that stops the run when cancelled.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Runs the campaign to completion, cancellation or first failure.
    ///
    /// Never returns early without a tally: errors are carried in the report.
    pub async fn run(&self) -> RunReport {
        let mut tally = RunTally::default();

        let organizations = match self.crm.find_organizations(&self.campaign.segment_tag).await {
            Ok(organizations) => organizations,
            Err(err) => {
                log::error!("Could not list organizations: {}", err);
                return RunReport::aborted(tally, err);
            }
        };
        log::info!(
            "{} organization(s) in segment {}",
            organizations.len(),
            self.campaign.segment_tag
        );

        for organization in &organizations {
            if self.cancellation.is_cancelled() {
                log::warn!("Run cancelled before {}", organization.name);
                return RunReport::cancelled(tally);
            }

            self.limiter.wait(ServiceKey::Organization).await;
            tally.organizations_seen += 1;
            log::debug!("Processing company '{}' ({})", organization.name, organization.id);

            match self.process(organization, &mut tally).await {
                Ok(Progress::Finished(state)) => {
                    log::debug!("'{}' finished as {:?}", organization.name, state);
                }
                Ok(Progress::Interrupted) => {
                    log::warn!("Run cancelled while processing {}", organization.name);
                    return RunReport::cancelled(tally);
                }
                Err(err) => match self.policy {
                    FailurePolicy::FailFast => {
                        log::error!("Stopping at '{}': {}", organization.name, err);
                        return RunReport::aborted(tally, err);
                    }
                    FailurePolicy::IsolatePerOrganization => {
                        log::error!("Skipping '{}' after failure: {}", organization.name, err);
                        tally.failed += 1;
                    }
                },
            }
        }

        RunReport::completed(tally)
    }

    async fn process(
        &self,
        organization: &Organization,
        tally: &mut RunTally,
    ) -> Result<Progress, AppError> {
        let mut state = OrganizationState::Discovered;

        let Some(people) = self.resolve_people(organization).await? else {
            return Ok(Progress::Interrupted);
        };
        if people.is_empty() {
            log::info!("'{}' has no contacts", organization.name);
            return self.skip(&mut state, SkipReason::NoContacts, tally);
        }
        state.advance(OrganizationState::PeopleResolved)?;

        let pipeline = &self.campaign.pipeline_id;
        if let Some(deal) = self.crm.find_deal(&organization.id, pipeline).await? {
            log::info!(
                "'{}' already contacted (deal {} in pipeline {})",
                organization.name,
                deal.id,
                pipeline
            );
            return self.skip(&mut state, SkipReason::AlreadyContacted, tally);
        }
        state.advance(OrganizationState::IdempotencyChecked)?;

        let Some((contact, address)) =
            select_contact(&people).and_then(|p| p.email().map(|email| (p, email)))
        else {
            log::warn!(
                "'{}' has {} contact(s) but none with an email address",
                organization.name,
                people.len()
            );
            return self.skip(&mut state, SkipReason::NoEmail, tally);
        };

        self.notifier
            .send_email(&self.campaign.email.message_to(address))
            .await?;
        state.advance(OrganizationState::Notified)?;
        tally.record(state);
        log::info!("Sent outreach to {} for '{}'", address, organization.name);

        let deal = self
            .crm
            .create_deal(organization, contact, pipeline, &self.campaign.stage_id)
            .await
            .map_err(|err| {
                log::error!(
                    "Email to {} was sent but no deal was recorded for '{}'; it will be contacted again on the next run",
                    address,
                    organization.name
                );
                err
            })?;
        state.advance(OrganizationState::DealRecorded)?;

        let record = EngagementRecord::new(&deal, self.campaign.email.engagement_metadata(address));
        self.crm
            .log_engagement(organization, contact, &deal, &record.metadata)
            .await
            .map_err(|err| {
                log::error!(
                    "Deal {} recorded for '{}' but the email engagement was not logged",
                    deal.id,
                    organization.name
                );
                err
            })?;
        state.advance(OrganizationState::EngagementLogged)?;
        log::info!("Logged {} for '{}'", record, organization.name);

        Ok(Progress::Finished(state))
    }

    /// Lists and looks up every contact. `None` if cancelled midway.
    async fn resolve_people(
        &self,
        organization: &Organization,
    ) -> Result<Option<Vec<Person>>, AppError> {
        let ids = self.crm.list_people(&organization.id).await?;
        let mut people = Vec::with_capacity(ids.len());

        for id in &ids {
            if self.cancellation.is_cancelled() {
                return Ok(None);
            }
            self.limiter.wait(ServiceKey::PersonLookup).await;
            people.push(self.crm.get_person(id).await?);
        }

        Ok(Some(people))
    }

    fn skip(
        &self,
        state: &mut OrganizationState,
        reason: SkipReason,
        tally: &mut RunTally,
    ) -> Result<Progress, AppError> {
        state.advance(OrganizationState::Skipped(reason))?;
        tally.record(*state);
        Ok(Progress::Finished(*state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_fast_is_the_default() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::FailFast);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
