// src/campaign/report.rs
//! What a run did, for the operator and for the exit status.

use super::state::{OrganizationState, SkipReason};
use crate::error::AppError;
use std::fmt;

/// Exit status of a run stopped by the operator.
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// Counters accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub organizations_seen: usize,
    pub notifications_sent: usize,
    pub skipped_existing_deal: usize,
    pub skipped_no_contacts: usize,
    pub skipped_no_email: usize,
    pub failed: usize,
}

impl RunTally {
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NoContacts => self.skipped_no_contacts += 1,
            SkipReason::AlreadyContacted => self.skipped_existing_deal += 1,
            SkipReason::NoEmail => self.skipped_no_email += 1,
        }
    }

    /// Counts a state reached by the run. Only sends and skips are counted.
    pub fn record(&mut self, state: OrganizationState) {
        match state {
            OrganizationState::Skipped(reason) => self.record_skip(reason),
            OrganizationState::Notified => self.notifications_sent += 1,
            _ => {}
        }
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24}{}", "organizations seen:", self.organizations_seen)?;
        writeln!(f, "{:<24}{}", "notifications sent:", self.notifications_sent)?;
        writeln!(f, "{:<24}{}", "skipped, existing deal:", self.skipped_existing_deal)?;
        writeln!(f, "{:<24}{}", "skipped, no contacts:", self.skipped_no_contacts)?;
        writeln!(f, "{:<24}{}", "skipped, no email:", self.skipped_no_email)?;
        write!(f, "{:<24}{}", "failed:", self.failed)
    }
}

/// How the run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every organization was processed (some may have failed in isolation).
    Completed,
    /// The cancellation flag was raised.
    Cancelled,
    /// The run stopped on its first failure.
    Aborted(AppError),
}

#[derive(Debug)]
pub struct RunReport {
    pub tally: RunTally,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn completed(tally: RunTally) -> Self {
        Self {
            tally,
            outcome: RunOutcome::Completed,
        }
    }

    pub fn cancelled(tally: RunTally) -> Self {
        Self {
            tally,
            outcome: RunOutcome::Cancelled,
        }
    }

    pub fn aborted(tally: RunTally, error: AppError) -> Self {
        Self {
            tally,
            outcome: RunOutcome::Aborted(error),
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match &self.outcome {
            RunOutcome::Aborted(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, RunOutcome::Cancelled)
    }

    /// Process exit status for this run.
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            RunOutcome::Completed if self.tally.failed == 0 => 0,
            RunOutcome::Completed => 1,
            RunOutcome::Cancelled => CANCELLED_EXIT_CODE,
            RunOutcome::Aborted(error) => error.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_display() {
        let tally = RunTally {
            organizations_seen: 12,
            notifications_sent: 4,
            skipped_existing_deal: 5,
            skipped_no_contacts: 2,
            skipped_no_email: 1,
            failed: 0,
        };

        insta::assert_snapshot!(tally.to_string(), @r###"
        organizations seen:     12
        notifications sent:     4
        skipped, existing deal: 5
        skipped, no contacts:   2
        skipped, no email:      1
        failed:                 0
        "###);
    }

    #[test]
    fn states_are_counted() {
        let mut tally = RunTally::default();
        tally.record(OrganizationState::Skipped(SkipReason::AlreadyContacted));
        tally.record(OrganizationState::Notified);
        tally.record(OrganizationState::DealRecorded);

        assert_eq!(tally.skipped_existing_deal, 1);
        assert_eq!(tally.notifications_sent, 1);
    }

    #[test]
    fn exit_codes() {
        let mut tally = RunTally::default();
        assert_eq!(RunReport::completed(tally.clone()).exit_code(), 0);
        assert_eq!(RunReport::cancelled(tally.clone()).exit_code(), 130);

        tally.failed = 2;
        assert_eq!(RunReport::completed(tally.clone()).exit_code(), 1);

        let report = RunReport::aborted(tally, AppError::NoIdentifierReturned { resource: "deal" });
        assert_eq!(report.exit_code(), 6);
        assert!(report.error().is_some());
    }
}
