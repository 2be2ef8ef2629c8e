// src/campaign/state.rs
//! Forward-only processing state of one organization.

use crate::error::AppError;
use std::fmt;

/// Why an organization was left alone. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The CRM lists no contacts for it.
    NoContacts,
    /// A deal already exists in the campaign pipeline.
    AlreadyContacted,
    /// None of its contacts has an email address.
    NoEmail,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContacts => write!(f, "no contacts"),
            Self::AlreadyContacted => write!(f, "already contacted"),
            Self::NoEmail => write!(f, "no contact with an email address"),
        }
    }
}

/// Where one organization stands in the outreach cycle.
///
/// ```text
/// Discovered -> PeopleResolved -> IdempotencyChecked -> Notified -> DealRecorded -> EngagementLogged
///      |              |                   |
///      +-> Skipped    +-> Skipped         +-> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationState {
    Discovered,
    PeopleResolved,
    IdempotencyChecked,
    Skipped(SkipReason),
    Notified,
    DealRecorded,
    EngagementLogged,
}

impl OrganizationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped(_) | Self::EngagementLogged)
    }

    /// Whether `next` is one step forward from `self`.
    pub fn can_advance_to(&self, next: OrganizationState) -> bool {
        use OrganizationState::*;
        matches!(
            (*self, next),
            (Discovered, PeopleResolved)
                | (Discovered, Skipped(SkipReason::NoContacts))
                | (PeopleResolved, IdempotencyChecked)
                | (PeopleResolved, Skipped(SkipReason::AlreadyContacted))
                | (IdempotencyChecked, Notified)
                | (IdempotencyChecked, Skipped(SkipReason::NoEmail))
                | (Notified, DealRecorded)
                | (DealRecorded, EngagementLogged)
        )
    }

    pub fn advance(&mut self, next: OrganizationState) -> Result<(), AppError> {
        if !self.can_advance_to(next) {
            return Err(AppError::InternalError {
                message: format!("illegal outreach transition {:?} -> {:?}", self, next),
                source: None,
            });
        }
        *self = next;
        Ok(())
    }
}
