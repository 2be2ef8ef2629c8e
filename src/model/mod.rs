//! Domain model of the outreach run.
//!
//! Every entity here is read from or written to the CRM. The run holds them
//! for one organization's processing cycle at most; nothing is cached.

use crate::types::{DealId, OrganizationId, PersonId, PipelineId, StageId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A company-like CRM entity, the unit of outreach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub segment_tag: String,
}

/// A contact associated with an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Primary organization as reported by the CRM. A back-reference, not ownership.
    pub belongs_to: Option<OrganizationId>,
}

impl Person {
    /// Builds a person, treating blank strings from the CRM as absent.
    pub fn new(
        id: PersonId,
        email: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
        belongs_to: Option<OrganizationId>,
    ) -> Self {
        Self {
            id,
            email: non_blank(email),
            first_name: non_blank(first_name),
            last_name: non_blank(last_name),
            belongs_to,
        }
    }

    /// The address to write to, if this person has a usable one.
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => format!("contact {}", self.id),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// An opportunity record in the CRM.
///
/// A deal for `(organization_id, pipeline_id)` is the witness that the
/// organization was already contacted for this campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub id: DealId,
    pub name: String,
    pub organization_id: OrganizationId,
    pub pipeline_id: PipelineId,
    pub stage_id: Option<StageId>,
}

/// Kind of activity recorded in the CRM audit trail. Outreach only logs emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngagementKind {
    Email,
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Email => "EMAIL",
        };
        write!(f, "{}", label)
    }
}

/// Provider-defined payload attached to an engagement, typed per kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngagementMetadata {
    Email(EmailMetadata),
}

impl EngagementMetadata {
    pub fn kind(&self) -> EngagementKind {
        match self {
            Self::Email(_) => EngagementKind::Email,
        }
    }
}

/// What the CRM shows for a logged email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMetadata {
    pub from: EmailMetadataFrom,
    pub to: Vec<EmailMetadataRecipient>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMetadataFrom {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMetadataRecipient {
    pub email: String,
}

/// Write-only audit entry tying an activity to a deal.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementRecord {
    pub kind: EngagementKind,
    pub deal_id: DealId,
    pub metadata: EngagementMetadata,
}

impl EngagementRecord {
    pub fn new(deal: &Deal, metadata: EngagementMetadata) -> Self {
        Self {
            kind: metadata.kind(),
            deal_id: deal.id.clone(),
            metadata,
        }
    }
}

impl fmt::Display for EngagementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} engagement on deal {}", self.kind, self.deal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(email: Option<&str>) -> Person {
        Person::new(
            PersonId::parse("7").unwrap(),
            email.map(str::to_string),
            Some("Marie".to_string()),
            Some(" ".to_string()),
            None,
        )
    }

    #[test]
    fn blank_fields_become_absent() {
        let p = person(Some("   "));
        assert_eq!(p.email, None);
        assert_eq!(p.last_name, None);
        assert_eq!(p.display_name(), "Marie");
    }

    #[test]
    fn email_is_trimmed() {
        let p = person(Some(" radio@cibl.ca "));
        assert_eq!(p.email(), Some("radio@cibl.ca"));
    }

    #[test]
    fn email_metadata_uses_crm_field_names() {
        let metadata = EngagementMetadata::Email(EmailMetadata {
            from: EmailMetadataFrom {
                email: "alex@doloreanne.com".to_string(),
                first_name: "Alexandre".to_string(),
                last_name: "Vézina".to_string(),
            },
            to: vec![EmailMetadataRecipient {
                email: "radio@cibl.ca".to_string(),
            }],
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
        });

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["from"]["firstName"], "Alexandre");
        assert_eq!(json["to"][0]["email"], "radio@cibl.ca");
        assert_eq!(metadata.kind(), EngagementKind::Email);
        assert_eq!(serde_json::to_value(EngagementKind::Email).unwrap(), "EMAIL");
    }

    #[test]
    fn engagement_record_takes_kind_and_deal() {
        let deal = Deal {
            id: DealId::parse("9001").unwrap(),
            name: "CIBL".to_string(),
            organization_id: OrganizationId::parse("1").unwrap(),
            pipeline_id: PipelineId::parse("default").unwrap(),
            stage_id: None,
        };
        let metadata = EngagementMetadata::Email(EmailMetadata {
            from: EmailMetadataFrom {
                email: "alex@doloreanne.com".to_string(),
                first_name: "Alexandre".to_string(),
                last_name: String::new(),
            },
            to: vec![],
            subject: "Hello".to_string(),
            html: String::new(),
        });

        let record = EngagementRecord::new(&deal, metadata.clone());

        assert_eq!(record.kind, EngagementKind::Email);
        assert_eq!(record.deal_id, deal.id);
        assert_eq!(record.metadata, metadata);
        assert_eq!(record.to_string(), "EMAIL engagement on deal 9001");
    }
}
