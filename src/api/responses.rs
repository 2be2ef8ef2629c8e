// src/api/responses.rs
//! Wire types of the HubSpot legacy endpoints, and their conversion to the domain model.

use super::pagination::{Cursor, Page};
use crate::error::AppError;
use crate::model::{EngagementMetadata, Organization, Person};
use crate::types::{DealId, OrganizationId, PersonId, StringOrNumber};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Error body shared by HubSpot endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Conversion from wire types to the domain model.
pub trait ToDomain<T> {
    fn to_domain(self) -> Result<T, AppError>;
}

/// `{"value": ...}` wrapper HubSpot puts around every property.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyValue {
    #[serde(default)]
    pub value: Value,
}

impl PropertyValue {
    /// The value as text; numbers and booleans are rendered, null is absent.
    pub fn as_text(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

type Properties = HashMap<String, PropertyValue>;

fn property(properties: &Properties, name: &str) -> Option<String> {
    properties.get(name).and_then(PropertyValue::as_text)
}

fn next_page<T>(items: Vec<T>, has_more: bool, offset: Option<StringOrNumber>) -> Page<T> {
    Page {
        items,
        has_more,
        cursor: offset.map(|o| Cursor::new(o.into_string())),
    }
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompaniesPage {
    #[serde(default)]
    pub companies: Vec<CompanyRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub offset: Option<StringOrNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    pub company_id: OrganizationId,
    #[serde(default)]
    pub properties: Properties,
}

impl CompanyRecord {
    pub fn into_organization(self, name_property: &str, segment_property: &str) -> Organization {
        Organization {
            name: property(&self.properties, name_property).unwrap_or_default(),
            segment_tag: property(&self.properties, segment_property).unwrap_or_default(),
            id: self.company_id,
        }
    }
}

impl CompaniesPage {
    pub fn into_page(self, name_property: &str, segment_property: &str) -> Page<Organization> {
        let organizations = self
            .companies
            .into_iter()
            .map(|c| c.into_organization(name_property, segment_property))
            .collect();
        next_page(organizations, self.has_more, self.offset)
    }
}

// ---------------------------------------------------------------------------
// Company contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyVidsPage {
    #[serde(default)]
    pub vids: Vec<PersonId>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub vid_offset: Option<StringOrNumber>,
}

impl CompanyVidsPage {
    pub fn into_page(self) -> Page<PersonId> {
        next_page(self.vids, self.has_more, self.vid_offset)
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    pub vid: PersonId,
    #[serde(default)]
    pub properties: Properties,
}

impl ToDomain<Person> for ContactProfile {
    fn to_domain(self) -> Result<Person, AppError> {
        let belongs_to = property(&self.properties, "associatedcompanyid")
            .and_then(|raw| OrganizationId::parse(&raw).ok());
        Ok(Person::new(
            self.vid,
            property(&self.properties, "email"),
            property(&self.properties, "firstname"),
            property(&self.properties, "lastname"),
            belongs_to,
        ))
    }
}

// ---------------------------------------------------------------------------
// Deals
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealsPage {
    #[serde(default)]
    pub deals: Vec<DealRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub offset: Option<StringOrNumber>,
}

impl DealsPage {
    pub fn into_page(self) -> Page<DealRecord> {
        next_page(self.deals, self.has_more, self.offset)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRecord {
    pub deal_id: DealId,
    #[serde(default)]
    pub associations: Option<DealAssociations>,
    #[serde(default)]
    pub properties: Properties,
}

impl DealRecord {
    pub fn property(&self, name: &str) -> Option<String> {
        property(&self.properties, name)
    }

    pub fn is_associated_with(&self, organization: &OrganizationId) -> bool {
        self.associations
            .as_ref()
            .is_some_and(|a| a.associated_company_ids.contains(organization))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealAssociations {
    #[serde(default)]
    pub associated_company_ids: Vec<OrganizationId>,
    #[serde(default)]
    pub associated_vids: Vec<PersonId>,
}

#[derive(Debug, Serialize)]
pub struct CreateDealRequest {
    pub associations: DealAssociations,
    pub properties: Vec<NamedProperty>,
}

#[derive(Debug, Serialize)]
pub struct NamedProperty {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDeal {
    #[serde(default)]
    pub deal_id: Value,
}

impl CreatedDeal {
    /// The new deal's id, if the response carried a usable one.
    ///
    /// Missing, null, empty and `0` all count as no identifier.
    pub fn identifier(&self) -> Option<DealId> {
        let raw = match &self.deal_id {
            Value::Number(n) => n.as_u64().filter(|id| *id != 0)?.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return None,
        };
        if raw.is_empty() || raw == "0" {
            return None;
        }
        DealId::parse(&raw).ok()
    }
}

// ---------------------------------------------------------------------------
// Engagements
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateEngagementRequest<'a> {
    pub engagement: EngagementHeader,
    pub associations: EngagementAssociations,
    pub metadata: &'a EngagementMetadata,
}

#[derive(Debug, Serialize)]
pub struct EngagementHeader {
    pub active: bool,
    #[serde(rename = "type")]
    pub kind: crate::model::EngagementKind,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementAssociations {
    pub contact_ids: Vec<PersonId>,
    pub company_ids: Vec<OrganizationId>,
    pub deal_ids: Vec<DealId>,
}
