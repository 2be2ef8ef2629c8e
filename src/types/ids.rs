use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Strong typing for CRM identifiers with phantom types.
///
/// CRM identifiers are opaque: HubSpot happens to hand out integers, but
/// nothing here relies on that beyond echoing numeric ids back as numbers.
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageMarker;

/// Type aliases for specific ID types
pub type OrganizationId = Id<OrganizationMarker>;
pub type PersonId = Id<PersonMarker>;
pub type DealId = Id<DealMarker>;
pub type PipelineId = Id<PipelineMarker>;
pub type StageId = Id<StageMarker>;

impl<T> Id<T> {
    /// Parse an identifier, rejecting values that cannot be placed in a URL path.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let value = normalize_identifier(input)?;
        Ok(Self {
            value,
            _phantom: PhantomData,
        })
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the numeric form when the CRM issued an integer id.
    pub fn as_number(&self) -> Option<u64> {
        // "007" is not the integer 7 as far as the CRM is concerned
        self.value
            .parse::<u64>()
            .ok()
            .filter(|n| n.to_string() == self.value)
    }
}

// Manual impls so the marker type does not need to implement these traits.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.as_number() {
            Some(number) => number.serialize(serializer),
            None => self.value.serialize(serializer),
        }
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = StringOrNumber::deserialize(deserializer)?;
        Self::parse(&raw.into_string()).map_err(serde::de::Error::custom)
    }
}

/// Wire representation of a value the CRM may send as either a string or an integer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    Number(u64),
    Text(String),
}

impl StringOrNumber {
    pub fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Normalize an identifier: trimmed, non-empty, and safe to splice into a path segment.
fn normalize_identifier(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::InvalidId(
            "identifier cannot be empty".to_string(),
        ));
    }

    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '&'))
    {
        return Err(ValidationError::InvalidId(format!(
            "identifier contains characters not allowed in a URL path: {}",
            trimmed
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        let id = OrganizationId::parse("  4211 ").unwrap();
        assert_eq!(id.as_str(), "4211");
        assert_eq!(id.as_number(), Some(4211));

        let id = PipelineId::parse("3682c689-4605-4437-abde-e0604828bf06").unwrap();
        assert_eq!(id.as_number(), None);
    }

    #[test]
    fn test_invalid_ids() {
        assert!(PersonId::parse("").is_err());
        assert!(PersonId::parse("   ").is_err());
        assert!(PersonId::parse("12/34").is_err());
        assert!(PersonId::parse("12 34").is_err());
    }

    #[test]
    fn test_deserialize_from_number_or_string() {
        let from_number: DealId = serde_json::from_str("981").unwrap();
        let from_text: DealId = serde_json::from_str("\"981\"").unwrap();
        assert_eq!(from_number, from_text);
        assert!(serde_json::from_str::<DealId>("\"\"").is_err());
    }

    #[test]
    fn test_numeric_ids_serialize_as_numbers() {
        let numeric = OrganizationId::parse("42").unwrap();
        let opaque = StageId::parse("appointmentscheduled").unwrap();
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&opaque).unwrap(),
            "\"appointmentscheduled\""
        );
    }
}
