// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the outreach
//! run paces itself and how much it asks of each external service.

// ---------------------------------------------------------------------------
// CRM (HubSpot) boundaries
// ---------------------------------------------------------------------------

/// Default base URL of the HubSpot API.
pub const HUBSPOT_API_BASE_URL: &str = "https://api.hubapi.com";

/// How many companies or deals the legacy paged endpoints return per call.
///
/// 250 is the documented maximum for both endpoints. Using it keeps the
/// full deal scan done for every organization as short as possible.
pub const HUBSPOT_PAGE_SIZE: u32 = 250;

/// How many contact ids the company contacts endpoint returns per call.
///
/// 100 is that endpoint's maximum `count`. Contacts are never paged past the
/// first call, so an organization with more contacts fails closed.
pub const HUBSPOT_COMPANY_CONTACTS_PAGE_SIZE: u32 = 100;

/// Company property that carries the display name.
pub const HUBSPOT_COMPANY_NAME_PROPERTY: &str = "name";

/// Company property that carries the segment tag, unless the campaign overrides it.
pub const DEFAULT_SEGMENT_PROPERTY: &str = "type";

// ---------------------------------------------------------------------------
// Mail provider (SparkPost) boundaries
// ---------------------------------------------------------------------------

/// Default base URL of the SparkPost API.
pub const SPARKPOST_API_BASE_URL: &str = "https://api.sparkpost.com";

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Minimum gap between two organizations in the outer campaign loop.
pub const DEFAULT_ORGANIZATION_INTERVAL_MS: u64 = 1_000;

/// Minimum gap between two contact lookups while resolving an organization's people.
pub const DEFAULT_PERSON_LOOKUP_INTERVAL_MS: u64 = 133;

/// Minimum gap between any two CRM HTTP calls.
///
/// HubSpot allows 100 requests per 10 seconds for private apps; one call
/// every 100 ms stays under that without a token bucket.
pub const DEFAULT_CRM_INTERVAL_MS: u64 = 100;

/// Minimum gap between two mail provider calls.
pub const DEFAULT_MAIL_INTERVAL_MS: u64 = 0;

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Upper bound on a single HTTP exchange, connect included.
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on establishing the TCP/TLS connection.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters kept when quoting error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 500;
