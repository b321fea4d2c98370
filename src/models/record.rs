//! Request record model
//!
//! Represents a single tracked storefront HTTP call and its lifecycle
//! metadata, from the instant it is issued until it goes stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Convert from string (lossy, defaults to GET)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a tracked request.
///
/// Transitions are monotonic: `Pending -> {Success, Error} -> Stale`.
/// A record never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Issued, no settlement yet
    Pending,
    /// Settled with a response
    Success,
    /// Settled with a transport failure
    Error,
    /// Completed long enough ago that its data may no longer reflect reality
    Stale,
}

impl RequestStatus {
    /// Whether moving to `next` respects the monotonic lifecycle.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Success)
                | (RequestStatus::Pending, RequestStatus::Error)
                | (RequestStatus::Success, RequestStatus::Stale)
        )
    }
}

/// Traffic category derived from the URL allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    CartRead,
    /// A call that changes server-side cart state (add/update/change/clear)
    CartMutation,
    Product,
    Collection,
    Search,
    Recommendations,
    Graphql,
    Variant,
    Localization,
}

impl RequestCategory {
    pub fn is_cart_mutation(&self) -> bool {
        matches!(self, RequestCategory::CartMutation)
    }
}

/// Outgoing request body, preserved with round-trip fidelity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequestBody {
    /// Raw text, sent verbatim
    Raw(String),
    /// Form-encoded key/value pairs
    Form(HashMap<String, String>),
    /// A JSON document
    Json(serde_json::Value),
}

impl RequestBody {
    /// Body rendered for display/storage. Never consumes anything the
    /// caller still needs; every variant is an owned value.
    pub fn as_text(&self) -> String {
        match self {
            RequestBody::Raw(s) => s.clone(),
            RequestBody::Form(map) => {
                let mut pairs: Vec<_> = map.iter().collect();
                pairs.sort_by(|a, b| a.0.cmp(b.0));
                pairs
                    .into_iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&")
            }
            RequestBody::Json(v) => v.to_string(),
        }
    }
}

/// Call-site tag injected by the caller, used for display-level blocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    /// Stable fingerprint of the issuing call site
    pub source_id: String,
    /// Human-readable stack text for the blocklist UI
    pub stack: String,
}

/// One tracked HTTP call captured by the shim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Unique identifier for this record
    pub id: String,

    /// Path + query, as matched against the allow-list
    pub url: String,
    /// Absolute URL as issued
    pub full_url: String,
    /// Short label for list views (e.g. "cart/add.js")
    pub display_name: String,

    pub method: HttpMethod,
    pub category: RequestCategory,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,

    pub status: RequestStatus,
    pub status_code: Option<u16>,

    pub request_body: Option<RequestBody>,
    pub request_headers: HashMap<String, String>,
    pub response_body: Option<String>,
    pub response_headers: Option<HashMap<String, String>>,

    /// Native transport error text, when status is Error
    pub error: Option<String>,

    /// Call-site fingerprint, when the caller supplied an origin tag
    pub source_id: Option<String>,
    pub call_stack: Option<String>,

    // Cart mutations only
    pub cart_before: Option<crate::models::CartSnapshot>,
    pub cart_after: Option<crate::models::CartSnapshot>,
    pub cart_diff: Option<crate::models::CartDiff>,
}

impl RequestRecord {
    /// Create a pending record at the instant a tracked call is issued.
    pub fn pending(
        method: HttpMethod,
        full_url: &str,
        url: &str,
        display_name: &str,
        category: RequestCategory,
        headers: HashMap<String, String>,
        body: Option<RequestBody>,
        origin: Option<&RequestOrigin>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            full_url: full_url.to_string(),
            display_name: display_name.to_string(),
            method,
            category,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            status: RequestStatus::Pending,
            status_code: None,
            request_body: body,
            request_headers: headers,
            response_body: None,
            response_headers: None,
            error: None,
            source_id: origin.map(|o| o.source_id.clone()),
            call_stack: origin.map(|o| o.stack.clone()),
            cart_before: None,
            cart_after: None,
            cart_diff: None,
        }
    }

    /// Whether the record has settled (successfully or not).
    pub fn is_complete(&self) -> bool {
        self.status != RequestStatus::Pending
    }

    /// Copy persisted to durable storage: raw cart snapshots are heavy
    /// and nulled out; the computed diff is kept.
    pub fn trimmed_for_storage(&self) -> Self {
        let mut trimmed = self.clone();
        trimmed.cart_before = None;
        trimmed.cart_after = None;
        trimmed
    }

    /// Get duration as formatted string
    pub fn duration_str(&self) -> String {
        match self.duration_ms {
            Some(ms) if ms < 1000 => format!("{}ms", ms),
            Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
            None => "-".to_string(),
        }
    }
}

/// Filter options for querying the live record list
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordFilter {
    /// Match a specific HTTP method
    pub method: Option<HttpMethod>,
    /// Match a specific traffic category
    pub category: Option<RequestCategory>,
    /// Case-insensitive URL substring
    pub url_contains: Option<String>,
    /// Match a specific lifecycle status
    pub status: Option<RequestStatus>,
}

impl RecordFilter {
    pub fn matches(&self, record: &RequestRecord) -> bool {
        if let Some(method) = self.method {
            if record.method != method {
                return false;
            }
        }
        if let Some(category) = self.category {
            if record.category != category {
                return false;
            }
        }
        if let Some(url) = &self.url_contains {
            if !record
                .url
                .to_ascii_lowercase()
                .contains(&url.to_ascii_lowercase())
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(url: &str, category: RequestCategory) -> RequestRecord {
        RequestRecord::pending(
            HttpMethod::Get,
            &format!("https://shop.example{}", url),
            url,
            url.trim_start_matches('/'),
            category,
            HashMap::new(),
            None,
            None,
        )
    }

    #[test]
    fn status_transitions_are_monotonic() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Success));
        assert!(Pending.can_transition_to(Error));
        assert!(Success.can_transition_to(Stale));

        assert!(!Error.can_transition_to(Stale));
        assert!(!Stale.can_transition_to(Pending));
        assert!(!Success.can_transition_to(Pending));
        assert!(!Stale.can_transition_to(Success));
    }

    #[test]
    fn trimmed_copy_drops_raw_snapshots() {
        let mut record = sample_record("/cart/add.js", RequestCategory::CartMutation);
        record.cart_before = Some(crate::models::CartSnapshot::default());
        record.cart_after = Some(crate::models::CartSnapshot::default());

        let trimmed = record.trimmed_for_storage();
        assert!(trimmed.cart_before.is_none());
        assert!(trimmed.cart_after.is_none());
        assert_eq!(trimmed.id, record.id);
    }

    #[test]
    fn filter_matches_on_all_axes() {
        let mut record = sample_record("/cart.js", RequestCategory::CartRead);
        record.status = RequestStatus::Success;

        let filter = RecordFilter {
            method: Some(HttpMethod::Get),
            category: Some(RequestCategory::CartRead),
            url_contains: Some("CART".into()),
            status: Some(RequestStatus::Success),
        };
        assert!(filter.matches(&record));

        let miss = RecordFilter {
            category: Some(RequestCategory::Product),
            ..Default::default()
        };
        assert!(!miss.matches(&record));
    }

    #[test]
    fn body_text_is_stable_for_forms() {
        let mut map = HashMap::new();
        map.insert("quantity".to_string(), "2".to_string());
        map.insert("id".to_string(), "123".to_string());
        let body = RequestBody::Form(map);
        assert_eq!(body.as_text(), "id=123&quantity=2");
    }
}
