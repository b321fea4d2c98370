//! Request replay and editing
//!
//! Turns a captured (optionally user-edited) record back into a new
//! outgoing call. The rebuilt call goes through the transport shim like
//! any other traffic and produces an entirely new, unlinked record.

use crate::intercept::TransportShim;
use crate::models::{HttpMethod, RequestBody, RequestRecord};
use crate::transport::{TransportError, TransportRequest, TransportResponse};
use std::collections::HashMap;

/// User edits applied over a captured record before replaying.
#[derive(Debug, Clone, Default)]
pub struct ReplayEdit {
    /// Override the HTTP method
    pub method: Option<HttpMethod>,
    /// Override the full URL
    pub url: Option<String>,
    /// Replace the header list wholesale
    pub headers: Option<Vec<(String, String)>>,
    /// Replace the body with edited text
    pub body_text: Option<String>,
}

/// Headers that must not be carried into a rebuilt request.
fn strip_hop_headers(headers: &mut HashMap<String, String>) {
    headers.retain(|key, _| {
        !key.eq_ignore_ascii_case("host")
            && !key.eq_ignore_ascii_case("content-length")
            && !key.eq_ignore_ascii_case("transfer-encoding")
    });
}

/// Encode edited body text: JSON is parsed then restringified so the
/// outgoing document is normalized; text that fails to parse is sent raw
/// rather than rejected, so exploratory edits are never blocked.
fn encode_edited_body(text: String) -> RequestBody {
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => RequestBody::Json(value),
        Err(_) => RequestBody::Raw(text),
    }
}

/// Build the outgoing request for a replay without sending it.
pub fn build_replay_request(record: &RequestRecord, edit: ReplayEdit) -> TransportRequest {
    let method = edit.method.unwrap_or(record.method);
    let url = edit.url.unwrap_or_else(|| record.full_url.clone());

    let mut headers: HashMap<String, String> = match edit.headers {
        Some(list) => list.into_iter().collect(),
        None => record.request_headers.clone(),
    };
    strip_hop_headers(&mut headers);

    let body = match edit.body_text {
        Some(text) => Some(encode_edited_body(text)),
        None => record.request_body.clone(),
    };

    let mut request = TransportRequest::new(method, url);
    request.headers = headers;
    request.body = body;
    request
}

/// Replay a captured record through the shim. The response is the new
/// call's own; the record it produced is unlinked from the original.
pub async fn replay_request(
    shim: &TransportShim,
    record: &RequestRecord,
    edit: ReplayEdit,
) -> Result<TransportResponse, TransportError> {
    let request = build_replay_request(record, edit);
    tracing::debug!(url = %request.url, "replaying captured request");
    shim.send(request).await
}

/// Pretty-print body text as JSON. Reports the parse failure without
/// touching the caller's current text.
pub fn format_json_body(text: &str) -> Result<String, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    serde_json::to_string_pretty(&value)
}
