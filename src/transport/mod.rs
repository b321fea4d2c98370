//! Transport abstraction
//!
//! The shim never touches a process-wide HTTP primitive. Instead it wraps
//! an injected [`Transport`] client; [`ReqwestTransport`] is the
//! production implementation and tests script their own.

use crate::models::{HttpMethod, RequestBody, RequestOrigin};
use futures::future::BoxFuture;
use std::collections::HashMap;
use thiserror::Error;

/// Header sentinel marking a call as internal/untracked. The engine's own
/// auxiliary snapshot fetches carry it so they never spawn records. Both
/// call surfaces of the shim honor it identically.
pub const INTERNAL_MARKER_HEADER: &str = "x-inspector-internal";

/// Transport-level failure. Carries the native error text unchanged so
/// the caller sees exactly what the underlying client reported.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// An outgoing call as seen by the shim.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<RequestBody>,
    /// Explicit internal/untracked flag (option form of the marker)
    pub internal: bool,
    /// Call-site tag resolved by the caller, for display-level blocking
    pub origin: Option<RequestOrigin>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            internal: false,
            origin: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_origin(mut self, origin: RequestOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Mark this call as internal: it bypasses tracking entirely.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Whether the call is flagged untracked, via the struct flag or the
    /// header sentinel.
    pub fn is_internal(&self) -> bool {
        self.internal
            || self
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case(INTERNAL_MARKER_HEADER))
    }
}

/// The settled response of a transport call. Owned values throughout, so
/// handing a copy to the record never consumes anything the caller needs.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Parse the body as JSON; None on parse failure, never an error.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Injected transport client the shim decorates.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, TransportError>>;
}

/// Production transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
                HttpMethod::Put => reqwest::Method::PUT,
                HttpMethod::Patch => reqwest::Method::PATCH,
                HttpMethod::Delete => reqwest::Method::DELETE,
                HttpMethod::Head => reqwest::Method::HEAD,
                HttpMethod::Options => reqwest::Method::OPTIONS,
            };

            let mut builder = client.request(method, &request.url);

            // The internal sentinel is shim-local; never put it on the wire.
            for (key, value) in &request.headers {
                if key.eq_ignore_ascii_case(INTERNAL_MARKER_HEADER) {
                    continue;
                }
                if let Ok(name) = reqwest::header::HeaderName::try_from(key.as_str()) {
                    if let Ok(val) = reqwest::header::HeaderValue::from_str(value) {
                        builder = builder.header(name, val);
                    }
                }
            }

            match &request.body {
                Some(RequestBody::Raw(text)) => builder = builder.body(text.clone()),
                Some(RequestBody::Form(map)) => builder = builder.form(map),
                Some(RequestBody::Json(value)) => builder = builder.json(value),
                None => {}
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let status_code = response.status().as_u16();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            Ok(TransportResponse {
                status_code,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_marker_honored_as_flag_and_header() {
        let plain = TransportRequest::get("https://shop.example/cart.js");
        assert!(!plain.is_internal());

        let flagged = TransportRequest::get("https://shop.example/cart.js").internal();
        assert!(flagged.is_internal());

        let via_header = TransportRequest::get("https://shop.example/cart.js")
            .with_header("X-Inspector-Internal", "1");
        assert!(via_header.is_internal());
    }

    #[test]
    fn response_json_is_lossy() {
        let response = TransportResponse {
            status_code: 200,
            headers: HashMap::new(),
            body: "not json".to_string(),
        };
        assert!(response.json().is_none());
        assert!(response.is_success());
    }
}
