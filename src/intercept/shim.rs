//! Transport shim
//!
//! Decorates the injected transport client. Calls outside the allow-list
//! (or carrying the internal marker) pass straight through; tracked calls
//! get a pending record before the real call is issued and a settlement
//! after. Cart mutations additionally drive two internal snapshot fetches
//! into the diff engine: the "before" fetch completes before the mutation
//! is issued, the "after" fetch only once the mutation succeeded.

use crate::diff::diff_snapshots;
use crate::intercept::classify;
use crate::models::{
    CartLine, CartSnapshot, MutationDeltas, RequestCategory, RequestRecord, RequestStatus,
};
use crate::storage::{RequestRegistry, Settlement};
use crate::transport::{
    Transport, TransportError, TransportRequest, TransportResponse, INTERNAL_MARKER_HEADER,
};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_CART_ENDPOINT: &str = "/cart.js";

pub struct TransportShim {
    inner: Arc<dyn Transport>,
    registry: Arc<RequestRegistry>,
    enabled: AtomicBool,
    cart_endpoint: String,
}

impl TransportShim {
    pub fn new(
        inner: Arc<dyn Transport>,
        registry: Arc<RequestRegistry>,
        cart_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            registry,
            enabled: AtomicBool::new(false),
            cart_endpoint: cart_endpoint.into(),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Promise-style call surface. Untracked calls are a pure
    /// pass-through: no record, no behavioral difference.
    pub async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        if !self.is_enabled() || request.is_internal() {
            return self.inner.send(request).await;
        }
        let Some(category) = classify::classify(&request.url) else {
            return self.inner.send(request).await;
        };
        self.tracked(request, category).await
    }

    /// Callback-style call surface. Honors the internal marker and the
    /// allow-list identically to [`send`](Self::send); the callback fires
    /// on settlement.
    pub fn send_with_callback<F>(self: &Arc<Self>, request: TransportRequest, callback: F)
    where
        F: FnOnce(Result<TransportResponse, TransportError>) + Send + 'static,
    {
        let shim = Arc::clone(self);
        tokio::spawn(async move {
            callback(shim.send(request).await);
        });
    }

    async fn tracked(
        &self,
        request: TransportRequest,
        category: RequestCategory,
    ) -> Result<TransportResponse, TransportError> {
        let record = RequestRecord::pending(
            request.method,
            &request.url,
            &classify::path_and_query(&request.url),
            &classify::display_name(&request.url),
            category,
            request.headers.clone(),
            request.body.clone(),
            request.origin.as_ref(),
        );
        let record_id = record.id.clone();
        tracing::debug!(url = %request.url, category = ?category, "tracking request");
        self.registry.insert(record);

        // The before snapshot must settle before the mutation goes out.
        let cart_before = if category.is_cart_mutation() {
            self.fetch_cart_snapshot(&request.url).await
        } else {
            None
        };

        match self.inner.send(request.clone()).await {
            Ok(response) => {
                let mut cart_after = None;
                let mut cart_diff = None;
                if category.is_cart_mutation() && response.is_success() {
                    let deltas = extract_mutation_deltas(&request, &response);
                    cart_after = self.fetch_cart_snapshot(&request.url).await;
                    if let Some(after) = &cart_after {
                        cart_diff = diff_snapshots(cart_before.as_ref(), after, deltas.as_ref());
                    }
                }
                self.registry.complete(
                    &record_id,
                    RequestStatus::Success,
                    Settlement {
                        status_code: Some(response.status_code),
                        response_headers: Some(response.headers.clone()),
                        response_body: Some(response.body.clone()),
                        error: None,
                        cart_before,
                        cart_after,
                        cart_diff,
                    },
                );
                // The caller gets the same owned response the transport
                // produced; the record only ever saw copies.
                Ok(response)
            }
            Err(e) => {
                self.registry.complete(
                    &record_id,
                    RequestStatus::Error,
                    Settlement {
                        error: Some(e.to_string()),
                        ..Default::default()
                    },
                );
                // The native error propagates to the caller unchanged.
                Err(e)
            }
        }
    }

    /// Internal cart-read fetch. Carries the marker so it can never spawn
    /// a record of its own, and is routed back through `send` so the
    /// guard is the one enforcing that. Any failure degrades to None
    /// (diff unavailable), never to an error.
    fn fetch_cart_snapshot<'a>(&'a self, sibling_url: &'a str) -> BoxFuture<'a, Option<CartSnapshot>> {
        Box::pin(async move {
            let url = cart_url_for(sibling_url, &self.cart_endpoint);
            let request = TransportRequest::get(url)
                .internal()
                .with_header(INTERNAL_MARKER_HEADER, "1");
            match self.send(request).await {
                Ok(response) if response.is_success() => {
                    response.json().as_ref().and_then(CartSnapshot::from_json)
                }
                Ok(response) => {
                    tracing::debug!(status = response.status_code, "cart snapshot fetch rejected");
                    None
                }
                Err(e) => {
                    tracing::debug!("cart snapshot fetch failed: {}", e);
                    None
                }
            }
        })
    }
}

/// Resolve the canonical cart-read URL next to a tracked call's URL.
fn cart_url_for(sibling_url: &str, cart_endpoint: &str) -> String {
    match reqwest::Url::parse(sibling_url) {
        Ok(parsed) => parsed
            .join(cart_endpoint)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| cart_endpoint.to_string()),
        Err(_) => cart_endpoint.to_string(),
    }
}

/// Pull authoritative line deltas out of a mutation response. Only
/// add-style responses carry them: either `{"items": [...]}` or a bare
/// line-item object. Update/change/clear responses return full cart
/// state, which the heuristic diff handles instead.
fn extract_mutation_deltas(
    request: &TransportRequest,
    response: &TransportResponse,
) -> Option<MutationDeltas> {
    let path = classify::path_of(&request.url);
    if !path.ends_with("/cart/add") && !path.ends_with("/cart/add.js") {
        return None;
    }
    let body = response.json()?;
    let added: Vec<CartLine> = match body.get("items").and_then(|v| v.as_array()) {
        Some(items) => items.iter().filter_map(CartLine::from_json).collect(),
        None => CartLine::from_json(&body).into_iter().collect(),
    };
    if added.is_empty() {
        None
    } else {
        Some(MutationDeltas {
            added,
            removed: Vec::new(),
        })
    }
}
