//! Request correlation for the contacts API.
//!
//! Every request leaves the ingress with an `x-request-id` (the client's, or
//! a generated nanoid), stored in the request extensions as [`XRequestId`]
//! and echoed on the response. The per-request span carries that id together
//! with the route, the contact id being addressed and the outcome.

use std::time::Duration;

use axum::http::{HeaderName, Request, Response};
use axum::{body::Body, middleware::Next};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{MakeRequestId, RequestId};
use tower_http::trace::{DefaultOnRequest, TraceLayer};
use tracing::{field::Empty, Span};

const CONTACTS_PREFIX: &str = "/api/contacts/";

/// Request id as seen by handlers.
#[derive(Clone, Debug)]
pub struct XRequestId(pub String);

pub fn header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

#[derive(Clone, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// Copy the (already set) `x-request-id` header into the request extensions.
pub async fn push_req_id_to_extensions(
    mut req: Request<Body>,
    next: Next,
) -> axum::response::Response {
    let rid = req
        .headers()
        .get(header())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("n/a")
        .to_owned();
    req.extensions_mut().insert(XRequestId(rid));
    next.run(req).await
}

/// Contact id addressed by `/api/contacts/{id}`, if any.
fn contact_id(path: &str) -> Option<&str> {
    path.strip_prefix(CONTACTS_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

fn request_span(req: &Request<Body>) -> Span {
    let rid = req
        .extensions()
        .get::<XRequestId>()
        .map(|r| r.0.as_str())
        .unwrap_or("n/a");
    let path = req.uri().path();
    let span = tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %path,
        request_id = %rid,
        contact_id = Empty,
        status = Empty,
        latency_ms = Empty
    );
    if let Some(id) = contact_id(path) {
        span.record("contact_id", id);
    }
    span
}

fn record_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    tracing::debug!(parent: span, status = status.as_u16(), "request completed");
}

type MakeSpanFn = fn(&Request<Body>) -> Span;
type OnResponseFn = fn(&Response<Body>, Duration, &Span);

/// Trace layer whose span carries method, path, request id, contact id,
/// status and latency.
pub fn create_trace_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeSpanFn, DefaultOnRequest, OnResponseFn>
{
    TraceLayer::new_for_http()
        .make_span_with(request_span as MakeSpanFn)
        .on_response(record_response as OnResponseFn)
}
