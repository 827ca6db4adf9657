//! Per-request tracing span.
//!
//! Each request runs inside an `api_request` span carrying method, path,
//! response status and the W3C trace id when the caller sent `traceparent`.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{field, info, info_span, warn, Instrument, Span};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let span = info_span!(
            "api_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            http.status_code = field::Empty,
            trace_id = field::Empty,
            parent_span_id = field::Empty,
        );

        if let Some(ctx) = extract_trace_context(&req) {
            span.record("trace_id", ctx.trace_id.as_str());
            span.record("parent_span_id", ctx.parent_id.as_str());
        }

        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(req).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;

                if let Ok(response) = &result {
                    let status = response.status();
                    Span::current().record("http.status_code", status.as_u16());
                    if status.is_server_error() {
                        warn!(status = status.as_u16(), elapsed_ms, "Request failed");
                    } else {
                        info!(status = status.as_u16(), elapsed_ms, "Request completed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Parsed W3C `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub parent_id: String,
}

/// Extract trace context from request headers (W3C Trace Context)
pub fn extract_trace_context<B>(req: &Request<B>) -> Option<TraceContext> {
    let traceparent = req.headers().get("traceparent")?.to_str().ok()?;

    // version-trace_id-parent_id-trace_flags
    let parts: Vec<&str> = traceparent.trim().split('-').collect();
    if parts.len() != 4 {
        return None;
    }

    let (trace_id, parent_id) = (parts[1], parts[2]);
    let is_hex = |s: &str| s.chars().all(|c| c.is_ascii_hexdigit());
    if trace_id.len() != 32 || parent_id.len() != 16 || !is_hex(trace_id) || !is_hex(parent_id) {
        return None;
    }
    // all-zero ids are invalid
    if trace_id.chars().all(|c| c == '0') || parent_id.chars().all(|c| c == '0') {
        return None;
    }

    Some(TraceContext {
        trace_id: trace_id.to_ascii_lowercase(),
        parent_id: parent_id.to_ascii_lowercase(),
    })
}
