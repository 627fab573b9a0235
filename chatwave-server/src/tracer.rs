//! Request tracing for the HTTP and WebSocket surface.

use axum::http::Request;
use std::time::Duration;
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer,
};
use tracing::{Level, Span, warn};

use crate::middleware::request_context::RequestContext;

type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpan,
    DefaultOnRequest,
    DefaultOnResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    fn(ServerErrorsFailureClass, Duration, &Span),
>;

/// Span factory carrying the request id assigned by the id middleware.
///
/// The id middleware must be layered outside this one, otherwise the
/// extension is absent and the span records the id as `unassigned`.
#[derive(Clone, Copy, Default)]
pub(crate) struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestContext>()
            .map_or("unassigned", |context| context.request_id.as_str());

        tracing::info_span!(
            "request",
            id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

fn record_failure(class: ServerErrorsFailureClass, elapsed: Duration, span: &Span) {
    metrics::counter!("http_request_failures_total").increment(1);
    warn!(
        parent: span,
        %class,
        elapsed_ms = elapsed.as_millis() as u64,
        "request failed"
    );
}

/// Trace layer wrapping every route: one span per request, a debug-level
/// response line, and a failure counter for 5xx-class outcomes.
pub fn trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
        .on_failure(record_failure as fn(ServerErrorsFailureClass, Duration, &Span))
}
