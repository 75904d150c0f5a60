//! Jenkins Relay library.
//!
//! Bridges Mattermost's `/jenkins` slash command and dialog callbacks to a
//! Jenkins server. Exposed as a library so the router can be exercised in
//! tests without binding a socket.
//!
//! # Security
//!
//! Stores per-user Jenkins API tokens, encrypted with `JENKINS_ENCRYPTION_KEY`.
//! The key never leaves the process and tokens are never logged.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commands;
pub mod config;
pub mod error;
pub mod jenkins;
pub mod kv;
pub mod mattermost;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod trigger;
pub mod vault;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the relay router with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
