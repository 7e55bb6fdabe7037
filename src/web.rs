//! HTTP endpoint adapter
//!
//! The externally reachable boundary: request validation, origin
//! allowlisting, per-IP rate limiting, and translation of pipeline outcomes
//! into HTTP statuses. Clients always receive either a complete
//! `{weather, suggestions}` object or an `{error}` object.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{ConnectInfo, Request, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use crate::DresscastError;
use crate::config::DresscastConfig;
use crate::gemini::{GeminiClient, ModelClient};
use crate::mock;
use crate::models::RawSuggestionRequest;
use crate::pipeline::SuggestionPipeline;

/// Request bodies larger than this are rejected outright
const BODY_LIMIT_BYTES: usize = 128 * 1024;

/// Fixed-window rate limiter keyed by client IP.
///
/// The one piece of cross-request shared state in the service.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    counters: Mutex<HashMap<IpAddr, WindowCounter>>,
}

struct WindowCounter {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether a request from `ip` is allowed and record it.
    pub fn allow_request(&self, ip: IpAddr) -> bool {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        // drop expired windows so the map does not grow with one-shot clients
        counters.retain(|_, counter| now.duration_since(counter.window_start) < self.window);

        let counter = counters.entry(ip).or_insert(WindowCounter {
            window_start: now,
            count: 0,
        });

        if counter.count >= self.max_requests {
            false
        } else {
            counter.count += 1;
            true
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Shared per-process state, constructed once at startup and read-only
/// afterwards apart from the rate limiter counters.
pub struct AppState {
    config: DresscastConfig,
    pipeline: SuggestionPipeline,
    rate_limiter: RateLimiter,
}

impl AppState {
    /// Build the state with a real Gemini client.
    pub fn new(config: DresscastConfig) -> Result<Self> {
        let model: Arc<dyn ModelClient> = Arc::new(GeminiClient::new(config.gemini.clone())?);
        Ok(Self::with_model(config, model))
    }

    /// Build the state around an arbitrary model client (used by tests).
    #[must_use]
    pub fn with_model(config: DresscastConfig, model: Arc<dyn ModelClient>) -> Self {
        let pipeline = SuggestionPipeline::new(model, config.gemini.max_retries);
        let rate_limiter = RateLimiter::new(
            Duration::from_secs(config.server.rate_limit_window_seconds),
            config.server.rate_limit_max_requests,
        );
        Self {
            config,
            pipeline,
            rate_limiter,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/suggestions", post(post_suggestions))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn_with_state(state.clone(), origin_gate))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_gate,
        ))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), timeout_gate))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run(config: DresscastConfig) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Suggestion backend listening at http://localhost:{port}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn post_suggestions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable request body");
            return error_response(StatusCode::BAD_REQUEST, "Invalid input: body must be JSON");
        }
    };

    let raw: RawSuggestionRequest = match serde_json::from_value(body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "malformed request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid input", "details": e.to_string() })),
            )
                .into_response();
        }
    };

    let request = match raw.validate() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "request validation failed");
            return error_response(StatusCode::BAD_REQUEST, &e.client_message());
        }
    };

    if state.config.gemini.mock_mode {
        info!("mock mode enabled, serving canned payload");
        return (StatusCode::OK, Json(mock::canned_response())).into_response();
    }

    match state.pipeline.run(&request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            error!(error = %err, "suggestion request failed");
            error_response(status_for(&err), &err.client_message())
        }
    }
}

fn status_for(err: &DresscastError) -> StatusCode {
    match err {
        DresscastError::Validation { .. } => StatusCode::BAD_REQUEST,
        DresscastError::Config { .. }
        | DresscastError::Model { .. }
        | DresscastError::RetriesExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Origin allowlist enforcement.
///
/// Requests without an Origin header (same-origin or non-browser callers)
/// pass through without CORS headers. A disallowed origin is rejected with
/// 403; an allowed one gets `Access-Control-Allow-Origin` echoing itself, or
/// `*` when the allowlist contains `*`. Preflights answer 204.
async fn origin_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let allowed = match &origin {
        Some(origin) => {
            match allowed_origin_value(&state.config.server.allowed_origins, origin) {
                Some(value) => Some(value),
                None => {
                    warn!(%origin, "origin not in allowlist");
                    return error_response(StatusCode::FORBIDDEN, "Origin not allowed");
                }
            }
        }
        None => None,
    };

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(&mut response, allowed.as_deref());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(&mut response, allowed.as_deref());
    response
}

fn allowed_origin_value(allowlist: &[String], origin: &str) -> Option<String> {
    if allowlist.iter().any(|entry| entry == "*") {
        Some("*".to_string())
    } else if allowlist.iter().any(|entry| entry == origin) {
        Some(origin.to_string())
    } else {
        None
    }
}

fn apply_cors_headers(response: &mut Response, allowed: Option<&str>) {
    let Some(allowed) = allowed else { return };
    let Ok(value) = HeaderValue::from_str(allowed) else {
        return;
    };
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    // the grant differs per origin, so caches must key on it
    if allowed != "*" {
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
}

/// Per-request deadline. A timed-out request still gets the `{error}` JSON
/// shape clients expect.
async fn timeout_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let limit = Duration::from_secs(state.config.server.request_timeout_seconds.into());
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(seconds = state.config.server.request_timeout_seconds, "request timed out");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Request timed out. Please try again later.",
            )
        }
    }
}

async fn rate_limit_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    if !state.rate_limiter.allow_request(ip) {
        warn!(%ip, "rate limit exceeded");
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please slow down.",
        );
    }
    next.run(request).await
}

/// Best-effort client IP: first X-Forwarded-For hop, then the socket peer.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
        && let Ok(ip) = first.trim().parse()
    {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip())
}
