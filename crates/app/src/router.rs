use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tenant_edge_core::ControllerState;
use tracing::error;
use url::Url;

use crate::problem::ProblemResponse;
use crate::resolve::{request_origin, DomainResolver, Resolution};
use crate::telemetry;

pub const EDGE_STATE_HEADER: &str = "x-tenant-edge";

const NOT_FOUND_PAGE: &str = "<!doctype html><html><head><meta charset=\"utf-8\"><title>Site not found</title></head><body><h1>Site not found</h1><p>This domain is not connected to an agent website.</p></body></html>";

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    resolver: DomainResolver,
    public_scheme: String,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        resolver: DomainResolver,
        public_scheme: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            resolver,
            public_scheme: public_scheme.into(),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn resolver(&self) -> &DomainResolver {
        &self.resolver
    }

    pub fn public_scheme(&self) -> &str {
        &self.public_scheme
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/resolve", get(resolve_report))
        .fallback(edge)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
}

#[derive(Debug, Deserialize)]
struct ResolveQuery {
    #[serde(default)]
    host: String,
    #[serde(default)]
    origin: Option<String>,
}

/// Diagnostic view of the check for an arbitrary host, without redirecting.
async fn resolve_report(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Resolution>, ProblemResponse> {
    if query.host.trim().is_empty() {
        return Err(ProblemResponse::bad_request(
            "missing_host",
            "query parameter 'host' is required",
        ));
    }

    let origin = match query.origin.as_deref() {
        Some(raw) => Url::parse(raw).map_err(|err| {
            ProblemResponse::bad_request("invalid_origin", format!("invalid origin: {err}"))
        })?,
        None => request_origin(&query.host, None, state.public_scheme()).ok_or_else(|| {
            ProblemResponse::bad_request("invalid_host", "host is not a valid authority")
        })?,
    };

    state
        .resolver()
        .resolve(query.host.trim(), &origin)
        .await
        .map(Json)
        .map_err(|err| {
            error!(stage = "resolve", error = %err, "custom domain check failed");
            ProblemResponse::internal(err.to_string())
        })
}

/// Runs the check for the request's own host and renders the terminal state.
async fn edge(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
        .filter(|host| !host.trim().is_empty());
    let Some(host) = host else {
        return ProblemResponse::bad_request("missing_host", "request has no Host header")
            .into_response();
    };

    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok());
    let Some(origin) = request_origin(&host, forwarded_proto, state.public_scheme()) else {
        return ProblemResponse::bad_request("invalid_host", "Host header is not a valid authority")
            .into_response();
    };

    match state.resolver().resolve(&host, &origin).await {
        Ok(resolution) => render(&resolution.state),
        Err(err) => {
            error!(stage = "resolve", %host, error = %err, "custom domain check failed");
            ProblemResponse::internal(err.to_string()).into_response()
        }
    }
}

fn render(state: &ControllerState) -> Response {
    let marker = HeaderValue::from_static(state.as_str());
    let mut response = match state {
        ControllerState::Redirecting { location } => {
            Redirect::temporary(location.as_str()).into_response()
        }
        ControllerState::NotFoundDisplay => {
            (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response()
        }
        _ => StatusCode::NO_CONTENT.into_response(),
    };
    response
        .headers_mut()
        .insert(HeaderName::from_static(EDGE_STATE_HEADER), marker);
    response
}
