use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{classify::ServerErrorsFailureClass, cors::CorsLayer, trace::TraceLayer};
use tracing::{warn, Span};

use crate::services::resource_fetcher::ResourceFetcher;

#[derive(Clone)]
pub struct ProxyState {
    pub fetcher: ResourceFetcher,
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn create_router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/pdf-proxy", get(pdf_proxy))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("{error}")
                    },
                ))
                .layer(cors),
        )
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Streams a backend PDF through this origin with the API key attached server-side
pub async fn pdf_proxy(
    State(state): State<ProxyState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let Some(url) = params.url.filter(|u| !u.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "PDF URL is required".to_string());
    };

    if !is_backend_url(state.fetcher.base_url(), &url) {
        warn!("Refusing to proxy {}", url);
        return error_response(
            StatusCode::BAD_REQUEST,
            "PDF URL must point at the document API".to_string(),
        );
    }

    match state.fetcher.fetch_bytes(&url).await {
        Ok(asset) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_LENGTH, asset.bytes.len().to_string()),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
                (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            ],
            Body::from(asset.bytes),
        )
            .into_response(),
        Err(e) => {
            warn!("PDF proxy fetch failed for {}: {}", url, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch PDF: {}", e),
            )
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Same scheme, host and port as the API base, and under its path
fn is_backend_url(base: &str, candidate: &str) -> bool {
    let (Ok(base), Ok(candidate)) = (Url::parse(base), Url::parse(candidate)) else {
        return false;
    };
    if base.origin() != candidate.origin() {
        return false;
    }
    let prefix = base.path().trim_end_matches('/');
    let path = candidate.path();
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
