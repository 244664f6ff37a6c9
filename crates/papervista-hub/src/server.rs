//! HTTP server setup and routing

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use papervista_citeproc::OutputFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::context::SharedContext;
use crate::error::{Error, Result};

/// Upper bound on search results per request.
const MAX_SEARCH_LIMIT: usize = 100;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    provider: &'static str,
    fallback_configured: bool,
    style_count: usize,
}

#[derive(Serialize)]
struct StylesResponse {
    styles: Vec<String>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Deserialize)]
struct CitationParams {
    #[serde(default = "default_style")]
    style: String,
    #[serde(default)]
    format: OutputFormat,
}

fn default_style() -> String {
    "apa".to_string()
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

/// Health check endpoint
async fn health(State(ctx): State<SharedContext>) -> impl IntoResponse {
    let orchestrator = ctx.orchestrator();
    Json(HealthResponse {
        status: "ok",
        provider: ctx.provider().name(),
        fallback_configured: orchestrator.fallback().is_configured(),
        style_count: orchestrator.engine().style_names().len(),
    })
}

async fn list_styles(State(ctx): State<SharedContext>) -> impl IntoResponse {
    Json(StylesResponse {
        styles: ctx.orchestrator().engine().style_names(),
    })
}

async fn resolve(ctx: &SharedContext, raw: &Value, params: &CitationParams) -> Response {
    match ctx
        .orchestrator()
        .resolve(raw, &params.style, params.format)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Generate a citation for a posted record
async fn generate_citation(
    State(ctx): State<SharedContext>,
    Query(params): Query<CitationParams>,
    Json(raw): Json<Value>,
) -> Response {
    resolve(&ctx, &raw, &params).await
}

/// Look up a paper and generate its citation
async fn cite_paper(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
    Query(params): Query<CitationParams>,
) -> Response {
    match ctx.provider().fetch_by_id(&id).await {
        Ok(Some(raw)) => resolve(&ctx, &raw, &params).await,
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("Paper {} not found", id)),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

async fn get_paper(State(ctx): State<SharedContext>, Path(id): Path<String>) -> Response {
    match ctx.provider().fetch_by_id(&id).await {
        Ok(Some(raw)) => Json(raw).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("Paper {} not found", id)),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// Candidate records for a query, most recent first
async fn search(State(ctx): State<SharedContext>, Query(params): Query<SearchParams>) -> Response {
    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);
    match ctx.provider().search_by_query(&params.q, limit).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// 404 handler
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Build the axum router
pub fn build_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/styles", get(list_styles))
        .route("/generate/citation", post(generate_citation))
        .route("/search", get(search))
        .route("/papers/{id}", get(get_paper))
        .route("/papers/{id}/citation", post(cite_paper))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Run the citation server.
///
/// This function blocks until the server is shut down.
pub async fn run_server(ctx: SharedContext) -> Result<()> {
    let addr = ctx.config().bind_addr();
    let router = build_router(ctx);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Citation server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    Ok(())
}
