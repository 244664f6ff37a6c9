//! HTTP API tests, driven through the router without binding a socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use papervista_citeproc::RulesEngine;
use papervista_hub::provider::CatalogProvider;
use papervista_hub::server::build_router;
use papervista_hub::{HubConfig, HubContext, Orchestrator};
use papervista_llm::{FallbackError, FallbackGenerator, TextGenerator};
use serde_json::{Value, json};
use tower::ServiceExt;

struct Fake(papervista_llm::Result<String>);

#[async_trait]
impl TextGenerator for Fake {
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> papervista_llm::Result<String> {
        self.0.clone()
    }
}

fn router_with(answer: papervista_llm::Result<String>) -> axum::Router {
    let fallback = FallbackGenerator::new(Arc::new(Fake(answer)), Duration::from_secs(5));
    let ctx = HubContext::new(
        HubConfig::default(),
        Orchestrator::new(RulesEngine::builtin(), fallback),
        Arc::new(CatalogProvider::seeded()),
    );
    build_router(Arc::new(ctx))
}

fn router() -> axum::Router {
    router_with(Ok("Doe, J. (n.d.). Untitled.".to_string()))
}

async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_generate_citation_by_rules() {
    let record = json!({
        "id": "X1",
        "title": "Attention Is All You Need",
        "authors": [{"family": "Vaswani", "given": "Ashish"}],
        "issued": [2017]
    });
    let (status, body) = send(router(), post_json("/generate/citation?style=apa", &record)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "style": "APA",
            "citation": "Vaswani, A. (2017). Attention Is All You Need.",
            "source": "RULES",
            "source_id": "X1"
        })
    );
}

#[tokio::test]
async fn test_generate_citation_defaults_to_apa() {
    let record = json!({
        "id": "X1",
        "title": "Attention Is All You Need",
        "author": [{"family": "Vaswani", "given": "Ashish"}],
        "issued": {"date-parts": [[2017]]}
    });
    let (status, body) = send(router(), post_json("/generate/citation", &record)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["style"], "APA");
    assert_eq!(body["source"], "RULES");
}

#[tokio::test]
async fn test_generate_citation_html_format() {
    let record = json!({
        "id": "B1",
        "type": "book",
        "title": "Deep Learning",
        "author": [{"family": "Goodfellow", "given": "Ian"}],
        "issued": [2016]
    });
    let (status, body) = send(
        router(),
        post_json("/generate/citation?style=apa&format=html", &record),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let citation = body["citation"].as_str().unwrap();
    assert!(citation.contains("<i>Deep Learning</i>"), "Got: {}", citation);
}

#[tokio::test]
async fn test_incomplete_record_uses_fallback() {
    let record = json!({"id": "X2", "title": "", "authors": [], "issued": []});
    let (status, body) = send(router(), post_json("/generate/citation?style=mla", &record)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "FALLBACK");
    assert_eq!(body["style"], "MLA");
    assert_eq!(body["source_id"], "X2");
    assert_eq!(body["citation"], "Doe, J. (n.d.). Untitled.");
}

#[tokio::test]
async fn test_unknown_style_uses_fallback() {
    let record = json!({
        "id": "X1",
        "title": "Attention Is All You Need",
        "authors": [{"family": "Vaswani", "given": "Ashish"}],
        "issued": [2017]
    });
    let (status, body) = send(
        router(),
        post_json("/generate/citation?style=klingon", &record),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "FALLBACK");
    assert_eq!(body["style"], "KLINGON");
}

#[tokio::test]
async fn test_both_failing_returns_500_with_detail() {
    let router = router_with(Err(FallbackError::Timeout(Duration::from_secs(5))));
    let record = json!({"id": "X3", "title": ""});
    let (status, body) = send(router, post_json("/generate/citation", &record)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(
        detail.starts_with("Both rules and fallback generation failed"),
        "Got: {}",
        detail
    );
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let request = Request::post("/generate/citation")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_search_most_recent_first() {
    let (status, body) = send(router(), get("/search?q=&limit=5")).await;
    assert_eq!(status, StatusCode::OK);

    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["711722243044", "VASWANI_2017"]);
}

#[tokio::test]
async fn test_search_by_author() {
    let (status, body) = send(router(), get("/search?q=vaswani")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "VASWANI_2017");
}

#[tokio::test]
async fn test_search_limit_is_clamped() {
    let (status, body) = send(router(), get("/search?q=&limit=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_paper() {
    let (status, body) = send(router(), get("/papers/VASWANI_2017")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Attention Is All You Need");

    let (status, body) = send(router(), get("/papers/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Paper NOPE not found");
}

#[tokio::test]
async fn test_cite_paper_from_catalog() {
    let request = Request::post("/papers/711722243044/citation?style=ieee")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "RULES");
    assert_eq!(body["style"], "IEEE");
    assert_eq!(body["source_id"], "711722243044");
    let citation = body["citation"].as_str().unwrap();
    assert!(citation.contains("AI Research Paper Explorer"), "Got: {}", citation);
}

#[tokio::test]
async fn test_cite_missing_paper() {
    let request = Request::post("/papers/NOPE/citation").body(Body::empty()).unwrap();
    let (status, _) = send(router(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_styles_and_health() {
    let (status, body) = send(router(), get("/styles")).await;
    assert_eq!(status, StatusCode::OK);
    let styles: Vec<&str> = body["styles"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    for name in ["apa", "mla", "ieee", "chicago-author-date", "harvard"] {
        assert!(styles.contains(&name), "missing {}", name);
    }

    let (status, body) = send(router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "catalog");
    assert_eq!(body["fallback_configured"], true);
    assert_eq!(body["style_count"], styles.len());
}

#[tokio::test]
async fn test_unknown_route() {
    let response = router().oneshot(get("/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
