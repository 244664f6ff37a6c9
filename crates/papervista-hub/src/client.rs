//! Client for a running citation server's `/generate/citation`.

use papervista_citeproc::OutputFormat;
use serde_json::Value;

use crate::orchestrator::CitationResult;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection refused at {server}. Ensure the server is running: papervista serve")]
    Unreachable { server: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("API call failed: {status}\nServer detail: {detail}")]
    Api { status: u16, detail: String },

    #[error("Server returned a malformed citation response: {0}")]
    Malformed(String),
}

/// POST `paper` to `{server}/generate/citation` and decode the result.
pub async fn request_citation(
    server: &str,
    paper: &Value,
    style: &str,
    format: OutputFormat,
) -> Result<CitationResult, ClientError> {
    let endpoint = format!("{}/generate/citation", server.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&endpoint)
        .query(&[("style", style.to_string()), ("format", format.to_string())])
        .json(paper)
        .send()
        .await
        .map_err(|e| {
            if e.is_connect() {
                ClientError::Unreachable {
                    server: server.to_string(),
                }
            } else {
                ClientError::Request(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("detail")?.as_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown error.".to_string());
        return Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        });
    }

    response
        .json::<CitationResult>()
        .await
        .map_err(|e| ClientError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::CitationSource;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn paper() -> Value {
        json!({"id": "VASWANI_2017", "title": "Attention Is All You Need"})
    }

    #[tokio::test]
    async fn test_decodes_citation_result() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/generate/citation")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("style".into(), "mla".into()),
                Matcher::UrlEncoded("format".into(), "html".into()),
            ]))
            .match_body(Matcher::PartialJson(json!({"id": "VASWANI_2017"})))
            .with_status(200)
            .with_body(
                json!({
                    "style": "MLA",
                    "citation": "Vaswani, Ashish, et al.",
                    "source": "RULES",
                    "source_id": "VASWANI_2017"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = request_citation(&server.url(), &paper(), "mla", OutputFormat::Html)
            .await
            .unwrap();
        assert_eq!(result.source, CitationSource::Rules);
        assert_eq!(result.style, "MLA");
        assert_eq!(result.source_id, "VASWANI_2017");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_source_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/generate/citation")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({"style": "APA", "citation": "x", "source": "GUESS", "source_id": "X1"})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = request_citation(&server.url(), &paper(), "apa", OutputFormat::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)), "Got: {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_fields_are_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/generate/citation")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"style": "APA", "source": "RULES"}).to_string())
            .create_async()
            .await;

        let err = request_citation(&server.url(), &paper(), "apa", OutputFormat::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)), "Got: {:?}", err);
    }

    #[tokio::test]
    async fn test_error_status_carries_detail() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/generate/citation")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(json!({"detail": "Both rules and fallback generation failed"}).to_string())
            .create_async()
            .await;

        let err = request_citation(&server.url(), &paper(), "apa", OutputFormat::Plain)
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "Both rules and fallback generation failed");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_detail() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/generate/citation")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = request_citation(&server.url(), &paper(), "apa", OutputFormat::Plain)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown error."), "Got: {}", err);
    }
}
