//! arXiv Atom API provider.

use async_trait::async_trait;
use papervista_xml::XmlElement;
use serde_json::{Map, Value, json};

use super::{MetadataProvider, ProviderError, select_by_id, sort_most_recent_first, split_version};

pub const DEFAULT_ARXIV_URL: &str = "http://export.arxiv.org/api/query";

/// Looks papers up through `export.arxiv.org/api/query`.
pub struct ArxivProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ArxivProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<Vec<Value>, ProviderError> {
        tracing::debug!(url = %self.base_url, ?params, "Querying arXiv");

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        parse_feed(&body)
    }
}

impl Default for ArxivProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ARXIV_URL)
    }
}

#[async_trait]
impl MetadataProvider for ArxivProvider {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Value>, ProviderError> {
        let (base, _) = split_version(id.trim());
        let entries = self
            .query(&[
                ("search_query", format!("id:{}", base)),
                ("max_results", "20".to_string()),
            ])
            .await?;
        Ok(select_by_id(&entries, id).cloned())
    }

    async fn search_by_query(&self, query: &str, limit: usize) -> Result<Vec<Value>, ProviderError> {
        let mut entries = self
            .query(&[
                ("search_query", format!("all:{}", query.trim())),
                ("start", "0".to_string()),
                ("max_results", limit.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .await?;
        sort_most_recent_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Parse an Atom feed into raw CSL-JSON records.
pub fn parse_feed(body: &str) -> Result<Vec<Value>, ProviderError> {
    let doc = papervista_xml::parse(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if doc.root.name != "feed" {
        return Err(ProviderError::Parse(format!(
            "expected an Atom <feed>, found <{}>",
            doc.root.name
        )));
    }
    Ok(doc
        .root
        .get_children("entry")
        .into_iter()
        .filter_map(entry_to_record)
        .collect())
}

/// Entries without an id or title (arXiv's error entries) are skipped.
fn entry_to_record(entry: &XmlElement) -> Option<Value> {
    let abs_url = entry.child_text("id")?;
    let id = abs_url.rsplit_once("/abs/").map_or(abs_url, |(_, id)| id);
    let title = collapse_whitespace(entry.child_text("title")?);

    let mut record = Map::new();
    record.insert("id".into(), json!(id));
    record.insert("type".into(), json!("article"));
    record.insert("title".into(), json!(title));

    let authors: Vec<Value> = entry
        .get_children("author")
        .into_iter()
        .filter_map(|a| a.child_text("name"))
        .map(split_person_name)
        .collect();
    record.insert("author".into(), Value::Array(authors));

    if let Some(parts) = entry.child_text("published").and_then(date_parts) {
        record.insert("issued".into(), json!({ "date-parts": [parts] }));
    }

    if let Some(journal) = entry
        .get_prefixed_child("arxiv", "journal_ref")
        .map(|j| collapse_whitespace(&j.text))
        .filter(|j| !j.is_empty())
    {
        record.insert("container-title".into(), json!(journal));
    }

    let url = entry
        .get_children("link")
        .into_iter()
        .find(|l| l.get_attribute("rel") == Some("alternate"))
        .and_then(|l| l.get_attribute("href"))
        .unwrap_or(abs_url);
    record.insert("URL".into(), json!(url));

    Some(Value::Object(record))
}

/// "Aidan N. Gomez" -> family "Gomez", given "Aidan N.".
fn split_person_name(name: &str) -> Value {
    let name = collapse_whitespace(name);
    match name.rsplit_once(' ') {
        Some((given, family)) => json!({ "family": family, "given": given }),
        None => json!({ "family": name }),
    }
}

/// "2017-06-12T17:57:34Z" -> [2017, 6, 12]
fn date_parts(timestamp: &str) -> Option<Vec<i64>> {
    let date = timestamp.split('T').next()?;
    let parts: Vec<i64> = date
        .split('-')
        .map_while(|p| p.parse().ok())
        .take(3)
        .collect();
    (!parts.is_empty()).then_some(parts)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
