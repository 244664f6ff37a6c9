//! In-memory paper catalog.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{MetadataProvider, ProviderError, select_by_id, sort_most_recent_first};
use crate::error::{Error, Result};

/// A fixed set of raw records, searched in memory.
pub struct CatalogProvider {
    records: Vec<Value>,
}

impl CatalogProvider {
    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// The built-in records.
    pub fn seeded() -> Self {
        Self::from_records(seed_records())
    }

    /// Load a JSON file holding either an array of records or an object
    /// mapping identifiers to records.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Catalog {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| Error::Catalog {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let records = match value {
            Value::Array(records) => records,
            Value::Object(map) => map
                .into_iter()
                .map(|(id, mut record)| {
                    if let Some(obj) = record.as_object_mut() {
                        obj.entry("id").or_insert(Value::String(id));
                    }
                    record
                })
                .collect(),
            _ => {
                return Err(Error::Catalog {
                    path: path.to_path_buf(),
                    message: "expected an array or object of records".to_string(),
                });
            }
        };

        tracing::info!(path = %path.display(), count = records.len(), "Loaded catalog");
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for CatalogProvider {
    fn default() -> Self {
        Self::seeded()
    }
}

fn matches_query(record: &Value, terms: &[String]) -> bool {
    let mut haystack = String::new();
    for key in ["id", "title"] {
        if let Some(s) = record.get(key).and_then(Value::as_str) {
            haystack.push_str(&s.to_lowercase());
            haystack.push(' ');
        }
    }
    let authors = record.get("author").or_else(|| record.get("authors"));
    for author in authors.and_then(Value::as_array).into_iter().flatten() {
        if let Some(family) = author.get("family").and_then(Value::as_str) {
            haystack.push_str(&family.to_lowercase());
            haystack.push(' ');
        }
    }
    terms.iter().all(|term| haystack.contains(term.as_str()))
}

#[async_trait]
impl MetadataProvider for CatalogProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn fetch_by_id(&self, id: &str) -> std::result::Result<Option<Value>, ProviderError> {
        Ok(select_by_id(&self.records, id).cloned())
    }

    async fn search_by_query(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Value>, ProviderError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let mut results: Vec<Value> = self
            .records
            .iter()
            .filter(|r| matches_query(r, &terms))
            .cloned()
            .collect();
        sort_most_recent_first(&mut results);
        results.truncate(limit);
        Ok(results)
    }
}

fn seed_records() -> Vec<Value> {
    vec![
        json!({
            "id": "711722243044",
            "type": "article-journal",
            "title": "AI Research Paper Explorer: Leveraging RAG for Persistent Research Memory",
            "author": [
                {"family": "ANISHA", "given": "Z."},
                {"family": "JANANI", "given": "K."}
            ],
            "issued": {"date_parts": [[2025, 10, 8]]},
            "container_title": "Journal of Artificial Intelligence & Data Science",
            "volume": "10",
            "issue": "2",
            "page": "15-30",
            "URL": "http://example-kite.edu/paper-09"
        }),
        json!({
            "id": "VASWANI_2017",
            "type": "paper-conference",
            "title": "Attention Is All You Need",
            "author": [
                {"family": "Vaswani", "given": "Ashish"},
                {"family": "Shazeer", "given": "Noam M."},
                {"family": "Parmar", "given": "Niki"},
                {"family": "Uszkoreit", "given": "Jakob"},
                {"family": "Jones", "given": "Llion"},
                {"family": "Gomez", "given": "Aidan N."},
                {"family": "Kaiser", "given": "Łukasz"},
                {"family": "Polosukhin", "given": "Illia"}
            ],
            "issued": {"date_parts": [[2017]]},
            "container_title": "Advances in Neural Information Processing Systems 30 (NIPS 2017)",
            "page": "5998-6008",
            "URL": "https://arxiv.org/abs/1706.03762"
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_seeded_records() {
        let catalog = CatalogProvider::seeded();
        let paper = catalog.fetch_by_id("VASWANI_2017").await.unwrap().unwrap();
        assert_eq!(paper["title"], "Attention Is All You Need");
        assert!(catalog.fetch_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seeded_records_normalize() {
        let catalog = CatalogProvider::seeded();
        for id in ["711722243044", "VASWANI_2017"] {
            let paper = catalog.fetch_by_id(id).await.unwrap().unwrap();
            let record = papervista_citeproc::normalize(&paper).unwrap();
            assert!(record.is_renderable(), "{} should be renderable", id);
        }
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_recent_first() {
        let catalog = CatalogProvider::seeded();
        let results = catalog.search_by_query("", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["id"], "711722243044");

        let results = catalog.search_by_query("ATTENTION", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], "VASWANI_2017");

        let results = catalog.search_by_query("janani rag", 10).await.unwrap();
        assert_eq!(results.len(), 1);

        assert!(catalog.search_by_query("quantum", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_limit() {
        let catalog = CatalogProvider::seeded();
        assert_eq!(catalog.search_by_query("", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_from_file_object_form_fills_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"P1": {{"title": "One", "author": [{{"family": "Doe"}}], "issued": [2020]}}}}"#
        )
        .unwrap();
        let catalog = CatalogProvider::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let paper = catalog.fetch_by_id("P1").await.unwrap().unwrap();
        assert_eq!(paper["id"], "P1");
    }

    #[test]
    fn test_from_file_rejects_scalars() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "42").unwrap();
        let err = CatalogProvider::from_file(file.path()).err().unwrap();
        assert!(matches!(err, Error::Catalog { .. }));
    }
}
