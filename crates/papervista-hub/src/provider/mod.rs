//! Metadata providers: where raw paper records come from.
//!
//! Providers return raw CSL-JSON shaped records (`id`, `title`, `author`,
//! `issued`, `container-title`, `URL`, ...). Coercing them into canonical
//! records is the normalizer's job, not the provider's.

pub mod arxiv;
pub mod catalog;

use async_trait::async_trait;
use papervista_citeproc::issued_parts;
use serde_json::Value;

pub use arxiv::ArxivProvider;
pub use catalog::CatalogProvider;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("metadata service unreachable: {0}")]
    Network(String),

    #[error("metadata service returned HTTP {0}")]
    Status(u16),

    #[error("could not read metadata response: {0}")]
    Parse(String),
}

/// A source of raw paper records.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short name for logs and health output.
    fn name(&self) -> &'static str;

    /// The record with the given identifier, if any.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Value>, ProviderError>;

    /// Candidate records for a free-text query, most recent first.
    async fn search_by_query(&self, query: &str, limit: usize)
    -> Result<Vec<Value>, ProviderError>;
}

/// Split a trailing version suffix: `"1706.03762v5"` -> `("1706.03762", Some(5))`.
pub fn split_version(id: &str) -> (&str, Option<u32>) {
    if let Some((base, version)) = id.rsplit_once('v')
        && !base.is_empty()
        && !version.is_empty()
        && version.chars().all(|c| c.is_ascii_digit())
        && let Ok(n) = version.parse()
    {
        return (base, Some(n));
    }
    (id, None)
}

/// Pick the record matching `requested` among `candidates`.
///
/// An exact identifier match wins. An unversioned request matches the
/// highest version sharing its base identifier, earliest candidate on ties.
/// A versioned request never matches a different version.
pub fn select_by_id<'a>(candidates: &'a [Value], requested: &str) -> Option<&'a Value> {
    let requested = requested.trim();
    let id_of = |record: &Value| papervista_citeproc::raw_id(record);

    if let Some(exact) = candidates
        .iter()
        .find(|r| id_of(r).as_deref() == Some(requested))
    {
        return Some(exact);
    }

    let (base, version) = split_version(requested);
    if version.is_some() {
        return None;
    }

    let mut best: Option<(&Value, u32)> = None;
    for record in candidates {
        let Some(id) = id_of(record) else { continue };
        let (candidate_base, candidate_version) = split_version(&id);
        if candidate_base != base {
            continue;
        }
        let candidate_version = candidate_version.unwrap_or(0);
        if best.is_none_or(|(_, v)| candidate_version > v) {
            best = Some((record, candidate_version));
        }
    }
    best.map(|(record, _)| record)
}

/// Issued date parts of a raw record, for most-recent-first ordering.
pub(crate) fn issued_key(record: &Value) -> Vec<i32> {
    record
        .get("issued")
        .and_then(issued_parts)
        .unwrap_or_default()
}

/// Sort records most recent first. Undated records go last; ties keep their order.
pub(crate) fn sort_most_recent_first(records: &mut [Value]) {
    records.sort_by(|a, b| issued_key(b).cmp(&issued_key(a)));
}
