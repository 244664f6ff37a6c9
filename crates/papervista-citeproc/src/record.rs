//! The canonical citation record.
//!
//! This is the normalized unit the rules engine renders. Optional fields stay
//! `None` rather than holding empty placeholders.

use serde_json::{Map, Value, json};

/// CSL item type of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemKind {
    #[default]
    ArticleJournal,
    ArticleMagazine,
    ArticleNewspaper,
    /// Preprints and other standalone articles.
    Article,
    PaperConference,
    Book,
    Chapter,
    Report,
    Thesis,
    Webpage,
    Dataset,
    /// Any other CSL type, kept verbatim.
    Other(String),
}

impl ItemKind {
    /// Parse a CSL type name. Unknown names are kept as [`ItemKind::Other`].
    pub fn from_csl(name: &str) -> Self {
        match name {
            "article-journal" => ItemKind::ArticleJournal,
            "article-magazine" => ItemKind::ArticleMagazine,
            "article-newspaper" => ItemKind::ArticleNewspaper,
            "article" => ItemKind::Article,
            "paper-conference" => ItemKind::PaperConference,
            "book" => ItemKind::Book,
            "chapter" => ItemKind::Chapter,
            "report" => ItemKind::Report,
            "thesis" => ItemKind::Thesis,
            "webpage" => ItemKind::Webpage,
            "dataset" => ItemKind::Dataset,
            other => ItemKind::Other(other.to_string()),
        }
    }

    /// The CSL type name.
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::ArticleJournal => "article-journal",
            ItemKind::ArticleMagazine => "article-magazine",
            ItemKind::ArticleNewspaper => "article-newspaper",
            ItemKind::Article => "article",
            ItemKind::PaperConference => "paper-conference",
            ItemKind::Book => "book",
            ItemKind::Chapter => "chapter",
            ItemKind::Report => "report",
            ItemKind::Thesis => "thesis",
            ItemKind::Webpage => "webpage",
            ItemKind::Dataset => "dataset",
            ItemKind::Other(name) => name,
        }
    }
}

/// A personal name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub family: String,
    pub given: Option<String>,
}

impl PersonName {
    pub fn new(family: impl Into<String>, given: Option<&str>) -> Self {
        Self {
            family: family.into(),
            given: given.map(str::to_string),
        }
    }
}

/// A normalized citation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCitationRecord {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub authors: Vec<PersonName>,
    /// `[year, month?, day?]`. `Some(vec![])` means the date was present but empty.
    pub issued: Option<Vec<i32>>,
    pub container_title: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub url: Option<String>,
}

impl CanonicalCitationRecord {
    /// A record with only the required fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, authors: Vec<PersonName>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::default(),
            title: title.into(),
            authors,
            issued: None,
            container_title: None,
            volume: None,
            issue: None,
            pages: None,
            url: None,
        }
    }

    /// The issued year, if any.
    pub fn year(&self) -> Option<i32> {
        self.issued.as_ref().and_then(|parts| parts.first().copied())
    }

    /// Names of the fields that keep this record from being rendered by rules.
    ///
    /// Empty when the record has authors, a non-blank title, and an issued year.
    pub fn missing_for_rendering(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.authors.is_empty() {
            missing.push("author");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.year().is_none() {
            missing.push("issued");
        }
        missing
    }

    /// Whether rules-based rendering may be attempted.
    pub fn is_renderable(&self) -> bool {
        self.missing_for_rendering().is_empty()
    }

    /// Ordinary (non-name, non-date) CSL variable by name.
    pub fn variable(&self, name: &str) -> Option<&str> {
        let value = match name {
            "id" | "citation-key" => Some(self.id.as_str()),
            "title" | "title-short" => Some(self.title.as_str()),
            "container-title" | "container-title-short" => self.container_title.as_deref(),
            "volume" => self.volume.as_deref(),
            "issue" => self.issue.as_deref(),
            "page" | "page-first" => self.pages.as_deref(),
            "URL" | "url" => self.url.as_deref(),
            _ => None,
        };
        let value = value.filter(|v| !v.trim().is_empty());

        if name == "page-first" {
            return value.and_then(|p| p.split(['-', '–', ',']).next()).map(str::trim);
        }
        value
    }

    /// Name variable by name. Only `author` is carried.
    pub fn names(&self, name: &str) -> &[PersonName] {
        match name {
            "author" => &self.authors,
            _ => &[],
        }
    }

    /// Date variable by name. Only `issued` is carried.
    pub fn date(&self, name: &str) -> Option<&[i32]> {
        match name {
            "issued" => self.issued.as_deref().filter(|parts| !parts.is_empty()),
            _ => None,
        }
    }

    /// CSL-JSON form of the record, omitting unset fields.
    pub fn to_csl_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".into(), json!(self.id));
        obj.insert("type".into(), json!(self.kind.as_str()));
        obj.insert("title".into(), json!(self.title));

        let authors: Vec<Value> = self
            .authors
            .iter()
            .map(|a| match &a.given {
                Some(given) => json!({ "family": a.family, "given": given }),
                None => json!({ "family": a.family }),
            })
            .collect();
        obj.insert("author".into(), Value::Array(authors));

        if let Some(parts) = &self.issued {
            obj.insert("issued".into(), json!({ "date-parts": [parts] }));
        }

        let optional = [
            ("container-title", &self.container_title),
            ("volume", &self.volume),
            ("issue", &self.issue),
            ("page", &self.pages),
            ("URL", &self.url),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                obj.insert(key.into(), json!(v));
            }
        }

        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vaswani() -> CanonicalCitationRecord {
        let mut record = CanonicalCitationRecord::new(
            "X1",
            "Attention Is All You Need",
            vec![PersonName::new("Vaswani", Some("Ashish"))],
        );
        record.issued = Some(vec![2017]);
        record
    }

    #[test]
    fn test_kind_round_trips_unknown_names() {
        assert_eq!(ItemKind::from_csl("book"), ItemKind::Book);
        assert_eq!(ItemKind::from_csl("patent").as_str(), "patent");
        assert_eq!(ItemKind::default().as_str(), "article-journal");
    }

    #[test]
    fn test_renderable_record() {
        assert!(vaswani().is_renderable());
    }

    #[test]
    fn test_missing_for_rendering_lists_each_field() {
        let mut record = CanonicalCitationRecord::new("X2", " ", Vec::new());
        record.issued = Some(Vec::new());
        assert_eq!(record.missing_for_rendering(), vec!["author", "title", "issued"]);
        assert!(!record.is_renderable());
    }

    #[test]
    fn test_page_first() {
        let mut record = vaswani();
        record.pages = Some("5998-6008".to_string());
        assert_eq!(record.variable("page-first"), Some("5998"));
    }

    #[test]
    fn test_empty_optional_variable_is_none() {
        let mut record = vaswani();
        record.volume = Some("  ".to_string());
        assert_eq!(record.variable("volume"), None);
    }

    #[test]
    fn test_to_csl_json_omits_unset_fields() {
        let value = vaswani().to_csl_json();
        assert_eq!(value["issued"]["date-parts"], json!([[2017]]));
        assert_eq!(value["author"][0]["given"], "Ashish");
        assert!(value.get("volume").is_none());
        assert!(value.get("URL").is_none());
    }
}
