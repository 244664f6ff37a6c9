//! Shaping raw CSL-JSON into [`CanonicalCitationRecord`]s.
//!
//! Both the snake_case spelling used by the paper catalog (`container_title`,
//! `issued.date_parts`) and the CSL-JSON spelling (`container-title`,
//! `issued["date-parts"]`) are accepted. Every problem is collected before
//! failing, so callers see the full list at once.

use crate::error::{FieldProblem, ValidationError};
use crate::record::{CanonicalCitationRecord, ItemKind, PersonName};
use serde_json::{Map, Value};

/// Normalize a raw record.
///
/// # Example
///
/// ```rust
/// use papervista_citeproc::normalize;
/// use serde_json::json;
///
/// let record = normalize(&json!({
///     "id": 42,
///     "title": "Attention Is All You Need",
///     "author": [{"family": "Vaswani", "given": "Ashish"}],
///     "issued": {"date_parts": [[2017]]},
///     "volume": 30
/// })).unwrap();
///
/// assert_eq!(record.id, "42");
/// assert_eq!(record.year(), Some(2017));
/// assert_eq!(record.volume.as_deref(), Some("30"));
/// assert!(record.url.is_none());
/// ```
pub fn normalize(raw: &Value) -> Result<CanonicalCitationRecord, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError {
            problems: vec![FieldProblem::new("$", "expected a JSON object")],
        });
    };

    let mut problems = Vec::new();

    let id = match field(obj, &["id"]) {
        None => {
            problems.push(FieldProblem::new("id", "is required"));
            None
        }
        Some(value) => match scalar_string(value) {
            Some(id) if !id.is_empty() => Some(id),
            Some(_) => {
                problems.push(FieldProblem::new("id", "must not be empty"));
                None
            }
            None => {
                problems.push(FieldProblem::new("id", "must be a string or number"));
                None
            }
        },
    };

    let kind = field(obj, &["type", "kind"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(ItemKind::default, ItemKind::from_csl);

    let title = match field(obj, &["title"]) {
        None => {
            problems.push(FieldProblem::new("title", "is required"));
            None
        }
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::String(_)) => {
            problems.push(FieldProblem::new("title", "must not be empty"));
            None
        }
        Some(_) => {
            problems.push(FieldProblem::new("title", "must be a string"));
            None
        }
    };

    let authors = match field(obj, &["author", "authors"]) {
        None => {
            problems.push(FieldProblem::new("author", "is required"));
            Vec::new()
        }
        Some(value) => normalize_authors(value, &mut problems),
    };

    // Optional fields never fail validation: anything unusable stays unset.
    let issued = field(obj, &["issued"]).and_then(issued_parts);
    let optional = |names: &[&str]| -> Option<String> {
        field(obj, names)
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
    };

    let container_title = optional(&["container_title", "container-title"]);
    let volume = optional(&["volume"]);
    let issue = optional(&["issue"]);
    let pages = optional(&["page", "pages"]);
    let url = optional(&["URL", "url"]);

    match (id, title) {
        (Some(id), Some(title)) if problems.is_empty() => Ok(CanonicalCitationRecord {
            id,
            kind,
            title,
            authors,
            issued,
            container_title,
            volume,
            issue,
            pages,
            url,
        }),
        _ => Err(ValidationError { problems }),
    }
}

/// The raw record with nulls and empty values removed, recursively.
///
/// This is what survives a failed normalization and is handed to the
/// fallback generator.
pub fn partial_data(raw: &Value) -> Value {
    strip_empty(raw).unwrap_or_else(|| Value::Object(Map::new()))
}

/// Best-effort identifier of a raw record, for provenance on failure paths.
pub fn raw_id(raw: &Value) -> Option<String> {
    raw.as_object()
        .and_then(|obj| field(obj, &["id"]))
        .and_then(scalar_string)
        .filter(|id| !id.is_empty())
}

fn strip_empty(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.iter().filter_map(strip_empty).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(obj) => {
            let obj: Map<String, Value> = obj
                .iter()
                .filter_map(|(k, v)| strip_empty(v).map(|v| (k.clone(), v)))
                .collect();
            (!obj.is_empty()).then_some(Value::Object(obj))
        }
        other => Some(other.clone()),
    }
}

/// First present, non-null field among `names`.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|value| !value.is_null())
}

/// Trimmed string form of a string or number.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_authors(value: &Value, problems: &mut Vec<FieldProblem>) -> Vec<PersonName> {
    let Some(items) = value.as_array() else {
        problems.push(FieldProblem::new("author", "must be a list of names"));
        return Vec::new();
    };
    if items.is_empty() {
        problems.push(FieldProblem::new("author", "must not be empty"));
        return Vec::new();
    }

    let mut authors = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let path = format!("author[{}]", i);
        let Some(name) = item.as_object() else {
            problems.push(FieldProblem::new(path, "must be an object"));
            continue;
        };

        let family = match name.get("family") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                problems.push(FieldProblem::new(format!("{}.family", path), "is required"));
                continue;
            }
            Some(_) => {
                problems.push(FieldProblem::new(format!("{}.family", path), "must be a string"));
                continue;
            }
        };

        let given = match name.get("given") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim()).filter(|s| !s.is_empty()),
            Some(_) => {
                problems.push(FieldProblem::new(format!("{}.given", path), "must be a string"));
                continue;
            }
        };

        authors.push(PersonName::new(family, given));
    }
    authors
}

/// Date parts of a raw `issued` value.
///
/// Accepts `{"date-parts": [[y, m, d]]}`, `{"date_parts": ...}`,
/// `{"raw": "2017-06-12"}`, `[[y, m]]`, `[y]`, a bare year, or a date string.
/// Components may be integers or numeric strings; parsing stops at the first
/// one that is neither, so `[[2017, "Spring"]]` gives `[2017]`. Returns
/// `None` for values with no date shape at all.
pub fn issued_parts(value: &Value) -> Option<Vec<i32>> {
    match value {
        Value::Object(obj) => field(obj, &["date-parts", "date_parts"])
            .or_else(|| field(obj, &["raw", "literal"]))
            .and_then(issued_parts),
        Value::Array(items) => match items.first() {
            None => Some(Vec::new()),
            Some(Value::Array(first)) => Some(leading_parts(first)),
            Some(_) => Some(leading_parts(items)),
        },
        Value::Number(_) => Some(leading_parts(std::slice::from_ref(value))),
        Value::String(s) => {
            let parts: Vec<Value> = s
                .trim()
                .split('-')
                .filter(|p| !p.is_empty())
                .map(|p| Value::String(p.to_string()))
                .collect();
            Some(leading_parts(&parts))
        }
        _ => None,
    }
}

fn leading_parts(items: &[Value]) -> Vec<i32> {
    items
        .iter()
        .take(3)
        .map_while(|item| match item {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        })
        .collect()
}
