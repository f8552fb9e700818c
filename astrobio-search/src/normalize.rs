//! Record normalisation: heterogeneous raw records → [`SearchResult`].
//!
//! Each source describes its record layout with a [`RecordShape`]: for every
//! target field, the candidate source field names in priority order. The
//! normaliser tries candidates in order and takes the first non-empty value.
//! Normalisation is pure; it performs no I/O and keeps no state.

use serde_json::Value;

use crate::error::MalformedRecord;
use crate::types::{RawRecord, SearchResult, SourceKind};

/// Title used when a record has no usable title field.
pub const UNTITLED: &str = "Untitled";

/// Relevance assigned when neither the record nor the source has a score.
pub const DEFAULT_RELEVANCE: f64 = 0.5;

/// Link used when a record has neither a link nor a link-template key.
pub const MISSING_LINK: &str = "#";

/// Object members consulted when a list element is an object
/// (e.g. CKAN tags `{"display_name": "..."}`).
const OBJECT_LABEL_KEYS: &[&str] = &["display_name", "name", "title"];

/// Builds a link from a record field, e.g. `https://ntrs.nasa.gov/citations/{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTemplate {
    /// Pattern with a single `{}` placeholder.
    pub pattern: &'static str,
    /// Candidate fields whose value fills the placeholder.
    pub keys: &'static [&'static str],
}

/// Declarative field mapping for one source's record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    pub id: &'static [&'static str],
    pub title: &'static [&'static str],
    pub description: &'static [&'static str],
    pub authors: &'static [&'static str],
    pub date: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub link: &'static [&'static str],
    pub score: &'static [&'static str],
    pub result_type: &'static [&'static str],
    /// Fallback link construction when no `link` candidate is present.
    pub link_template: Option<LinkTemplate>,
    /// Result type used when no `result_type` candidate is present.
    pub default_result_type: &'static str,
}

impl RecordShape {
    fn all_candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            self.id,
            self.title,
            self.description,
            self.authors,
            self.date,
            self.tags,
            self.link,
            self.result_type,
        ]
        .into_iter()
        .flatten()
        .copied()
    }
}

/// Attribution details of the source a record came from.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub name: &'a str,
    pub kind: SourceKind,
    /// Prior relevance for records without an explicit score.
    pub base_score: Option<f64>,
}

/// Normalise one raw record into a [`SearchResult`].
///
/// `position` is the record's index within its source's response and is
/// only used to build a fallback id.
///
/// # Errors
///
/// Returns [`MalformedRecord`] when the record carries none of the fields
/// named by `shape`. A record with content but no title is kept and titled
/// [`UNTITLED`].
pub fn normalize(
    record: &RawRecord,
    shape: &RecordShape,
    source: SourceContext<'_>,
    position: usize,
) -> Result<SearchResult, MalformedRecord> {
    if !shape
        .all_candidates()
        .any(|key| record.get(key).is_some_and(has_content))
    {
        return Err(MalformedRecord {
            source_name: source.name.to_owned(),
        });
    }

    let slug = source_slug(source.name);
    let raw_id = first_string(record, shape.id).unwrap_or_else(|| position.to_string());
    let link = first_string(record, shape.link)
        .or_else(|| {
            shape.link_template.and_then(|template| {
                first_string(record, template.keys)
                    .map(|key| template.pattern.replacen("{}", &key, 1))
            })
        })
        .unwrap_or_else(|| MISSING_LINK.to_owned());
    let relevance_score = first_score(record, shape.score)
        .or(source.base_score)
        .unwrap_or(DEFAULT_RELEVANCE)
        .clamp(0.0, 1.0);

    Ok(SearchResult {
        id: format!("{slug}:{raw_id}"),
        title: first_string(record, shape.title).unwrap_or_else(|| UNTITLED.to_owned()),
        description: first_string(record, shape.description).unwrap_or_default(),
        authors: first_list(record, shape.authors),
        published_date: first_string(record, shape.date),
        tags: dedup_case_insensitive(first_list(record, shape.tags)),
        result_type: first_string(record, shape.result_type)
            .unwrap_or_else(|| shape.default_result_type.to_owned()),
        source_name: source.name.to_owned(),
        source_kind: source.kind,
        relevance_score,
        link,
    })
}

/// Lowercase, hyphen-separated form of a source name (`"NASA NTRS"` → `"nasa-ntrs"`).
pub fn source_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("source");
    }
    slug
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(has_content),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_string(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(scalar_string)
}

fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => OBJECT_LABEL_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(scalar_string),
        other => scalar_string(other),
    }
}

fn list_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(list_item).collect(),
        other => list_item(other).into_iter().collect(),
    }
}

fn first_list(record: &RawRecord, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .map(list_values)
        .find(|values| !values.is_empty())
        .unwrap_or_default()
}

fn first_score(record: &RawRecord, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|score| score.is_finite())
}

fn dedup_case_insensitive(values: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let folded = value.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            out.push(value);
        }
    }
    out
}
