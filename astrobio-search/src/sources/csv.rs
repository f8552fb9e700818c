//! Local CSV dataset source.
//!
//! Loads the bundled article list and Task Book project export once at
//! startup and answers queries with a case-insensitive substring match over
//! title, description and link. This is the primary source: when no dataset
//! could be loaded every fetch fails, which fails the whole search request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::SourceError;
use crate::normalize::{source_slug, RecordShape};
use crate::source::Source;
use crate::types::{RawRecord, SourceKind};

/// Attribution name for local results.
pub const LOCAL_SOURCE_NAME: &str = "Local Database";

/// Author used when a row names none.
const DEFAULT_AUTHOR: &str = "NASA Space Biology Database";

/// Tag attached to every local row.
const BASE_TAG: &str = "Space Biology";

const LOCAL_SHAPE: RecordShape = RecordShape {
    id: &["id"],
    title: &["title", "Title"],
    description: &["abstract", "Description", "description"],
    authors: &["authors"],
    date: &["date"],
    tags: &["tags"],
    link: &["link", "Link"],
    score: &["relevance_score"],
    result_type: &["type"],
    link_template: None,
    default_result_type: "Research Papers",
};

/// Title keyword → tag rules applied to every local row.
struct TagRule {
    keywords: &'static [&'static str],
    /// Match whole words only (short keywords like "iss" would otherwise
    /// hit "mission" or "tissue").
    whole_word: bool,
    tag: &'static str,
}

const TAG_RULES: &[TagRule] = &[
    TagRule { keywords: &["microgravity"], whole_word: false, tag: "Microgravity" },
    TagRule { keywords: &["plant", "arabidopsis"], whole_word: false, tag: "Plant Biology" },
    TagRule { keywords: &["bone", "skeletal"], whole_word: false, tag: "Bone Research" },
    TagRule { keywords: &["cell"], whole_word: false, tag: "Cell Biology" },
    TagRule { keywords: &["radiation"], whole_word: false, tag: "Space Radiation" },
    TagRule { keywords: &["muscle"], whole_word: false, tag: "Muscle Research" },
    TagRule { keywords: &["iss"], whole_word: true, tag: "ISS Research" },
    TagRule { keywords: &["technology"], whole_word: false, tag: "Technology Development" },
];

/// Column layout of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetLayout {
    /// `Title, Link, Description` (plus optional `Date, Author, Category, Tags`).
    Articles,
    /// NASA Task Book export: `title, abstract, url, principal_investigator,
    /// fiscal_year, research_area, keywords`.
    Taskbook,
}

impl DatasetLayout {
    fn columns(&self, field: Field) -> &'static [&'static str] {
        match (self, field) {
            (Self::Articles, Field::Title) => &["Title", "title"],
            (Self::Articles, Field::Description) => &["Description", "description", "abstract"],
            (Self::Articles, Field::Link) => &["Link", "link", "url"],
            (Self::Articles, Field::Author) => &["Author", "author"],
            (Self::Articles, Field::Date) => &["Date", "date"],
            (Self::Articles, Field::Category) => &["Category", "category"],
            (Self::Articles, Field::Tags) => &["Tags", "tags"],
            (Self::Taskbook, Field::Title) => &["title"],
            (Self::Taskbook, Field::Description) => &["abstract"],
            (Self::Taskbook, Field::Link) => &["url"],
            (Self::Taskbook, Field::Author) => &["principal_investigator"],
            (Self::Taskbook, Field::Date) => &["fiscal_year"],
            (Self::Taskbook, Field::Category) => &["research_area"],
            (Self::Taskbook, Field::Tags) => &["keywords"],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Description,
    Link,
    Author,
    Date,
    Category,
    Tags,
}

/// One CSV file to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    /// Path to the CSV file.
    pub path: PathBuf,
    /// Dataset label, e.g. "NASA Articles".
    pub label: String,
    /// Column layout of the file.
    pub layout: DatasetLayout,
}

/// The datasets shipped with the service.
pub fn default_datasets() -> Vec<DatasetFile> {
    vec![
        DatasetFile {
            path: PathBuf::from("data/sample_600_articles.csv"),
            label: "NASA Articles".into(),
            layout: DatasetLayout::Articles,
        },
        DatasetFile {
            path: PathBuf::from("data/taskbook_projects.csv"),
            label: "Task Book Projects".into(),
            layout: DatasetLayout::Taskbook,
        },
    ]
}

/// A loaded dataset row in the common articles layout.
#[derive(Debug, Clone, PartialEq)]
struct LocalRow {
    id: String,
    title: String,
    description: String,
    link: String,
    author: Option<String>,
    date: Option<String>,
    category: Option<String>,
    csv_tags: Vec<String>,
    dataset: String,
    layout: DatasetLayout,
}

impl LocalRow {
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.link.to_lowercase().contains(needle)
    }

    fn result_type(&self) -> &'static str {
        let lower = self.title.to_lowercase();
        if self.layout == DatasetLayout::Taskbook {
            "Task Book Grants"
        } else if self.title.contains("OSDR") || lower.contains("data") {
            "OSDR Data"
        } else if lower.contains("task") || lower.contains("project") {
            "Task Book Grants"
        } else {
            "Research Papers"
        }
    }

    fn abstract_text(&self) -> String {
        if !self.description.is_empty() && self.description != self.title {
            return self.description.clone();
        }
        let lower = self.title.to_lowercase();
        let suffix = if lower.contains("microgravity") {
            "Study focuses on microgravity effects and space biology research."
        } else if lower.contains("space") {
            "Research conducted in space environment conditions."
        } else {
            "Important findings for space exploration and astronaut health."
        };
        format!("NASA research article: {} - {suffix}", self.title)
    }

    fn tags(&self) -> Vec<String> {
        let mut tags = vec![BASE_TAG.to_owned()];
        if let Some(category) = &self.category {
            tags.push(category.clone());
        }
        let lower = self.title.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        for rule in TAG_RULES {
            let hit = rule.keywords.iter().any(|kw| {
                if rule.whole_word {
                    words.contains(kw)
                } else {
                    lower.contains(kw)
                }
            });
            if hit {
                tags.push(rule.tag.to_owned());
            }
        }
        tags.extend(self.csv_tags.iter().cloned());
        tags
    }

    fn to_record(&self) -> RawRecord {
        let mut record = RawRecord::new();
        let authors = vec![self.author.clone().unwrap_or_else(|| DEFAULT_AUTHOR.to_owned())];
        record.insert("id".into(), Value::from(self.id.clone()));
        record.insert("title".into(), Value::from(self.title.clone()));
        record.insert("abstract".into(), Value::from(self.abstract_text()));
        record.insert("link".into(), Value::from(self.link.clone()));
        record.insert("type".into(), Value::from(self.result_type()));
        record.insert("authors".into(), Value::from(authors));
        if let Some(date) = &self.date {
            record.insert("date".into(), Value::from(date.clone()));
        }
        record.insert("tags".into(), Value::from(self.tags()));
        record.insert("dataset".into(), Value::from(self.dataset.clone()));
        record
    }
}

/// Summary of the loaded local datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// `true` when at least one dataset loaded.
    pub loaded: bool,
    /// Total rows across all datasets.
    pub total_records: usize,
    /// Rows per dataset label.
    pub datasets: BTreeMap<String, usize>,
    /// Rows per display result type.
    pub result_types: BTreeMap<String, usize>,
}

/// Parse one dataset file's content into rows.
///
/// Rows that fail to parse are skipped with a warning.
///
/// # Errors
///
/// Returns an error when the header row cannot be read or the layout's
/// title column is absent.
fn parse_dataset(content: &str, file: &DatasetFile) -> Result<Vec<LocalRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| format!("unreadable header row: {e}"))?
        .clone();
    let column = |field: Field| {
        file.layout
            .columns(field)
            .iter()
            .find_map(|name| headers.iter().position(|h| h.trim() == *name))
    };

    let title_col = column(Field::Title).ok_or_else(|| "missing title column".to_owned())?;
    let description_col = column(Field::Description);
    let link_col = column(Field::Link);
    let author_col = column(Field::Author);
    let date_col = column(Field::Date);
    let category_col = column(Field::Category);
    let tags_col = column(Field::Tags);

    let dataset_slug = source_slug(&file.label);
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(dataset = %file.label, row = index, error = %e, "skipping unreadable CSV row");
                continue;
            }
        };
        let cell = |col: Option<usize>| -> Option<String> {
            let value = record.get(col?)?.trim();
            (!value.is_empty() && value != "nan").then(|| value.to_owned())
        };

        let title = cell(Some(title_col)).unwrap_or_default();
        let author = cell(author_col);
        let category = cell(category_col);
        let mut description = cell(description_col).unwrap_or_default();
        if file.layout == DatasetLayout::Articles && description.is_empty() {
            description = title.clone();
        }
        if file.layout == DatasetLayout::Taskbook && author_col.is_some() && category_col.is_some() {
            description = format!(
                "PI: {} | {} | {}",
                author.as_deref().unwrap_or_default(),
                category.as_deref().unwrap_or_default(),
                description
            );
        }
        let date = cell(date_col).map(|d| d.strip_prefix("FY ").map(str::to_owned).unwrap_or(d));
        let csv_tags = cell(tags_col)
            .filter(|t| t != "Not specified")
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        rows.push(LocalRow {
            id: format!("{dataset_slug}-{index}"),
            title,
            description,
            link: cell(link_col).unwrap_or_default(),
            author,
            date,
            category,
            csv_tags,
            dataset: file.label.clone(),
            layout: file.layout,
        });
    }
    Ok(rows)
}

/// The local dataset source backed by CSV files.
#[derive(Debug, Clone)]
pub struct CsvSource {
    rows: Vec<LocalRow>,
    timeout_ms: u64,
    loaded_datasets: Vec<String>,
}

impl CsvSource {
    /// Load every dataset that exists; missing or unreadable files are
    /// skipped with a warning.
    pub async fn load(datasets: &[DatasetFile], timeout_ms: u64) -> Self {
        let mut source = Self::empty(timeout_ms);
        for file in datasets {
            match tokio::fs::read_to_string(&file.path).await {
                Ok(content) => source.add_dataset(&content, file),
                Err(e) => {
                    tracing::warn!(
                        dataset = %file.label,
                        path = %file.path.display(),
                        error = %e,
                        "dataset file not loaded"
                    );
                }
            }
        }
        if source.loaded_datasets.is_empty() {
            tracing::warn!("no local datasets loaded; searches will fail until data is available");
        } else {
            tracing::info!(
                datasets = ?source.loaded_datasets,
                rows = source.rows.len(),
                "local datasets loaded"
            );
        }
        source
    }

    /// Build a source directly from CSV text.
    pub fn from_csv_str(content: &str, label: &str, layout: DatasetLayout, timeout_ms: u64) -> Self {
        let mut source = Self::empty(timeout_ms);
        let file = DatasetFile {
            path: PathBuf::from(format!("{label}.csv")),
            label: label.to_owned(),
            layout,
        };
        source.add_dataset(content, &file);
        source
    }

    fn empty(timeout_ms: u64) -> Self {
        Self {
            rows: Vec::new(),
            timeout_ms,
            loaded_datasets: Vec::new(),
        }
    }

    fn add_dataset(&mut self, content: &str, file: &DatasetFile) {
        match parse_dataset(content, file) {
            Ok(rows) => {
                tracing::debug!(dataset = %file.label, rows = rows.len(), "dataset parsed");
                self.rows.extend(rows);
                self.loaded_datasets.push(file.label.clone());
            }
            Err(e) => {
                tracing::warn!(dataset = %file.label, path = %file.path.display(), error = %e, "dataset rejected");
            }
        }
    }

    /// `true` when at least one dataset loaded.
    pub fn is_loaded(&self) -> bool {
        !self.loaded_datasets.is_empty()
    }

    /// Row counts per dataset and result type.
    pub fn stats(&self) -> DatasetStats {
        let mut datasets = BTreeMap::new();
        let mut result_types = BTreeMap::new();
        for label in &self.loaded_datasets {
            datasets.entry(label.clone()).or_insert(0);
        }
        for row in &self.rows {
            *datasets.entry(row.dataset.clone()).or_insert(0) += 1;
            *result_types.entry(row.result_type().to_owned()).or_insert(0) += 1;
        }
        DatasetStats {
            loaded: self.is_loaded(),
            total_records: self.rows.len(),
            datasets,
            result_types,
        }
    }
}

#[async_trait]
impl Source for CsvSource {
    fn name(&self) -> &str {
        LOCAL_SOURCE_NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn shape(&self) -> &RecordShape {
        &LOCAL_SHAPE
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceError> {
        if !self.is_loaded() {
            return Err(SourceError::Unavailable("no local datasets loaded".into()));
        }
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<RawRecord> = self
            .rows
            .iter()
            .filter(|row| row.matches(&needle))
            .take(limit)
            .map(LocalRow::to_record)
            .collect();
        tracing::debug!(count = records.len(), "local dataset matches");
        Ok(records)
    }
}
