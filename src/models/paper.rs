//! Paper model and the normalization of raw paper records from the research stream.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Category assigned when the producer sends no categories at all
pub const DEFAULT_CATEGORY: &str = "Research";

/// A research paper as presented to the user
///
/// Every field is populated: the fallbacks in [`RawPaper::normalize`] guarantee
/// a non-empty `id`, valid timestamps and at least the default category when
/// the producer omitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Unique identifier (the paper URL or arXiv entry id)
    pub id: String,

    /// Paper title
    pub title: String,

    /// Abstract text
    pub summary: String,

    /// Author names in producer order
    pub authors: Vec<String>,

    /// Publication timestamp
    pub published: String,

    /// Last updated timestamp
    pub updated: String,

    /// External link (landing page or PDF)
    pub link: String,

    /// Category tags
    pub categories: Vec<String>,

    /// Relevance score assigned by the reranker (observed range 0-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Free-text justification for the score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Paper {
    /// Parse the publication timestamp
    ///
    /// Accepts RFC 3339 (`2024-03-01T12:00:00Z`), the space-separated form the
    /// backend emits (`2024-03-01 12:00:00+00:00`) and bare dates.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.published)
    }

    /// Year of publication, if the timestamp can be parsed
    pub fn published_year(&self) -> Option<i32> {
        self.published_at().map(|d| d.year())
    }

    /// Score used for filtering and ranking (missing scores count as zero)
    pub fn effective_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }

    /// First category tag
    pub fn primary_category(&self) -> &str {
        self.categories
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Author line shortened to three names, followed by "et al." when longer
    pub fn author_line(&self) -> String {
        let shown = self
            .authors
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if self.authors.len() > 3 {
            format!("{} et al.", shown)
        } else {
            shown
        }
    }
}

/// Parse the timestamp formats seen in paper records.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Current time in the format used for defaulted timestamps
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Text field: strings as-is, numbers and booleans as their JSON text
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

/// Unix epoch seconds (or milliseconds) as an RFC 3339 timestamp
fn epoch_timestamp(epoch: i64) -> Option<String> {
    let instant = if epoch.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };
    instant.map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => n.as_i64().and_then(epoch_timestamp),
        _ => None,
    })
}

fn author_name(value: Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name),
        Value::Object(mut fields) => match fields.remove("name") {
            Some(Value::String(name)) => Some(name),
            _ => None,
        },
        _ => None,
    }
}

/// Authors as a list of names or `{"name": ..}` objects, or one `;`-joined string.
/// Entries of any other shape are skipped.
fn lenient_authors<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => Some(entries.into_iter().filter_map(author_name).collect()),
        Value::String(joined) => Some(
            joined
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        author @ Value::Object(_) => author_name(author).map(|name| vec![name]),
        _ => None,
    })
}

/// Categories as a list of strings or a single string
fn lenient_categories<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => Some(
            entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::String(category) => Some(category),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(category) if !category.trim().is_empty() => Some(vec![category]),
        _ => None,
    })
}

/// Reranker scores are usually numbers but occasionally quoted
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A paper record as the producer sent it
///
/// Every field is optional and tolerant of the wrong JSON type: a value that
/// cannot be read is treated as missing, so one bad field never loses the
/// record. See [`RawPaper::normalize`] for the fallback applied to each field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPaper {
    #[serde(deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub entry_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub pdf_url: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub summary: Option<String>,
    #[serde(deserialize_with = "lenient_authors")]
    pub authors: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub published: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated: Option<String>,
    #[serde(deserialize_with = "lenient_categories")]
    pub categories: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_score")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub reason: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl RawPaper {
    /// Normalize into a [`Paper`].
    ///
    /// - `id`: `url`, else `entry_id`, else `pdf_url`, else `paper-{position}`
    /// - `link`: `url`, else `pdf_url`, else `entry_id`, else empty
    /// - `authors`: missing becomes empty; a `;`-joined string is split
    /// - `published` / `updated`: missing becomes `now`
    /// - `categories`: missing becomes `["Research"]`
    ///
    /// `position` is the 1-based position of the record in its result set.
    pub fn normalize(self, position: usize, now: &str) -> Paper {
        let url = present(self.url);
        let entry_id = present(self.entry_id);
        let pdf_url = present(self.pdf_url);

        let id = url
            .clone()
            .or_else(|| entry_id.clone())
            .or_else(|| pdf_url.clone())
            .unwrap_or_else(|| format!("paper-{}", position));
        let link = url.or(pdf_url).or(entry_id).unwrap_or_default();

        Paper {
            id,
            title: self.title.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            authors: self.authors.unwrap_or_default(),
            published: present(self.published).unwrap_or_else(|| now.to_string()),
            updated: present(self.updated).unwrap_or_else(|| now.to_string()),
            link,
            categories: self
                .categories
                .unwrap_or_else(|| vec![DEFAULT_CATEGORY.to_string()]),
            score: self.score,
            reason: self.reason,
        }
    }
}

/// Normalize a result set, stamping defaulted timestamps with a single `now`.
pub fn normalize_papers(raw: Vec<RawPaper>) -> Vec<Paper> {
    let now = now_timestamp();
    raw.into_iter()
        .enumerate()
        .map(|(i, paper)| paper.normalize(i + 1, &now))
        .collect()
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            paper: Paper {
                id: id.into(),
                title: title.into(),
                summary: String::new(),
                authors: Vec::new(),
                published: now.clone(),
                updated: now,
                link: link.into(),
                categories: vec![DEFAULT_CATEGORY.to_string()],
                score: None,
                reason: None,
            },
        }
    }

    /// Set abstract
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.paper.summary = summary.into();
        self
    }

    /// Add an author
    pub fn author(mut self, name: impl Into<String>) -> Self {
        self.paper.authors.push(name.into());
        self
    }

    /// Set publication date
    pub fn published(mut self, date: impl Into<String>) -> Self {
        self.paper.published = date.into();
        self
    }

    /// Set updated date
    pub fn updated(mut self, date: impl Into<String>) -> Self {
        self.paper.updated = date.into();
        self
    }

    /// Replace the categories
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paper.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set relevance score
    pub fn score(mut self, score: f64) -> Self {
        self.paper.score = Some(score);
        self
    }

    /// Set score justification
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.paper.reason = Some(reason.into());
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}
