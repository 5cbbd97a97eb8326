//! Score filtering and sorting of result sets.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::Paper;

/// How papers are ordered for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Highest reranker score first (missing scores count as zero)
    #[default]
    Score,
    /// Most recently published first
    Date,
    /// Order chosen by the backend
    Relevance,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SortMode::Score => "score",
            SortMode::Date => "date",
            SortMode::Relevance => "relevance",
        };
        write!(f, "{}", name)
    }
}

/// Filter and sort applied before papers are shown
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaperFilter {
    pub sort: SortMode,
    /// Papers scoring below this are hidden; 0 disables the filter
    pub min_score: f64,
    pub limit: Option<usize>,
}

impl PaperFilter {
    pub fn new(sort: SortMode) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a paper passes the score filter
    pub fn accepts(&self, paper: &Paper) -> bool {
        self.min_score <= 0.0 || paper.effective_score() >= self.min_score
    }

    /// Filtered, sorted copy of `papers`. The input order is kept for ties.
    pub fn apply<'a>(&self, papers: &'a [Paper]) -> Vec<&'a Paper> {
        let mut selected: Vec<&Paper> = papers.iter().filter(|p| self.accepts(p)).collect();

        match self.sort {
            SortMode::Score => selected.sort_by(|a, b| {
                b.effective_score()
                    .partial_cmp(&a.effective_score())
                    .unwrap_or(Ordering::Equal)
            }),
            SortMode::Date => selected.sort_by(|a, b| compare_published_desc(a, b)),
            SortMode::Relevance => {}
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Newest first; papers with unparsable dates sink to the end
fn compare_published_desc(a: &Paper, b: &Paper) -> Ordering {
    match (a.published_at(), b.published_at()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
