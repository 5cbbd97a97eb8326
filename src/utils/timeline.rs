//! Publication timeline: paper counts per year.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Paper;

/// Number of papers published in one year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

/// Count papers per publication year, oldest year first.
///
/// Papers whose publication date cannot be parsed are left out.
pub fn publication_timeline(papers: &[Paper]) -> Vec<YearCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in papers.iter().filter_map(Paper::published_year) {
        *counts.entry(year).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}
