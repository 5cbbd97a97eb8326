//! Utility modules for working with result sets.
//!
//! - [`PaperFilter`]: minimum-score filter plus [`SortMode`] ordering
//! - [`publication_timeline`]: paper counts per publication year
//!
//! # Filtering
//!
//! ```rust
//! use arxiv_mind::models::Paper;
//! use arxiv_mind::utils::{PaperFilter, SortMode};
//!
//! # fn example(papers: Vec<Paper>) {
//! // Best-scored papers first, hiding anything below 5
//! let shown = PaperFilter::new(SortMode::Score).min_score(5.0).apply(&papers);
//! # }
//! ```

mod timeline;
mod view;

pub use timeline::{publication_timeline, YearCount};
pub use view::{PaperFilter, SortMode};
