//! Core data models for papers, analyses and stream events.

mod analysis;
mod event;
mod paper;

pub use analysis::{strip_code_fence, AnalysisResult};
pub use event::{ProgressStep, ResearchEvent, ResearchResult, SearchPhase, SearchState};
pub use paper::{
    normalize_papers, now_timestamp, parse_timestamp, Paper, PaperBuilder, RawPaper,
    DEFAULT_CATEGORY,
};
