//! Application events decoded from the research stream, and the search state
//! they drive.

use serde::{Deserialize, Serialize};

use super::{AnalysisResult, Paper};

/// Coarse phase of a research session as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    GeneratingQuery,
    FetchingPapers,
    Analyzing,
    Success,
    Error,
}

impl SearchPhase {
    /// Wire/display identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchPhase::Idle => "idle",
            SearchPhase::GeneratingQuery => "generating_query",
            SearchPhase::FetchingPapers => "fetching_papers",
            SearchPhase::Analyzing => "analyzing",
            SearchPhase::Success => "success",
            SearchPhase::Error => "error",
        }
    }

    /// Whether a request is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SearchPhase::GeneratingQuery | SearchPhase::FetchingPapers | SearchPhase::Analyzing
        )
    }
}

impl std::fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Step name reported by the producer in a `progress` line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgressStep {
    Analyzing,
    Searching,
    Reranking,
    /// A step this client does not know about
    Other(String),
}

impl ProgressStep {
    /// Parse a producer step name
    pub fn from_wire(step: &str) -> Self {
        match step {
            "analyzing" => ProgressStep::Analyzing,
            "searching" => ProgressStep::Searching,
            "reranking" => ProgressStep::Reranking,
            other => ProgressStep::Other(other.to_string()),
        }
    }

    /// Producer step name
    pub fn as_str(&self) -> &str {
        match self {
            ProgressStep::Analyzing => "analyzing",
            ProgressStep::Searching => "searching",
            ProgressStep::Reranking => "reranking",
            ProgressStep::Other(s) => s,
        }
    }

    /// Map onto the coarser UI phase.
    ///
    /// Unknown steps fall back to [`SearchPhase::GeneratingQuery`].
    pub fn phase(&self) -> SearchPhase {
        match self {
            ProgressStep::Analyzing => SearchPhase::GeneratingQuery,
            ProgressStep::Searching => SearchPhase::FetchingPapers,
            ProgressStep::Reranking => SearchPhase::Analyzing,
            ProgressStep::Other(_) => SearchPhase::GeneratingQuery,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ProgressStep::Other(_))
    }
}

/// Final payload of a research session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub papers: Vec<Paper>,
    pub analysis: AnalysisResult,
}

/// One whole event decoded from the stream
///
/// Producer-signalled errors never appear here: they end the decode session
/// as [`StreamError::Producer`](crate::stream::StreamError::Producer).
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchEvent {
    Progress {
        step: ProgressStep,
        phase: SearchPhase,
        message: String,
    },
    Result(ResearchResult),
}

impl ResearchEvent {
    /// Build a progress event, deriving the phase from the step
    pub fn progress(step: ProgressStep, message: impl Into<String>) -> Self {
        ResearchEvent::Progress {
            phase: step.phase(),
            step,
            message: message.into(),
        }
    }

    /// Phase the UI should show after this event
    pub fn phase(&self) -> SearchPhase {
        match self {
            ResearchEvent::Progress { phase, .. } => *phase,
            ResearchEvent::Result(_) => SearchPhase::Success,
        }
    }

    pub fn as_result(&self) -> Option<&ResearchResult> {
        match self {
            ResearchEvent::Result(result) => Some(result),
            ResearchEvent::Progress { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<ResearchResult> {
        match self {
            ResearchEvent::Result(result) => Some(result),
            ResearchEvent::Progress { .. } => None,
        }
    }
}

/// What the user sees: an in-progress message or one terminal outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub phase: SearchPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchState {
    /// State right after a request is submitted
    pub fn started() -> Self {
        Self {
            phase: SearchPhase::GeneratingQuery,
            message: Some("Starting research...".to_string()),
        }
    }

    /// Fold an event into the state
    pub fn apply(&mut self, event: &ResearchEvent) {
        match event {
            ResearchEvent::Progress { phase, message, .. } => {
                self.phase = *phase;
                self.message = Some(message.clone());
            }
            ResearchEvent::Result(_) => {
                self.phase = SearchPhase::Success;
                self.message = None;
            }
        }
    }

    /// Record a terminal failure
    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = SearchPhase::Error;
        self.message = Some(message.into());
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }
}
