//! Classification of a single NDJSON line into an application event.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{
    normalize_papers, AnalysisResult, ProgressStep, RawPaper, ResearchEvent, ResearchResult,
};

/// Message used when an `error` line carries none
pub const DEFAULT_ERROR_MESSAGE: &str = "The research backend reported an error";

/// Outcome of parsing one raw line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Empty or whitespace-only
    Blank,
    /// A progress or result event
    Event(ResearchEvent),
    /// `type == "error"`: the session must fail with this message
    Failure(String),
    /// Valid JSON without a recognised `type`
    Ignored { kind: Option<String> },
    /// The line could not be turned into an event
    Malformed {
        error: String,
        /// The line is recognisably a `result` line
        result_line: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ResultPayload {
    #[serde(default, deserialize_with = "papers_or_empty")]
    papers: Vec<RawPaper>,
    #[serde(default)]
    analysis: Value,
}

/// Paper records; list entries that are not JSON objects are skipped
fn papers_or_empty<'de, D>(deserializer: D) -> Result<Vec<RawPaper>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(<D::Error as serde::de::Error>::custom(
                "`papers` must be a list of paper records",
            ))
        }
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(paper) => Some(paper),
            Err(err) => {
                debug!("Skipping unreadable paper record: {}", err);
                None
            }
        })
        .collect())
}

static RESULT_TYPE: OnceLock<Regex> = OnceLock::new();

/// Whether unparsable text still announces itself as a `result` line
fn mentions_result_type(line: &str) -> bool {
    RESULT_TYPE
        .get_or_init(|| Regex::new(r#""type"\s*:\s*"result""#).expect("valid result pattern"))
        .is_match(line)
}

/// Parse one raw line (without its terminating newline).
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Blank;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            return ParsedLine::Malformed {
                error: err.to_string(),
                result_line: mentions_result_type(line),
            }
        }
    };

    match value.get("type").and_then(Value::as_str) {
        Some("progress") => ParsedLine::Event(parse_progress(&value)),
        Some("result") => match parse_result(value) {
            Ok(result) => ParsedLine::Event(ResearchEvent::Result(result)),
            Err(err) => ParsedLine::Malformed {
                error: err.to_string(),
                result_line: true,
            },
        },
        Some("error") => ParsedLine::Failure(
            text_field(&value, "message").unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        ),
        other => ParsedLine::Ignored {
            kind: other.map(str::to_string),
        },
    }
}

/// String member, or the JSON text of a non-string member
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_progress(value: &Value) -> ResearchEvent {
    let step = value.get("step").and_then(Value::as_str).unwrap_or_default();
    let message = text_field(value, "message").unwrap_or_default();
    ResearchEvent::progress(ProgressStep::from_wire(step), message)
}

fn parse_result(mut value: Value) -> Result<ResearchResult, serde_json::Error> {
    let data = match value.get_mut("data").map(Value::take) {
        Some(data @ Value::Object(_)) => data,
        Some(_) | None => {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "result line has no `data` object",
            ))
        }
    };
    let payload: ResultPayload = serde_json::from_value(data)?;
    Ok(ResearchResult {
        papers: normalize_papers(payload.papers),
        analysis: AnalysisResult::from_payload(payload.analysis)?,
    })
}
