//! Analysis of a result set produced by the language-model collaborator.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Summary, trends and suggested directions for a research idea
///
/// All three fields are always present. Missing or `null` fields in the
/// producer payload become empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub key_trends: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_directions: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

static CODE_FENCE: OnceLock<Regex> = OnceLock::new();

/// Strip a surrounding Markdown code fence (```json ... ```) if present.
pub fn strip_code_fence(text: &str) -> &str {
    let re = CODE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid code fence pattern")
    });
    match re.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

impl AnalysisResult {
    /// Create an analysis carrying only a summary
    pub fn from_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    /// Whether the producer supplied nothing at all
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.key_trends.is_empty() && self.suggested_directions.is_empty()
    }

    /// Normalize the `analysis` member of a result payload.
    ///
    /// - object: deserialized, every field defaulted
    /// - string: parsed as JSON (after stripping a code fence); text that is
    ///   not a JSON object becomes the summary
    /// - `null`: empty analysis
    ///
    /// Any other JSON type, or an object whose fields have the wrong types,
    /// is an error.
    pub fn from_payload(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => serde_json::from_value(value),
            Value::String(text) => {
                let body = strip_code_fence(&text);
                if body.is_empty() {
                    return Ok(Self::default());
                }
                match serde_json::from_str::<Value>(body) {
                    Ok(parsed @ Value::Object(_)) => serde_json::from_value(parsed),
                    _ => Ok(Self::from_summary(text.trim())),
                }
            }
            other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "analysis must be an object or a string, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_encoded_string() {
        let analysis = AnalysisResult::from_payload(json!(
            "{\"summary\":\"ok\",\"keyTrends\":[],\"suggestedDirections\":[]}"
        ))
        .unwrap();
        assert_eq!(analysis, AnalysisResult::from_summary("ok"));
    }

    #[test]
    fn test_from_object_with_missing_and_null_fields() {
        let analysis = AnalysisResult::from_payload(json!({
            "summary": "Strategy",
            "keyTrends": ["Sparse views", "Diffusion priors"],
            "suggestedDirections": null
        }))
        .unwrap();
        assert_eq!(analysis.summary, "Strategy");
        assert_eq!(analysis.key_trends.len(), 2);
        assert!(analysis.suggested_directions.is_empty());

        let analysis = AnalysisResult::from_payload(json!({})).unwrap();
        assert!(analysis.is_empty());
    }

    #[test]
    fn test_from_fenced_string() {
        let text = "```json\n{\"summary\": \"fenced\", \"keyTrends\": [\"a\"]}\n```";
        let analysis = AnalysisResult::from_payload(json!(text)).unwrap();
        assert_eq!(analysis.summary, "fenced");
        assert_eq!(analysis.key_trends, vec!["a"]);
    }

    #[test]
    fn test_plain_text_becomes_summary() {
        let analysis =
            AnalysisResult::from_payload(json!("No papers found. Try a broader query.")).unwrap();
        assert_eq!(analysis.summary, "No papers found. Try a broader query.");
        assert!(analysis.key_trends.is_empty());
    }

    #[test]
    fn test_null_and_invalid_types() {
        assert!(AnalysisResult::from_payload(Value::Null).unwrap().is_empty());
        assert!(AnalysisResult::from_payload(json!(42)).is_err());
        assert!(AnalysisResult::from_payload(json!({"keyTrends": "not a list"})).is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(AnalysisResult::from_summary("s")).unwrap();
        assert_eq!(
            value,
            json!({"summary": "s", "keyTrends": [], "suggestedDirections": []})
        );
    }
}
