//! Verdict types and the two ways of reading them out of a model reply.

use crate::error::{EvaluatorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Highest score a verdict can carry.
pub const MAX_SCORE: u8 = 100;

/// A condition the document failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub condition: String,
    pub description: String,
    pub location: String,
}

/// The model's decision about a document.
///
/// `accept` and `score` are reported as the model gave them; nothing checks
/// that they agree with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub accept: bool,
    pub score: u8,
    pub issues: Vec<Issue>,
}

/// Read a verdict out of free-form model text.
///
/// Markdown fences and prose around the JSON object are ignored, quoted
/// booleans and numbers are accepted, and missing fields take their zero
/// value. An empty object yields `None`.
pub fn parse_lenient(content: &str) -> Result<Option<EvaluationResult>> {
    let json_str = extract_json(content);
    let value: Value = serde_json::from_str(&json_str).map_err(|e| {
        EvaluatorError::LlmParse(format!(
            "{}. Response: {}",
            e,
            truncate(content, 200)
        ))
    })?;

    let object = value.as_object().ok_or_else(|| {
        EvaluatorError::LlmParse(format!("expected a JSON object, got: {}", truncate(content, 200)))
    })?;

    if object.is_empty() {
        return Ok(None);
    }

    let accept = match object.get("accept") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(other) => {
            return Err(EvaluatorError::LlmParse(format!(
                "'accept' is not a boolean: {}",
                other
            )));
        }
    };

    let score = match object.get("score") {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
            EvaluatorError::LlmParse(format!("'score' is not an integer: {:?}", s))
        })?,
        Some(other) => {
            return Err(EvaluatorError::LlmParse(format!(
                "'score' is not an integer: {}",
                other
            )));
        }
    };

    let issues = match object.get("issues") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(lenient_issue).collect::<Result<_>>()?,
        Some(other) => {
            return Err(EvaluatorError::LlmParse(format!(
                "'issues' is not an array: {}",
                other
            )));
        }
    };

    Ok(Some(EvaluationResult {
        accept,
        score: score.clamp(0, MAX_SCORE as i64) as u8,
        issues,
    }))
}

fn lenient_issue(item: &Value) -> Result<Issue> {
    let object = item.as_object().ok_or_else(|| {
        EvaluatorError::LlmParse(format!("issue is not an object: {}", item))
    })?;

    let field = |name: &str| match object.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(Issue {
        condition: field("condition"),
        description: field("description"),
        location: field("location"),
    })
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictVerdict {
    accept: bool,
    score: i64,
    issues: Vec<StrictIssue>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrictIssue {
    condition: String,
    description: String,
    location: String,
}

/// Read a verdict that must match the `validation_result` schema exactly.
pub fn parse_strict(content: &str) -> Result<EvaluationResult> {
    let raw: StrictVerdict = serde_json::from_str(content.trim()).map_err(|e| {
        EvaluatorError::SchemaViolation(format!("{}. Response: {}", e, truncate(content, 200)))
    })?;

    if !(0..=MAX_SCORE as i64).contains(&raw.score) {
        return Err(EvaluatorError::SchemaViolation(format!(
            "score {} is outside 0..={}",
            raw.score, MAX_SCORE
        )));
    }

    Ok(EvaluationResult {
        accept: raw.accept,
        score: raw.score as u8,
        issues: raw
            .issues
            .into_iter()
            .map(|i| Issue {
                condition: i.condition,
                description: i.description,
                location: i.location,
            })
            .collect(),
    })
}

/// Extract JSON from a potentially markdown-wrapped response.
fn extract_json(response: &str) -> String {
    let response = response.trim();

    if response.starts_with("```json") {
        if let Some(end) = response.rfind("```") {
            let start = "```json".len();
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    if response.starts_with("```") {
        if let Some(end) = response.rfind("```") {
            let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return response[start..=end].to_string();
            }
        }
    }

    response.to_string()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
