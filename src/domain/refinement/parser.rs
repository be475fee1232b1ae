//! Response parsing for assistant replies.
//!
//! Structured replies are expected to be a JSON array of role-tagged records
//! but frequently arrive fenced, wrapped in prose, or wrapped in an object.
//! The extractor walks top-level JSON values in order and keeps the first
//! one that deserializes. Values nested inside a candidate are never tried
//! on their own, so a malformed array cannot degrade into an empty one.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::session::FinalizeResult;

/// Marker that opens the story section of a finalize reply.
pub const STORY_MARKER: &str = "【User Story】";

/// Marker that opens the acceptance criteria section of a finalize reply.
pub const CRITERIA_MARKER: &str = "【Acceptance Criteria】";

const ORDINAL_PREFIXES: [&str; 5] = ["1.", "2.", "3.", "4.", "5."];

/// Parsed records plus the reply they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredReply<T> {
    pub items: Vec<T>,
    pub raw: String,
}

/// A reply that could not be read as the expected structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse assistant reply: {reason}")]
pub struct ParseError {
    pub reason: String,
    pub raw: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

/// Extracts round artifacts and finalize sections from raw replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Reads a list of records from a reply.
    pub fn parse_structured<T: DeserializeOwned>(
        &self,
        raw: &str,
    ) -> Result<StructuredReply<T>, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::new("assistant returned an empty reply", raw));
        }

        let mut last_error: Option<String> = None;
        for candidate in json_candidates(raw) {
            match serde_json::from_value::<Vec<T>>(unwrap_single_array(candidate)) {
                Ok(items) => {
                    return Ok(StructuredReply {
                        items,
                        raw: raw.to_string(),
                    })
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        Err(ParseError::new(
            last_error.unwrap_or_else(|| "no JSON array found in reply".to_string()),
            raw,
        ))
    }

    /// Splits a finalize reply into story and acceptance criteria.
    ///
    /// Falls back to the whole reply as the story when either marker is
    /// missing.
    pub fn parse_sections(&self, raw: &str) -> FinalizeResult {
        let fallback = || FinalizeResult {
            user_story: raw.to_string(),
            acceptance_criteria: Vec::new(),
            raw: raw.to_string(),
        };

        let Some(story_at) = raw.find(STORY_MARKER) else {
            return fallback();
        };
        let story_start = story_at + STORY_MARKER.len();
        let Some(criteria_offset) = raw[story_start..].find(CRITERIA_MARKER) else {
            return fallback();
        };
        let criteria_at = story_start + criteria_offset;

        let user_story = raw[story_start..criteria_at].trim().to_string();
        let acceptance_criteria = raw[criteria_at + CRITERIA_MARKER.len()..]
            .lines()
            .map(str::trim)
            .filter_map(|line| {
                ORDINAL_PREFIXES
                    .iter()
                    .find_map(|prefix| line.strip_prefix(prefix))
            })
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();

        FinalizeResult {
            user_story,
            acceptance_criteria,
            raw: raw.to_string(),
        }
    }
}

/// Candidate JSON values in the order they should be tried: fenced blocks
/// first, then each top-level value embedded in the text.
fn json_candidates(raw: &str) -> impl Iterator<Item = Value> + '_ {
    let fenced = fenced_blocks(raw)
        .into_iter()
        .filter_map(|block| serde_json::from_str::<Value>(block.trim()).ok());

    fenced.chain(embedded_values(raw))
}

/// JSON values that start at a bracket in `text`. Scanning resumes after
/// the end of each value found, skipping anything nested inside it.
fn embedded_values(text: &str) -> Vec<Value> {
    let mut values = Vec::new();
    let mut resume_at = 0;

    for (i, c) in text.char_indices() {
        if i < resume_at || (c != '[' && c != '{') {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[i..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            resume_at = i + stream.byte_offset();
            values.push(value);
        }
    }
    values
}

/// Bodies of ``` fenced blocks, with any language tag removed.
fn fenced_blocks(raw: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let body_start = match after_open.find('\n') {
            Some(nl) if !after_open[..nl].contains('[') && !after_open[..nl].contains('{') => nl + 1,
            _ => 0,
        };
        let body = &after_open[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => break,
        }
    }
    blocks
}

/// `{"questions": [...]}` becomes `[...]` when the object has exactly one
/// array field.
fn unwrap_single_array(value: Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 => {
            let (key, inner) = map.into_iter().next().unwrap_or_default();
            if inner.is_array() {
                inner
            } else {
                let mut restored = serde_json::Map::new();
                restored.insert(key, inner);
                Value::Object(restored)
            }
        }
        other => other,
    }
}
