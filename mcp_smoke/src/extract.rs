use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::CapturedOutput;

/// Which stdout line is taken as the response.
///
/// Servers may log to stdout before answering, so the answer is looked for
/// at the end of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LineStrategy {
    /// The last non-blank line, and only that line, must be a JSON object
    #[default]
    LastLine,
    /// Walk backwards and take the first line that is a JSON object
    LastObjectLine,
}

impl LineStrategy {
    /// Find the response object in `text`, if any
    pub fn locate(self, text: &str) -> Option<Value> {
        let mut lines = text.split('\n').map(str::trim).filter(|line| !line.is_empty()).rev();
        match self {
            LineStrategy::LastLine => lines.next().and_then(decode_object),
            LineStrategy::LastObjectLine => lines.find_map(decode_object),
        }
    }
}

fn decode_object(line: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(line) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedResponse {
    /// A decoded JSON object
    Structured(Value),
    /// The captured stdout, unchanged
    Raw(String),
}

impl ExtractedResponse {
    /// The `result` member of a structured response
    pub fn result(&self) -> Option<&Value> {
        match self {
            ExtractedResponse::Structured(value) => value.get("result"),
            ExtractedResponse::Raw(_) => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ExtractedResponse::Structured(_))
    }
}

pub fn extract(captured: &CapturedOutput, strategy: LineStrategy) -> ExtractedResponse {
    extract_text(&captured.stdout, strategy)
}

pub fn extract_text(text: &str, strategy: LineStrategy) -> ExtractedResponse {
    match strategy.locate(text) {
        Some(value) => ExtractedResponse::Structured(value),
        None => ExtractedResponse::Raw(text.to_string()),
    }
}
