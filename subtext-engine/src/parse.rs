//! Decoding of model replies. Malformed output is a value, never a panic.
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use subtext_common::SchemaVersion;

use crate::reply::{ReplyOutcome, ReplySet, ReplyTone};
use crate::report::{self, Report};

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\z").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Report(Report),
    Malformed { raw: String, error: String },
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            AnalysisOutcome::Report(r) => Some(r),
            AnalysisOutcome::Malformed { .. } => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, AnalysisOutcome::Malformed { .. })
    }
}

/// Trim, and unwrap the reply when it is exactly one markdown code fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

pub fn parse_analysis(raw: &str, version: SchemaVersion) -> AnalysisOutcome {
    let body = strip_code_fence(raw);
    let malformed = |error: String| AnalysisOutcome::Malformed {
        raw: raw.to_string(),
        error,
    };
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => AnalysisOutcome::Report(Report::from_object(&obj, version)),
        Ok(other) => malformed(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => malformed(e.to_string()),
    }
}

/// Accepts `{"replies": [...]}` or a bare array of strings.
pub fn parse_replies(raw: &str, tone: ReplyTone) -> ReplyOutcome {
    let body = strip_code_fence(raw);
    let malformed = |error: String| ReplyOutcome::Malformed {
        raw: raw.to_string(),
        error,
    };
    let value = match serde_json::from_str::<Value>(body) {
        Ok(v) => v,
        Err(e) => return malformed(e.to_string()),
    };
    let items = match &value {
        Value::Object(obj) => match obj.get("replies") {
            Some(v @ Value::Array(_)) => v,
            Some(other) => {
                return malformed(format!("\"replies\" is {}, not an array", json_kind(other)));
            }
            None => return malformed("missing \"replies\" key".to_string()),
        },
        v @ Value::Array(_) => v,
        other => return malformed(format!("expected a JSON object, got {}", json_kind(other))),
    };
    let replies = report::list(Some(items));
    if replies.is_empty() {
        return malformed("no reply drafts in response".to_string());
    }
    ReplyOutcome::Replies(ReplySet { tone, replies })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_unwrapped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n{}\n```  "), "{}");
    }

    #[test]
    fn prose_around_a_fence_is_left_alone() {
        let raw = "Here you go:\n```json\n{}\n```";
        assert_eq!(strip_code_fence(raw), raw);
    }

    #[test]
    fn object_becomes_report() {
        let out = parse_analysis("{\"tone\": \"cold\"}", SchemaVersion::V1);
        assert!(out.report().is_some());
    }

    #[test]
    fn invalid_json_keeps_raw_text() {
        let out = parse_analysis("Sorry, I can't help with that.", SchemaVersion::V2);
        match out {
            AnalysisOutcome::Malformed { raw, error } => {
                assert_eq!(raw, "Sorry, I can't help with that.");
                assert!(!error.is_empty());
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn non_object_json_is_malformed() {
        let out = parse_analysis("[1, 2]", SchemaVersion::V2);
        assert!(matches!(out, AnalysisOutcome::Malformed { ref error, .. } if error.contains("an array")));
    }

    #[test]
    fn truncated_json_is_not_repaired() {
        assert!(parse_analysis("{\"scores\": {\"noise\": 3", SchemaVersion::V1).is_malformed());
    }

    #[test]
    fn replies_accept_object_or_array() {
        let ReplyOutcome::Replies(set) = parse_replies("{\"replies\": [\"One\", \"Two\"]}", ReplyTone::Firm)
        else {
            panic!("expected replies");
        };
        assert_eq!(set.replies, vec!["One", "Two"]);
        assert_eq!(set.tone, ReplyTone::Firm);

        assert!(matches!(
            parse_replies("[\"Only\"]", ReplyTone::Neutral),
            ReplyOutcome::Replies(_)
        ));
    }

    #[test]
    fn empty_replies_are_malformed() {
        assert!(matches!(
            parse_replies("{\"replies\": []}", ReplyTone::Ironic),
            ReplyOutcome::Malformed { .. }
        ));
        assert!(matches!(
            parse_replies("{\"drafts\": [\"x\"]}", ReplyTone::Ironic),
            ReplyOutcome::Malformed { .. }
        ));
    }
}
