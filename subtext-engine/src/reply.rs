use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyTone {
    Neutral,
    Friendly,
    Firm,
    Diplomatic,
    Ironic,
}

impl ReplyTone {
    pub const ALL: [ReplyTone; 5] = [
        ReplyTone::Neutral,
        ReplyTone::Friendly,
        ReplyTone::Firm,
        ReplyTone::Diplomatic,
        ReplyTone::Ironic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReplyTone::Neutral => "neutral",
            ReplyTone::Friendly => "friendly",
            ReplyTone::Firm => "firm",
            ReplyTone::Diplomatic => "diplomatic",
            ReplyTone::Ironic => "ironic",
        }
    }

    /// One-line register instruction for the drafting prompt.
    pub fn guidance(self) -> &'static str {
        match self {
            ReplyTone::Neutral => "factual and even, no emotional colouring",
            ReplyTone::Friendly => "warm and cooperative while staying clear",
            ReplyTone::Firm => "direct, sets boundaries, no apologies",
            ReplyTone::Diplomatic => "polite, de-escalating, leaves room to agree",
            ReplyTone::Ironic => "dry and lightly ironic, never insulting",
        }
    }

    pub fn names() -> String {
        Self::ALL.map(ReplyTone::as_str).join(", ")
    }
}

impl fmt::Display for ReplyTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyTone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown tone '{}' (choose one of: {})", s.trim(), Self::names()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplySet {
    pub tone: ReplyTone,
    pub replies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyOutcome {
    Replies(ReplySet),
    Malformed { raw: String, error: String },
}
