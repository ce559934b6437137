//! Versioned JSON display contracts.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the JSON layout the model is instructed to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Compact "decoder" layout: scores, tone, intention, summary, actions.
    V1,
    /// Full dashboard layout with highlights, fact checks and bias.
    #[default]
    V2,
}

const V1_KEYS: &[&str] = &[
    "scores",
    "tone",
    "intention",
    "summary",
    "actions",
    "confidence",
];

const V2_KEYS: &[&str] = &[
    "content_type",
    "scores",
    "political_lean",
    "main_effect",
    "summary",
    "tags",
    "highlights",
    "fact_checks",
    "recommended_actions",
    "systemic_view",
    "confidence",
];

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::V1, SchemaVersion::V2];

    /// Top-level keys this version declares.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            SchemaVersion::V1 => V1_KEYS,
            SchemaVersion::V2 => V2_KEYS,
        }
    }

    /// Score sub-keys under `scores`.
    pub fn score_keys(self) -> &'static [&'static str] {
        match self {
            SchemaVersion::V1 => &["noise", "manipulation", "hostility"],
            SchemaVersion::V2 => &["noise", "manipulation", "hostility", "political_bias"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V2 => "v2",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SchemaVersion::V1 => "decoder",
            SchemaVersion::V2 => "dashboard",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "decoder" => Ok(SchemaVersion::V1),
            "v2" | "2" | "dashboard" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown schema version '{other}' (expected v1 or v2)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("V1".parse::<SchemaVersion>(), Ok(SchemaVersion::V1));
        assert_eq!("dashboard".parse::<SchemaVersion>(), Ok(SchemaVersion::V2));
        assert!("v3".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn both_versions_declare_scores_and_confidence() {
        for v in SchemaVersion::ALL {
            assert!(v.keys().contains(&"scores"), "{v}");
            assert!(v.keys().contains(&"confidence"), "{v}");
        }
    }
}
