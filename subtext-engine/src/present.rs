//! Presentation model: reports flattened into ordered, labelled sections.
//!
//! Pure view logic. No decisions about the text are made here.
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use subtext_common::SchemaVersion;

use crate::report::{DashboardReport, DecoderReport, FactCheck, Highlight, Report, ReportBody, Score, Scores};

pub const MISSING_TEXT: &str = "—";
pub const MISSING_LIST: &str = "(none)";
pub const MISSING_SCORE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreLevel {
    Low,
    Medium,
    High,
}

impl ScoreLevel {
    /// 0..=33 Low, 34..=66 Medium, 67..=100 High.
    pub fn from_score(n: u8) -> Self {
        match n {
            0..=33 => ScoreLevel::Low,
            34..=66 => ScoreLevel::Medium,
            _ => ScoreLevel::High,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreLevel::Low => "Low",
            ScoreLevel::Medium => "Medium",
            ScoreLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLine {
    pub label: String,
    pub value: Score,
    /// Extra annotation, e.g. the political lean next to the bias score.
    pub note: Option<String>,
}

impl ScoreLine {
    pub fn level(&self) -> Option<ScoreLevel> {
        self.value.map(ScoreLevel::from_score)
    }

    /// `72/100 (High)` or `n/a`.
    pub fn display_value(&self) -> String {
        match (self.value, self.level()) {
            (Some(v), Some(level)) => format!("{v}/100 ({})", level.label()),
            _ => MISSING_SCORE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "item", content = "value", rename_all = "snake_case")]
pub enum Item {
    Score(ScoreLine),
    Field { label: String, value: String },
    Bullet(String),
    Action(String),
    Quote {
        quote: String,
        technique: String,
        explanation: String,
    },
    Check {
        claim: String,
        verdict: String,
        note: String,
    },
    Paragraph(String),
    Tags(Vec<String>),
    /// Shown in place of an empty list.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: &'static str,
    /// Top-level JSON keys this section renders.
    pub keys: Vec<String>,
    pub items: Vec<Item>,
}

impl Section {
    fn new(title: &'static str, keys: &[&str]) -> Self {
        Self {
            title,
            keys: keys.iter().map(|k| (*k).to_string()).collect(),
            items: Vec::new(),
        }
    }

    fn push(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    fn items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        if self.items.is_empty() {
            self.items.push(Item::Empty);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub schema: SchemaVersion,
    pub sections: Vec<Section>,
}

impl Dashboard {
    pub fn from_report(report: &Report) -> Self {
        let mut sections = match &report.body {
            ReportBody::V1(r) => decoder_sections(r),
            ReportBody::V2(r) => dashboard_sections(r),
        };
        if !report.extras.is_empty() {
            let keys: Vec<&str> = report.extras.keys().map(String::as_str).collect();
            let section = Section::new("Other fields", &keys).items(
                report.extras.iter().map(|(k, v)| Item::Field {
                    label: k.clone(),
                    value: compact_value(v),
                }),
            );
            sections.push(section);
        }
        Self {
            schema: report.schema(),
            sections,
        }
    }

    pub fn consumed_keys(&self) -> BTreeSet<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.keys.iter().map(String::as_str))
            .collect()
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

fn or_dash(v: &Option<String>) -> String {
    v.clone().unwrap_or_else(|| MISSING_TEXT.to_string())
}

fn score_lines(scores: &Scores, political_lean: Option<&Option<String>>) -> Vec<Item> {
    let mut lines = vec![
        ("Noise", scores.noise, None),
        ("Manipulation", scores.manipulation, None),
        ("Hostility", scores.hostility, None),
    ];
    if let Some(lean) = political_lean {
        lines.push((
            "Political bias",
            scores.political_bias,
            Some(format!("lean: {}", or_dash(lean))),
        ));
    }
    let mut items: Vec<Item> = lines
        .into_iter()
        .map(|(label, value, note)| {
            Item::Score(ScoreLine {
                label: label.to_string(),
                value,
                note,
            })
        })
        .collect();
    items.extend(scores.other.iter().map(|(k, v)| {
        Item::Score(ScoreLine {
            label: k.clone(),
            value: *v,
            note: None,
        })
    }));
    items
}

fn confidence(score: Score) -> Item {
    Item::Field {
        label: "Confidence".into(),
        value: score.map_or_else(|| MISSING_SCORE.to_string(), |c| format!("{c} / 100")),
    }
}

fn decoder_sections(r: &DecoderReport) -> Vec<Section> {
    vec![
        Section::new("Scores", &["scores", "confidence"])
            .items(score_lines(&r.scores, None))
            .push(confidence(r.confidence)),
        Section::new("Profile", &["tone", "intention"])
            .push(Item::Field {
                label: "Tone".into(),
                value: or_dash(&r.tone),
            })
            .push(Item::Field {
                label: "Intention".into(),
                value: or_dash(&r.intention),
            }),
        Section::new("Summary", &["summary"]).items(r.summary.iter().cloned().map(Item::Bullet)),
        Section::new("Actions", &["actions"]).items(r.actions.iter().cloned().map(Item::Action)),
    ]
}

fn dashboard_sections(r: &DashboardReport) -> Vec<Section> {
    vec![
        Section::new("Scores", &["scores", "confidence"])
            .items(score_lines(&r.scores, Some(&r.political_lean)))
            .push(confidence(r.confidence)),
        Section::new("Profile", &["content_type", "political_lean", "main_effect"])
            .push(Item::Field {
                label: "Content type".into(),
                value: or_dash(&r.content_type),
            })
            .push(Item::Field {
                label: "Political lean".into(),
                value: or_dash(&r.political_lean),
            })
            .push(Item::Field {
                label: "Main effect".into(),
                value: or_dash(&r.main_effect),
            }),
        Section::new("Summary", &["summary"]).items(r.summary.iter().cloned().map(Item::Bullet)),
        Section::new("Highlights", &["highlights"]).items(r.highlights.iter().map(quote)),
        Section::new("Fact checks", &["fact_checks"]).items(r.fact_checks.iter().map(check)),
        Section::new("Actions", &["recommended_actions"])
            .items(r.recommended_actions.iter().cloned().map(Item::Action)),
        Section::new("Systemic view", &["systemic_view"])
            .push(Item::Paragraph(or_dash(&r.systemic_view))),
        Section::new("Tags", &["tags"]).items((!r.tags.is_empty()).then(|| Item::Tags(r.tags.clone()))),
    ]
}

fn quote(h: &Highlight) -> Item {
    Item::Quote {
        quote: or_dash(&h.quote),
        technique: or_dash(&h.technique),
        explanation: or_dash(&h.explanation),
    }
}

fn check(f: &FactCheck) -> Item {
    Item::Check {
        claim: or_dash(&f.claim),
        verdict: or_dash(&f.verdict),
        note: or_dash(&f.note),
    }
}

/// One-line rendering of an arbitrary JSON value.
pub fn compact_value(v: &Value) -> String {
    match v {
        Value::String(s) if s.trim().is_empty() => MISSING_TEXT.to_string(),
        Value::String(s) => s.clone(),
        Value::Null => MISSING_TEXT.to_string(),
        Value::Array(items) if items.iter().all(|i| i.is_string()) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                MISSING_LIST.to_string()
            } else {
                parts.join(", ")
            }
        }
        other => other.to_string(),
    }
}

/// Plain-text rendering used by `subtext scan`.
pub fn render_plain(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    for section in &dashboard.sections {
        let _ = writeln!(out, "== {} ==", section.title);
        for item in &section.items {
            match item {
                Item::Score(line) => {
                    let _ = write!(out, "  {:<16} {}", line.label, line.display_value());
                    if let Some(note) = &line.note {
                        let _ = write!(out, "  [{note}]");
                    }
                    out.push('\n');
                }
                Item::Field { label, value } => {
                    let _ = writeln!(out, "  {label}: {value}");
                }
                Item::Bullet(b) => {
                    let _ = writeln!(out, "  • {b}");
                }
                Item::Action(a) => {
                    let _ = writeln!(out, "  ✓ {a}");
                }
                Item::Quote {
                    quote,
                    technique,
                    explanation,
                } => {
                    let _ = writeln!(out, "  \"{quote}\"");
                    let _ = writeln!(out, "    {technique}: {explanation}");
                }
                Item::Check {
                    claim,
                    verdict,
                    note,
                } => {
                    let _ = writeln!(out, "  {claim}");
                    let _ = writeln!(out, "    verdict: {verdict} ({note})");
                }
                Item::Paragraph(p) => {
                    let _ = writeln!(out, "  {p}");
                }
                Item::Tags(tags) => {
                    let shown: Vec<String> = tags.iter().map(|t| format!("#{t}")).collect();
                    let _ = writeln!(out, "  {}", shown.join(" "));
                }
                Item::Empty => {
                    let _ = writeln!(out, "  {MISSING_LIST}");
                }
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(v: Value, version: SchemaVersion) -> Report {
        Report::from_object(v.as_object().unwrap(), version)
    }

    #[test]
    fn thresholds() {
        assert_eq!(ScoreLevel::from_score(0), ScoreLevel::Low);
        assert_eq!(ScoreLevel::from_score(33), ScoreLevel::Low);
        assert_eq!(ScoreLevel::from_score(34), ScoreLevel::Medium);
        assert_eq!(ScoreLevel::from_score(66), ScoreLevel::Medium);
        assert_eq!(ScoreLevel::from_score(67), ScoreLevel::High);
        assert_eq!(ScoreLevel::from_score(100), ScoreLevel::High);
    }

    #[test]
    fn empty_report_renders_placeholders() {
        let d = Dashboard::from_report(&report(json!({}), SchemaVersion::V1));
        let text = render_plain(&d);
        let noise = text.lines().find(|l| l.trim_start().starts_with("Noise")).unwrap();
        assert!(noise.ends_with(" n/a"), "{noise}");
        assert!(text.contains("Tone: —"));
        assert!(text.contains("Confidence: n/a"));
        assert!(text.contains("(none)"));
        assert!(d.section("Other fields").is_none());
    }

    #[test]
    fn political_bias_shows_lean() {
        let d = Dashboard::from_report(&report(
            json!({"scores": {"political_bias": 70}, "political_lean": "centre-right"}),
            SchemaVersion::V2,
        ));
        let scores = d.section("Scores").unwrap();
        let bias = scores
            .items
            .iter()
            .find_map(|i| match i {
                Item::Score(l) if l.label == "Political bias" => Some(l),
                _ => None,
            })
            .unwrap();
        assert_eq!(bias.display_value(), "70/100 (High)");
        assert_eq!(bias.note.as_deref(), Some("lean: centre-right"));
    }

    #[test]
    fn confidence_renders_out_of_100() {
        let d = Dashboard::from_report(&report(json!({"confidence": "85"}), SchemaVersion::V2));
        assert!(render_plain(&d).contains("Confidence: 85 / 100"));
    }

    #[test]
    fn extras_get_their_own_section() {
        let d = Dashboard::from_report(&report(
            json!({"tone": "dry", "language": "fr", "keywords": ["a", "b"]}),
            SchemaVersion::V1,
        ));
        let other = d.section("Other fields").unwrap();
        let mut keys = other.keys.clone();
        keys.sort();
        assert_eq!(keys, vec!["keywords", "language"]);
        assert!(render_plain(&d).contains("keywords: a, b"));
    }

    #[test]
    fn dashboard_section_order() {
        let d = Dashboard::from_report(&report(json!({}), SchemaVersion::V2));
        let titles: Vec<&str> = d.sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            [
                "Scores",
                "Profile",
                "Summary",
                "Highlights",
                "Fact checks",
                "Actions",
                "Systemic view",
                "Tags"
            ]
        );
    }
}
