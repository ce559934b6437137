//! Typed views over the model's JSON reply.
//!
//! Every field is optional: a missing or mistyped value becomes `None` or an
//! empty list and is rendered as a placeholder later. Nothing here fails.
use serde::Serialize;
use serde_json::{Map, Value};
use subtext_common::SchemaVersion;

/// A 0..=100 score. `None` when absent or not numeric.
pub type Score = Option<u8>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scores {
    pub noise: Score,
    pub manipulation: Score,
    pub hostility: Score,
    /// Only declared by the dashboard schema.
    pub political_bias: Score,
    /// Score keys the model added on its own, in reply order.
    pub other: Vec<(String, Score)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecoderReport {
    pub scores: Scores,
    pub tone: Option<String>,
    pub intention: Option<String>,
    pub summary: Vec<String>,
    pub actions: Vec<String>,
    pub confidence: Score,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlight {
    pub quote: Option<String>,
    pub technique: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactCheck {
    pub claim: Option<String>,
    pub verdict: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardReport {
    pub content_type: Option<String>,
    pub scores: Scores,
    pub political_lean: Option<String>,
    pub main_effect: Option<String>,
    pub summary: Vec<String>,
    pub tags: Vec<String>,
    pub highlights: Vec<Highlight>,
    pub fact_checks: Vec<FactCheck>,
    pub recommended_actions: Vec<String>,
    pub systemic_view: Option<String>,
    pub confidence: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "schema", rename_all = "lowercase")]
pub enum ReportBody {
    V1(DecoderReport),
    V2(DashboardReport),
}

/// A parsed analysis: the typed body, top-level keys the schema does not
/// declare, and the reply exactly as decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub body: ReportBody,
    pub extras: Map<String, Value>,
    pub raw: Value,
}

impl Report {
    pub fn from_object(obj: &Map<String, Value>, version: SchemaVersion) -> Self {
        let body = match version {
            SchemaVersion::V1 => ReportBody::V1(DecoderReport::from_object(obj)),
            SchemaVersion::V2 => ReportBody::V2(DashboardReport::from_object(obj)),
        };
        let declared = version.keys();
        let extras = obj
            .iter()
            .filter(|(k, _)| !declared.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            body,
            extras,
            raw: Value::Object(obj.clone()),
        }
    }

    pub fn schema(&self) -> SchemaVersion {
        match self.body {
            ReportBody::V1(_) => SchemaVersion::V1,
            ReportBody::V2(_) => SchemaVersion::V2,
        }
    }

    /// Short description of the analysis, fed back into reply prompts.
    pub fn gist(&self) -> Gist<'_> {
        match &self.body {
            ReportBody::V1(r) => Gist {
                effect: r.intention.as_deref(),
                register: r.tone.as_deref(),
                summary: &r.summary,
            },
            ReportBody::V2(r) => Gist {
                effect: r.main_effect.as_deref(),
                register: r.content_type.as_deref(),
                summary: &r.summary,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Gist<'a> {
    /// Intention (decoder) or main effect (dashboard).
    pub effect: Option<&'a str>,
    /// Tone (decoder) or content type (dashboard).
    pub register: Option<&'a str>,
    pub summary: &'a [String],
}

impl Scores {
    fn from_value(v: Option<&Value>, declared: &[&str]) -> Self {
        let Some(obj) = v.and_then(Value::as_object) else {
            return Self::default();
        };
        let get = |k: &str| {
            if declared.contains(&k) {
                parse_score(obj.get(k))
            } else {
                None
            }
        };
        Self {
            noise: get("noise"),
            manipulation: get("manipulation"),
            hostility: get("hostility"),
            political_bias: get("political_bias"),
            other: obj
                .iter()
                .filter(|(k, _)| !declared.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), parse_score(Some(v))))
                .collect(),
        }
    }
}

impl DecoderReport {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            scores: Scores::from_value(obj.get("scores"), SchemaVersion::V1.score_keys()),
            tone: text(obj.get("tone")),
            intention: text(obj.get("intention")),
            summary: list(obj.get("summary")),
            actions: list(obj.get("actions")),
            confidence: parse_score(obj.get("confidence")),
        }
    }
}

impl DashboardReport {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            content_type: text(obj.get("content_type")),
            scores: Scores::from_value(obj.get("scores"), SchemaVersion::V2.score_keys()),
            political_lean: text(obj.get("political_lean")),
            main_effect: text(obj.get("main_effect")),
            summary: list(obj.get("summary")),
            tags: list(obj.get("tags")),
            highlights: records(obj.get("highlights"), |o| Highlight {
                quote: text(o.get("quote")),
                technique: text(o.get("technique")),
                explanation: text(o.get("explanation")),
            })
            .unwrap_or_else(|bare| {
                bare.into_iter()
                    .map(|quote| Highlight {
                        quote: Some(quote),
                        ..Highlight::default()
                    })
                    .collect()
            }),
            fact_checks: records(obj.get("fact_checks"), |o| FactCheck {
                claim: text(o.get("claim")),
                verdict: text(o.get("verdict")),
                note: text(o.get("note")),
            })
            .unwrap_or_else(|bare| {
                bare.into_iter()
                    .map(|claim| FactCheck {
                        claim: Some(claim),
                        ..FactCheck::default()
                    })
                    .collect()
            }),
            recommended_actions: list(obj.get("recommended_actions")),
            systemic_view: text(obj.get("systemic_view")),
            confidence: parse_score(obj.get("confidence")),
        }
    }
}

/// Accept integers, floats and numeric strings ("72", "72.5", "72/100",
/// "72%"); clamp to 0..=100.
pub fn parse_score(v: Option<&Value>) -> Score {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            let head = s.split('/').next().unwrap_or(s).trim().trim_end_matches('%');
            head.trim().parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

/// A non-empty string. Numbers and booleans are shown as written.
pub fn text(v: Option<&Value>) -> Option<String> {
    let s = match v? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// A list of strings. A lone string becomes a one-item list; scalar items
/// are stringified; empty items are dropped.
pub fn list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(|i| text(Some(i))).collect(),
        Some(other) => text(Some(other)).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Map an array of objects with `f`. Arrays holding only plain strings are
/// returned as `Err(strings)` so callers can build a minimal record.
fn records<T>(
    v: Option<&Value>,
    f: impl Fn(&Map<String, Value>) -> T,
) -> Result<Vec<T>, Vec<String>> {
    let Some(Value::Array(items)) = v else {
        return Ok(Vec::new());
    };
    if items.iter().all(|i| !i.is_object()) {
        return Err(list(v));
    }
    Ok(items.iter().filter_map(Value::as_object).map(f).collect())
}
