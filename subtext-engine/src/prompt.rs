//! System instructions and user messages for the two completion calls.
use subtext_common::SchemaVersion;
use url::Url;

use crate::reply::ReplyTone;
use crate::report::Report;

const DECODER_SYSTEM_PROMPT: &str = r#"
You are DECODER-Engine, a rhetorical analysis system.
Your job: analyze a text and reveal what it hides.

Strict rules:
- Answer ONLY with valid JSON, no text around it.
- Follow the JSON structure below exactly.
- No commentary, no explanation, no moralizing.
- Never mention the user or yourself.
- Never store the provided text.

Quick definitions:
- noise: filler, vagueness, padding, non-information.
- manipulation: pressure, guilt-tripping, doublespeak, hidden agenda.
- hostility: aggressive tone, contempt, condescension.

Exact JSON format:
{
  "scores": {
    "noise": 0,
    "manipulation": 0,
    "hostility": 0
  },
  "tone": "",
  "intention": "",
  "summary": [],
  "actions": [],
  "confidence": 0
}

Style constraints:
- scores: integers from 0 to 100.
- tone: a single word (e.g. neutral, friendly, threatening, condescending, pressing).
- intention: one short factual sentence.
- summary: 2 to 3 useful, factual bullet points at most.
- actions: 2 to 3 concrete actions, or "No action needed".
- confidence: integer from 0 to 100.

Your style: cold, analytical, concise, anti-bullshit.
"#;

const DASHBOARD_SYSTEM_PROMPT: &str = r#"
You are SUBTEXT, a rhetorical and media analysis system.
Your job: analyze a text (message, post, article) and expose its structure,
its techniques and its likely effect on a reader.

Strict rules:
- Answer ONLY with valid JSON, no text around it.
- Follow the JSON structure below exactly, every key present.
- No commentary outside the JSON, no moralizing.
- Never mention the user or yourself.

Quick definitions:
- noise: filler, vagueness, padding, non-information.
- manipulation: pressure, guilt-tripping, framing, hidden agenda.
- hostility: aggressive tone, contempt, condescension.
- political_bias: how strongly the text pushes a political side (0 = none).

Exact JSON format:
{
  "content_type": "",
  "scores": {
    "noise": 0,
    "manipulation": 0,
    "hostility": 0,
    "political_bias": 0
  },
  "political_lean": "",
  "main_effect": "",
  "summary": [],
  "tags": [],
  "highlights": [
    {"quote": "", "technique": "", "explanation": ""}
  ],
  "fact_checks": [
    {"claim": "", "verdict": "", "note": ""}
  ],
  "recommended_actions": [],
  "systemic_view": "",
  "confidence": 0
}

Style constraints:
- content_type: e.g. news article, opinion piece, work email, social post, ad.
- scores and confidence: integers from 0 to 100.
- political_lean: short label (e.g. none, left, centre-left, centre, centre-right, right).
- main_effect: one sentence on what the text tries to make the reader feel or do.
- summary: 2 to 4 factual bullet points.
- tags: 3 to 6 short lowercase tags.
- highlights: up to 5 verbatim quotes from the text with the technique used.
- fact_checks: checkable claims; verdict is one of "plausible", "doubtful",
  "unverifiable", "needs source". You have no web access: say so in note.
- recommended_actions: 2 to 3 concrete actions for the reader.
- systemic_view: 1 to 2 sentences placing the text in its wider context.

Your style: cold, analytical, concise.
"#;

const REPLY_SYSTEM_PROMPT: &str = r#"
You draft short replies to a message on behalf of its recipient.
Answer ONLY with valid JSON of the form {"replies": ["...", "..."]}.
Each reply is ready to send, in the language of the original text,
at most 4 sentences, and never mentions that an analysis took place.
"#;

/// A system instruction plus the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

pub fn analysis_system_prompt(version: SchemaVersion) -> &'static str {
    match version {
        SchemaVersion::V1 => DECODER_SYSTEM_PROMPT,
        SchemaVersion::V2 => DASHBOARD_SYSTEM_PROMPT,
    }
}

/// `Analyze this text:\n\n"<text>"`, preceded by `Source: <url>` for pages.
pub fn analysis_prompt(version: SchemaVersion, text: &str, source: Option<&Url>) -> Prompt {
    let mut user = String::new();
    if let Some(url) = source {
        user.push_str(&format!("Source: {url}\n\n"));
    }
    user.push_str(&format!("Analyze this text:\n\n\"{text}\""));
    Prompt {
        system: analysis_system_prompt(version),
        user,
    }
}

pub fn reply_prompt(tone: ReplyTone, report: &Report, text: &str, count: usize) -> Prompt {
    let gist = report.gist();
    let mut user = format!("Tone: {} ({})\n", tone, tone.guidance());
    user.push_str(&format!("Number of replies: {count}\n"));
    if let Some(register) = gist.register {
        user.push_str(&format!("Register of the original: {register}\n"));
    }
    if let Some(effect) = gist.effect {
        user.push_str(&format!("What the original is doing: {effect}\n"));
    }
    if !gist.summary.is_empty() {
        user.push_str("Analysis summary:\n");
        for line in gist.summary {
            user.push_str(&format!("- {line}\n"));
        }
    }
    user.push_str(&format!(
        "\nOriginal text:\n\n\"{text}\"\n\nWrite {count} alternative replies as {{\"replies\": [...]}}."
    ));
    Prompt {
        system: REPLY_SYSTEM_PROMPT,
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pasted_text_is_quoted() {
        let p = analysis_prompt(SchemaVersion::V1, "We need this by noon.", None);
        assert_eq!(p.user, "Analyze this text:\n\n\"We need this by noon.\"");
        assert!(p.system.contains("\"intention\""));
    }

    #[test]
    fn url_source_is_prefixed() {
        let url = Url::parse("https://news.example/story").unwrap();
        let p = analysis_prompt(SchemaVersion::V2, "body", Some(&url));
        assert!(p.user.starts_with("Source: https://news.example/story\n\nAnalyze this text:"));
        assert!(p.system.contains("\"fact_checks\""));
    }

    #[test]
    fn each_system_prompt_names_every_declared_key() {
        for v in SchemaVersion::ALL {
            let sys = analysis_system_prompt(v);
            for key in v.keys().iter().chain(v.score_keys()) {
                assert!(sys.contains(&format!("\"{key}\"")), "{v} prompt misses {key}");
            }
        }
    }

    #[test]
    fn reply_prompt_carries_tone_and_gist() {
        let obj = json!({
            "content_type": "work email",
            "main_effect": "Creates urgency to skip review",
            "summary": ["Deadline is artificial"]
        });
        let report = Report::from_object(obj.as_object().unwrap(), SchemaVersion::V2);
        let p = reply_prompt(ReplyTone::Firm, &report, "Sign today.", 3);
        assert!(p.user.starts_with("Tone: firm"));
        assert!(p.user.contains("Creates urgency to skip review"));
        assert!(p.user.contains("- Deadline is artificial"));
        assert!(p.user.contains("\"Sign today.\""));
        assert!(p.user.contains("Write 3 alternative replies"));
    }
}
