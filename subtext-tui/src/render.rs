//! Turns engine results into styled transcript lines.
use crate::{styles, transcript::TranscriptLine};
use subtext_common::{FailureKind, SubtextError};
use subtext_engine::present::MISSING_LIST;
use subtext_engine::{AnalysisOutcome, Dashboard, Item, ReplyOutcome, ReplyTone, Scan, Source};

fn line(text: impl Into<String>, style: ratatui::style::Style) -> TranscriptLine {
    TranscriptLine::new(text, style)
}

pub fn source_lines(source: &Source) -> Vec<TranscriptLine> {
    let mut out = vec![line("→ [Input]", styles::user_header())];
    out.push(line(format!("  {}", source.label), styles::user_text()));
    if let Some(title) = &source.title {
        out.push(line(format!("  {title}"), styles::dim()));
    }
    let mut meta = format!("  {} words", source.words);
    if source.truncated {
        meta.push_str(", truncated before analysis");
    }
    out.push(line(meta, styles::dim()));
    out.push(TranscriptLine::blank());
    out
}

pub fn scan_lines(scan: &Scan) -> Vec<TranscriptLine> {
    let mut out = source_lines(&scan.source);
    match &scan.outcome {
        AnalysisOutcome::Report(report) => {
            out.extend(dashboard_lines(&Dashboard::from_report(report)));
        }
        AnalysisOutcome::Malformed { raw, error } => {
            out.extend(malformed_lines("analysis", raw, error));
        }
    }
    let mut footer = String::from("  ");
    if let Some(model) = &scan.model {
        footer.push_str(model);
    }
    if let Some(tokens) = scan.tokens_used {
        footer.push_str(&format!(" · {tokens} tokens"));
    }
    if footer.trim().is_empty() {
        return out;
    }
    out.push(line(footer, styles::dim()));
    out.push(TranscriptLine::blank());
    out
}

pub fn dashboard_lines(dashboard: &Dashboard) -> Vec<TranscriptLine> {
    let mut out = Vec::new();
    for section in &dashboard.sections {
        out.push(line(format!("← [{}]", section.title), styles::section()));
        for item in &section.items {
            item_lines(item, &mut out);
        }
        out.push(TranscriptLine::blank());
    }
    out
}

fn item_lines(item: &Item, out: &mut Vec<TranscriptLine>) {
    match item {
        Item::Score(score) => {
            let mut text = format!("  {:<16} {}", score.label, score.display_value());
            if let Some(note) = &score.note {
                text.push_str(&format!("  [{note}]"));
            }
            out.push(line(text, styles::score(score.level())));
        }
        Item::Field { label, value } => {
            out.push(line(format!("  {label}:"), styles::label()));
            out.push(line(format!("    {value}"), styles::value()));
        }
        Item::Bullet(b) => out.push(line(format!("    • {b}"), styles::value())),
        Item::Action(a) => out.push(line(format!("    ✓ {a}"), styles::value())),
        Item::Quote {
            quote,
            technique,
            explanation,
        } => {
            out.push(line(format!("    \"{quote}\""), styles::quote()));
            out.push(line(format!("      {technique}"), styles::label()));
            out.push(line(format!("      {explanation}"), styles::value()));
        }
        Item::Check {
            claim,
            verdict,
            note,
        } => {
            out.push(line(format!("    {claim}"), styles::value()));
            out.push(line(format!("      verdict: {verdict} ({note})"), styles::dim()));
        }
        Item::Paragraph(p) => out.push(line(format!("  {p}"), styles::value())),
        Item::Tags(tags) => {
            let shown: Vec<String> = tags.iter().map(|t| format!("#{t}")).collect();
            out.push(line(format!("  {}", shown.join(" ")), styles::tags()));
        }
        Item::Empty => out.push(line(format!("  {MISSING_LIST}"), styles::dim())),
    }
}

fn malformed_lines(what: &str, raw: &str, error: &str) -> Vec<TranscriptLine> {
    let mut out = vec![line(
        format!("× The model's {what} is not valid JSON ({error}). Raw reply:"),
        styles::warning(),
    )];
    out.extend(raw.lines().map(|l| line(format!("  {l}"), styles::dim())));
    out.push(TranscriptLine::blank());
    out
}

pub fn reply_lines(outcome: &ReplyOutcome) -> Vec<TranscriptLine> {
    match outcome {
        ReplyOutcome::Replies(set) => {
            let mut out = vec![line(
                format!("← [Replies · {}]", set.tone),
                styles::section(),
            )];
            for (i, reply) in set.replies.iter().enumerate() {
                out.push(line(format!("  {}. {reply}", i + 1), styles::reply_text()));
            }
            out.push(TranscriptLine::blank());
            out
        }
        ReplyOutcome::Malformed { raw, error } => malformed_lines("reply", raw, error),
    }
}

pub fn raw_lines(raw: &str) -> Vec<TranscriptLine> {
    let mut out = vec![line("← [Raw JSON]", styles::section())];
    out.extend(raw.lines().map(|l| line(format!("  {l}"), styles::value())));
    out.push(TranscriptLine::blank());
    out
}

pub fn error_lines(err: &SubtextError) -> Vec<TranscriptLine> {
    let text = match (err.kind(), err) {
        (FailureKind::Acquisition, SubtextError::Acquisition(msg)) => {
            format!("× Could not read this page: {msg}")
        }
        (_, SubtextError::Session(msg)) => format!("× {msg}"),
        (FailureKind::Provider, e) => format!("× The analysis request failed: {e}"),
        (_, e) => format!("× {e}"),
    };
    vec![line(text, styles::error()), TranscriptLine::blank()]
}

pub fn help_lines() -> Vec<TranscriptLine> {
    let tones = ReplyTone::names();
    let mut out = vec![line("Commands:", styles::label())];
    for (usage, what) in [
        ("<text or url>", "analyze pasted text or a web page"),
        ("/scan [text|url]", "analyze; alone, re-analyze the last input"),
        ("/reply <tone>", tones.as_str()),
        ("/raw", "show the raw JSON of the last analysis"),
        ("/schema [v1|v2]", "show or switch the display schema"),
        ("/reset", "clear the session"),
        ("/quit", "exit"),
    ] {
        out.push(line(format!("  {usage:<18} {what}"), styles::value()));
    }
    out.push(line(
        "  PgUp/PgDn scroll · Esc clears the input · Ctrl-C quits",
        styles::dim(),
    ));
    out.push(TranscriptLine::blank());
    out
}
