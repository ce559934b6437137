//! One-shot `subtext scan`: analyze, print, exit with a code per failure family.
use crate::{ScanArgs, wiring};
use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::io::{IsTerminal, Read};
use std::process::ExitCode;
use subtext_common::{FailureKind, SubtextError};
use subtext_config::SubtextConfig;
use subtext_engine::present::render_plain;
use subtext_engine::{AnalysisOutcome, ReplyOutcome, Scan, Source};

pub fn exit_code(kind: FailureKind) -> ExitCode {
    ExitCode::from(match kind {
        FailureKind::Usage => 2,
        FailureKind::Acquisition => 3,
        FailureKind::MalformedOutput => 4,
        FailureKind::Provider => 5,
    })
}

fn resolve_input(args: &ScanArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(url) = &args.url {
        return Ok(url.to_string());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()));
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("nothing to analyze: pass --text, --url or --file, or pipe text on stdin");
    }
    let mut buf = String::new();
    stdin.read_to_string(&mut buf).context("cannot read stdin")?;
    Ok(buf)
}

fn fail(err: &SubtextError) -> ExitCode {
    eprintln!("error: {err}");
    exit_code(err.kind())
}

pub async fn run(cfg: SubtextConfig, args: ScanArgs) -> Result<ExitCode> {
    let input = resolve_input(&args)?;
    let mut analyst = wiring::build_analyst(&cfg)?;

    let scan = match analyst.scan(&input).await {
        Ok(scan) => scan,
        Err(e) => return Ok(fail(&e)),
    };

    let replies = match (&scan.outcome, args.reply) {
        (AnalysisOutcome::Report(_), Some(tone)) => match analyst.reply(tone).await {
            Ok(outcome) => Some(outcome),
            Err(e) => return Ok(fail(&e)),
        },
        _ => None,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&json_output(&scan, replies.as_ref()))?);
    } else {
        print!("{}", plain_output(&scan, replies.as_ref()));
    }

    let malformed = scan.outcome.is_malformed()
        || matches!(replies, Some(ReplyOutcome::Malformed { .. }));
    if malformed {
        eprintln!("warning: the model reply was not the expected JSON; printed it as-is");
        return Ok(exit_code(FailureKind::MalformedOutput));
    }
    Ok(ExitCode::SUCCESS)
}

fn source_header(source: &Source) -> String {
    let mut out = format!("Source: {} ({} words", source.label, source.words);
    if source.truncated {
        out.push_str(", truncated");
    }
    out.push_str(")\n");
    if let Some(title) = &source.title {
        let _ = writeln!(out, "Title: {title}");
    }
    out.push('\n');
    out
}

fn plain_output(scan: &Scan, replies: Option<&ReplyOutcome>) -> String {
    let mut out = source_header(&scan.source);
    match (&scan.outcome, scan.dashboard()) {
        (_, Some(dashboard)) => out.push_str(&render_plain(&dashboard)),
        (AnalysisOutcome::Malformed { raw, error }, None) => {
            let _ = writeln!(out, "== Raw reply ({error}) ==\n{raw}\n");
        }
        (AnalysisOutcome::Report(_), None) => {}
    }
    match replies {
        Some(ReplyOutcome::Replies(set)) => {
            let _ = writeln!(out, "== Replies ({}) ==", set.tone);
            for (i, r) in set.replies.iter().enumerate() {
                let _ = writeln!(out, "  {}. {r}", i + 1);
            }
            out.push('\n');
        }
        Some(ReplyOutcome::Malformed { raw, error }) => {
            let _ = writeln!(out, "== Raw replies ({error}) ==\n{raw}\n");
        }
        None => {}
    }
    out
}

fn json_output(scan: &Scan, replies: Option<&ReplyOutcome>) -> Value {
    let analysis = match &scan.outcome {
        AnalysisOutcome::Report(report) => report.raw.clone(),
        AnalysisOutcome::Malformed { raw, error } => json!({"malformed": {"raw": raw, "error": error}}),
    };
    match replies {
        None => analysis,
        Some(replies) => json!({
            "analysis": analysis,
            "replies": replies,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtext_engine::parse::parse_analysis;
    use subtext_engine::{ReplySet, ReplyTone, SchemaVersion};

    fn args() -> ScanArgs {
        ScanArgs {
            text: None,
            url: None,
            file: None,
            reply: None,
            json: false,
        }
    }

    fn scan(raw: &str) -> Scan {
        Scan {
            source: Source {
                label: "https://news.example/story".into(),
                url: None,
                title: Some("Story".into()),
                words: 420,
                truncated: true,
            },
            outcome: parse_analysis(raw, SchemaVersion::V1),
            model: None,
            tokens_used: None,
        }
    }

    #[test]
    fn input_comes_from_the_first_given_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message.txt");
        std::fs::write(&path, "from a file").unwrap();

        let a = ScanArgs {
            file: Some(path),
            ..args()
        };
        assert_eq!(resolve_input(&a).unwrap(), "from a file");

        let a = ScanArgs {
            text: Some("inline".into()),
            ..args()
        };
        assert_eq!(resolve_input(&a).unwrap(), "inline");

        let a = ScanArgs {
            file: Some(dir.path().join("missing.txt")),
            ..args()
        };
        assert!(resolve_input(&a).unwrap_err().to_string().contains("missing.txt"));
    }

    #[test]
    fn plain_output_has_source_dashboard_and_replies() {
        let s = scan(r#"{"tone": "urgent", "summary": ["Deadline pressure"]}"#);
        let replies = ReplyOutcome::Replies(ReplySet {
            tone: ReplyTone::Neutral,
            replies: vec!["Noted, I will reply tomorrow.".into()],
        });
        let out = plain_output(&s, Some(&replies));
        assert!(out.starts_with("Source: https://news.example/story (420 words, truncated)\nTitle: Story\n"));
        assert!(out.contains("  Tone: urgent"));
        assert!(out.contains("  • Deadline pressure"));
        assert!(out.contains("== Replies (neutral) ==\n  1. Noted, I will reply tomorrow."));
    }

    #[test]
    fn malformed_reply_is_printed_raw() {
        let s = scan("sorry, I cannot do that");
        let out = plain_output(&s, None);
        assert!(out.contains("sorry, I cannot do that"));
        let v = json_output(&s, None);
        assert_eq!(v["malformed"]["raw"], "sorry, I cannot do that");
    }

    #[test]
    fn json_output_is_the_raw_report() {
        let s = scan(r#"{"tone": "calm", "x_extra": 1}"#);
        let v = json_output(&s, None);
        assert_eq!(v, json!({"tone": "calm", "x_extra": 1}));
    }

    #[test]
    fn failure_families_have_distinct_exit_codes() {
        let codes = [
            FailureKind::Usage,
            FailureKind::Acquisition,
            FailureKind::MalformedOutput,
            FailureKind::Provider,
        ]
        .map(|k| format!("{:?}", exit_code(k)));
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
