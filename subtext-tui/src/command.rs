use subtext_engine::{ReplyTone, SchemaVersion};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scan(String),                  // /scan <text|url> | plain input
    Rescan,                        // /scan
    Reply(ReplyTone),              // /reply <tone>
    Raw,                           // /raw
    Reset,                         // /reset
    Schema(Option<SchemaVersion>), // /schema | /schema v1|v2
    Help,                          // /help
    Quit,                          // /quit or /exit
    Invalid(String),
    Unknown(String),
}

/// An unknown verb followed by at least this many words is prose.
const PROSE_AFTER_VERB_WORDS: usize = 3;

/// Non-command input is text (or a URL) to analyze. So is slash-led prose
/// such as "/r/politics thread says ...": an unknown verb that is a path,
/// or that is followed by a sentence.
pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Command::Scan(trimmed.to_string());
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match verb {
        "/scan" => match rest {
            None => Command::Rescan,
            Some(text) => Command::Scan(text.to_string()),
        },
        "/reply" => match rest {
            None => Command::Invalid(format!(
                "usage: /reply <tone> (one of: {})",
                ReplyTone::names()
            )),
            Some(tone) => match tone.parse() {
                Ok(tone) => Command::Reply(tone),
                Err(e) => Command::Invalid(e),
            },
        },
        "/raw" => Command::Raw,
        "/reset" => Command::Reset,
        "/schema" => match rest {
            None => Command::Schema(None),
            Some(v) => match v.parse() {
                Ok(version) => Command::Schema(Some(version)),
                Err(e) => Command::Invalid(e),
            },
        },
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ if looks_like_prose(verb, rest) => Command::Scan(trimmed.to_string()),
        _ => Command::Unknown(trimmed.to_string()),
    }
}

fn looks_like_prose(verb: &str, rest: Option<&str>) -> bool {
    let is_path = verb[1..].contains('/');
    let words = rest.map_or(0, |r| r.split_whitespace().count());
    is_path || words >= PROSE_AFTER_VERB_WORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_input_is_a_scan() {
        assert_eq!(
            parse_command("  https://example.com/a  "),
            Command::Scan("https://example.com/a".into())
        );
        assert_eq!(
            parse_command("/scan hello there"),
            Command::Scan("hello there".into())
        );
        assert_eq!(parse_command("/scan"), Command::Rescan);
    }

    #[test]
    fn reply_needs_a_known_tone() {
        assert_eq!(parse_command("/reply Firm"), Command::Reply(ReplyTone::Firm));
        assert!(matches!(parse_command("/reply"), Command::Invalid(m) if m.contains("ironic")));
        assert!(matches!(parse_command("/reply rude"), Command::Invalid(m) if m.contains("rude")));
    }

    #[test]
    fn schema_switch() {
        assert_eq!(
            parse_command("/schema v1"),
            Command::Schema(Some(SchemaVersion::V1))
        );
        assert_eq!(parse_command("/schema"), Command::Schema(None));
        assert!(matches!(parse_command("/schema v9"), Command::Invalid(_)));
    }

    #[test]
    fn simple_verbs() {
        assert_eq!(parse_command("/raw"), Command::Raw);
        assert_eq!(parse_command("/reset"), Command::Reset);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(
            parse_command("/frobnicate"),
            Command::Unknown("/frobnicate".into())
        );
        assert_eq!(
            parse_command("/rset now"),
            Command::Unknown("/rset now".into())
        );
    }

    #[test]
    fn slash_led_prose_is_scanned() {
        for text in [
            "/r/politics thread says the vote was rigged",
            "/r/news",
            "/s I totally believe this one, sure",
        ] {
            assert_eq!(parse_command(text), Command::Scan(text.into()), "{text}");
        }
        // Known verbs stay commands however long the rest is.
        assert!(matches!(
            parse_command("/reply firm and polite please"),
            Command::Invalid(_)
        ));
        assert_eq!(parse_command("/scan a b c d"), Command::Scan("a b c d".into()));
    }
}
