use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;

/// Elements whose text never counts as readable content.
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

static ARTICLE: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static BLOCKS: LazyLock<Selector> = LazyLock::new(|| selector("div, section, main, p"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[name="description"], meta[property="og:description"], meta[name="og:description"]"#)
});

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Which rung of the cascade produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Article,
    LargestBlock,
    Body,
    TitleAndMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub title: Option<String>,
    pub text: String,
    pub words: usize,
    pub strategy: Strategy,
}

/// Pull the main readable text out of an HTML document.
///
/// Candidates are tried in order: `<article>` text, the largest block by
/// word count, the whole body, then title plus meta description. The first
/// candidate reaching `min_block_words` wins; otherwise the longest
/// non-empty one. `None` when the page has no readable text at all.
pub fn extract(html: &str, min_block_words: usize) -> Option<Extracted> {
    extract_document(&Html::parse_document(html), min_block_words)
}

pub fn extract_document(doc: &Html, min_block_words: usize) -> Option<Extracted> {
    let title = page_title(doc);

    let article = {
        let parts: Vec<String> = doc
            .select(&ARTICLE)
            .map(visible_text)
            .filter(|t| !t.is_empty())
            .collect();
        parts.join("\n\n")
    };

    let largest = doc
        .select(&BLOCKS)
        .map(visible_text)
        .max_by_key(|t| word_count(t))
        .unwrap_or_default();

    let body = body_text(doc);

    let meta = {
        let description = meta_description(doc);
        [title.clone(), description]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(". ")
    };

    let candidates = [
        (Strategy::Article, article),
        (Strategy::LargestBlock, largest),
        (Strategy::Body, body),
        (Strategy::TitleAndMeta, meta),
    ];

    let counted: Vec<(Strategy, String, usize)> = candidates
        .into_iter()
        .map(|(s, t)| {
            let w = word_count(&t);
            (s, t, w)
        })
        .collect();

    let pick = counted
        .iter()
        .position(|(_, _, w)| *w >= min_block_words)
        .or_else(|| {
            counted
                .iter()
                .enumerate()
                .filter(|(_, (_, _, w))| *w > 0)
                .max_by(|(ia, (_, _, a)), (ib, (_, _, b))| a.cmp(b).then(ib.cmp(ia)))
                .map(|(i, _)| i)
        })?;

    let (strategy, text, words) = counted.into_iter().nth(pick)?;
    tracing::debug!(?strategy, words, "web.extract.picked");
    Some(Extracted {
        title,
        text,
        words,
        strategy,
    })
}

/// Normalized visible text of an element, skipping script-like subtrees.
pub fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    normalize_whitespace(&out)
}

pub fn body_text(doc: &Html) -> String {
    doc.select(&BODY).next().map(visible_text).unwrap_or_default()
}

pub fn page_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn meta_description(doc: &Html) -> Option<String> {
    doc.select(&META_DESCRIPTION)
        .filter_map(|el| el.value().attr("content"))
        .map(normalize_whitespace)
        .find(|d| !d.is_empty())
}

pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
/// Returns the text and whether anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => (s[..idx].to_string(), true),
        None => (s.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    #[test]
    fn article_wins_when_long_enough() {
        let html = format!(
            "<html><head><title>T</title></head><body>\
             <nav>{}</nav><article><p>{}</p></article></body></html>",
            words(80, "menu"),
            words(30, "story")
        );
        let ex = extract(&html, 25).unwrap();
        assert_eq!(ex.strategy, Strategy::Article);
        assert_eq!(ex.words, 30);
        assert!(!ex.text.contains("menu"));
        assert_eq!(ex.title.as_deref(), Some("T"));
    }

    #[test]
    fn script_and_style_text_is_ignored() {
        let html = format!(
            "<body><div><script>var tracking = 1;</script>\
             <style>.a {{ color: red }}</style><p>{}</p></div></body>",
            words(40, "real")
        );
        let ex = extract(&html, 25).unwrap();
        assert!(!ex.text.contains("tracking"));
        assert!(!ex.text.contains("color"));
        assert_eq!(ex.words, 40);
    }

    #[test]
    fn short_article_falls_through_to_largest_block() {
        let html = format!(
            "<body><article>tiny</article><section><p>{}</p></section></body>",
            words(40, "block")
        );
        let ex = extract(&html, 25).unwrap();
        assert_eq!(ex.strategy, Strategy::LargestBlock);
        assert!(ex.text.starts_with("block"));
    }

    #[test]
    fn adjacent_paragraphs_do_not_glue_words() {
        let html = "<body><div><p>alpha</p><p>beta</p></div></body>";
        let ex = extract(html, 1).unwrap();
        assert_eq!(ex.text, "alpha beta");
    }

    #[test]
    fn title_and_meta_is_last_resort() {
        let html = r#"<html><head><title>Headline</title>
            <meta property="og:description" content="A short teaser"></head>
            <body></body></html>"#;
        let ex = extract(html, 25).unwrap();
        assert_eq!(ex.strategy, Strategy::TitleAndMeta);
        assert_eq!(ex.text, "Headline. A short teaser");
    }

    #[test]
    fn nothing_readable_yields_none() {
        assert!(extract("<html><body><script>x()</script></body></html>", 25).is_none());
    }

    #[test]
    fn longest_candidate_used_when_none_reach_threshold() {
        let html = "<body><article>one two</article><div>one two three four</div></body>";
        let ex = extract(html, 25).unwrap();
        assert_eq!(ex.strategy, Strategy::Body);
        assert_eq!(ex.words, 6);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let (cut, truncated) = truncate_chars("héllo wörld", 7);
        assert_eq!(cut, "héllo w");
        assert!(truncated);
        let (same, truncated) = truncate_chars("short", 10);
        assert_eq!(same, "short");
        assert!(!truncated);
    }
}
