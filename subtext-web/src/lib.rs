//! Input classification and web acquisition.
//!
//! - Input classification (text vs URL) for what the user typed
//! - Page fetching over a single browser-like GET (`fetch`)
//! - DOM-based main-text extraction (`extract`)
//! - Anti-bot interstitial detection (`guard`)

pub mod extract;
pub mod fetch;
pub mod guard;

use serde::{Deserialize, Serialize};
use url::Url;

pub use extract::{Extracted, Strategy};
pub use fetch::{FetchSettings, FetchedPage, PageFetcher, PageSource};

/// What the user handed over for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Input {
    Text(String),
    Url(Url),
}

impl Input {
    /// Classify raw input. A trimmed absolute http(s) URL with a host and no
    /// inner whitespace is a URL; anything else non-empty is text.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.contains(char::is_whitespace) {
            if let Ok(url) = Url::parse(trimmed) {
                if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
                    return Some(Self::Url(url));
                }
            }
        }
        Some(Self::Text(trimmed.to_string()))
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Short human label for logs and the status bar. Never the full text.
    pub fn label(&self) -> String {
        match self {
            Self::Url(u) => u.as_str().to_string(),
            Self::Text(t) => format!("text ({} words)", extract::word_count(t)),
        }
    }
}

pub const MANUAL_PASTE_HINT: &str =
    "Copy the article text from your browser and paste it directly instead.";

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("could not fetch page: {0}")]
    Fetch(String),
    #[error("page is behind an anti-bot check ({marker})")]
    Blocked { marker: &'static str },
    #[error("page text too short ({words} words, need {min})")]
    TooShort { words: usize, min: usize },
    #[error("no readable text found on page")]
    Empty,
}

impl AcquireError {
    /// Every acquisition failure recommends pasting the text by hand.
    pub fn hint(&self) -> &'static str {
        MANUAL_PASTE_HINT
    }

    /// Display message with the paste hint appended.
    pub fn user_message(&self) -> String {
        format!("{self}. {}", self.hint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_recognised() {
        let input = Input::parse("  https://example.com/news/1?x=2 \n").unwrap();
        assert!(input.is_url());
        assert_eq!(input.label(), "https://example.com/news/1?x=2");
    }

    #[test]
    fn non_http_schemes_and_sentences_are_text() {
        for raw in [
            "ftp://example.com/file",
            "mailto:someone@example.com",
            "see https://example.com for details",
            "example.com",
            "http://",
        ] {
            let input = Input::parse(raw).unwrap();
            assert!(!input.is_url(), "{raw} should be text");
        }
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(Input::parse("").is_none());
        assert!(Input::parse(" \t\n ").is_none());
    }

    #[test]
    fn text_label_does_not_leak_content() {
        let input = Input::parse("secret words here").unwrap();
        assert_eq!(input.label(), "text (3 words)");
    }

    #[test]
    fn every_failure_carries_the_paste_hint() {
        let errors = [
            AcquireError::InvalidUrl("x".into()),
            AcquireError::Fetch("timeout".into()),
            AcquireError::Blocked { marker: "captcha" },
            AcquireError::TooShort { words: 3, min: 50 },
            AcquireError::Empty,
        ];
        for err in errors {
            assert!(err.user_message().ends_with(MANUAL_PASTE_HINT), "{err}");
        }
    }
}
