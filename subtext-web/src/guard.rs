//! Anti-bot interstitial detection.
//!
//! Markers are matched case-insensitively against the page title and the
//! visible text. A page answered with a challenge status is always checked.
//! Otherwise only short pages are: a long article titled "Cloudflare outage"
//! or mentioning a CAPTCHA is an article, not a challenge.

pub const INTERSTITIAL_MARKERS: [&str; 8] = [
    "just a moment",
    "cloudflare",
    "attention required",
    "checking your browser",
    "enable javascript and cookies",
    "captcha",
    "access denied",
    "are you a robot",
];

/// Pages with at least this many visible words are only checked under a
/// challenge status.
pub const SHORT_PAGE_WORDS: usize = 300;

/// Statuses that anti-bot layers typically answer with.
pub fn is_challenge_status(status: u16) -> bool {
    matches!(status, 403 | 429 | 503)
}

/// The first marker found, title first.
pub fn detect_interstitial(status: u16, title: Option<&str>, visible_text: &str) -> Option<&'static str> {
    let short = visible_text.split_whitespace().count() < SHORT_PAGE_WORDS;
    if !short && !is_challenge_status(status) {
        return None;
    }
    title
        .and_then(find_marker)
        .or_else(|| find_marker(visible_text))
}

fn find_marker(haystack: &str) -> Option<&'static str> {
    let lower = haystack.to_lowercase();
    INTERSTITIAL_MARKERS
        .iter()
        .copied()
        .find(|m| lower.contains(m))
}
