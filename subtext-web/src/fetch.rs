use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use subtext_http::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};
use subtext_http::{HttpClient, HttpError, RequestOpts, TextResponse};
use url::Url;

use crate::extract::{self, Strategy};
use crate::{AcquireError, guard};

/// `Content-Type` substrings treated as readable documents.
pub const READABLE_CONTENT_TYPES: [&str; 3] = ["html", "text", "xml"];

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Pages with fewer extracted words are rejected.
    pub min_words: usize,
    /// A cascade candidate needs this many words to win outright.
    pub min_block_words: usize,
    pub max_chars: usize,
    /// Download cap; larger pages are refused rather than buffered.
    pub max_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_redirects: 5,
            min_words: 50,
            min_block_words: 25,
            max_chars: 12_000,
            max_bytes: 5 * 1024 * 1024,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub url: Url,
    pub title: Option<String>,
    pub text: String,
    /// Word count before truncation.
    pub words: usize,
    pub strategy: Strategy,
    pub truncated: bool,
}

/// Anything that can turn a URL into readable text.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, AcquireError>;
}

/// Plain HTTP page source: one GET with browser-like headers, no JavaScript,
/// no retries.
pub struct PageFetcher {
    http: HttpClient,
    settings: FetchSettings,
}

impl PageFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, AcquireError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.7"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let http = HttpClient::unanchored(&settings.user_agent, headers, settings.max_redirects)
            .map_err(|e| AcquireError::Fetch(e.to_string()))?
            .with_timeout(settings.timeout)
            .with_retries(0);

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, AcquireError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AcquireError::InvalidUrl(url.to_string()));
        }

        tracing::info!(%url, "web.fetch.start");
        let resp = self
            .http
            .get_text(
                url.as_str(),
                RequestOpts {
                    max_body_bytes: Some(self.settings.max_bytes),
                    content_types: Some(&READABLE_CONTENT_TYPES),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| match e {
                HttpError::Url(msg) => AcquireError::InvalidUrl(msg),
                HttpError::Timeout(d) => {
                    AcquireError::Fetch(format!("timed out after {}s", d.as_secs()))
                }
                HttpError::TooLarge { limit } => {
                    AcquireError::Fetch(format!("page is larger than {} KiB", limit / 1024))
                }
                other => AcquireError::Fetch(other.to_string()),
            })?;

        let page = read_page(resp, &self.settings);
        match &page {
            Ok(p) => tracing::info!(
                url = %p.url,
                words = p.words,
                strategy = ?p.strategy,
                truncated = p.truncated,
                "web.fetch.done"
            ),
            Err(e) => tracing::warn!(%url, error = %e, "web.fetch.rejected"),
        }
        page
    }
}

/// Turn a fetched response into page text, applying the anti-bot, status,
/// length, and size rules.
pub fn read_page(resp: TextResponse, settings: &FetchSettings) -> Result<FetchedPage, AcquireError> {
    if let Some(ct) = resp.content_type.as_deref() {
        let ct = ct.to_ascii_lowercase();
        if !READABLE_CONTENT_TYPES.iter().any(|t| ct.contains(t)) {
            return Err(AcquireError::Fetch(format!("unsupported content type {ct}")));
        }
    }

    let doc = Html::parse_document(&resp.body);
    let title = extract::page_title(&doc);
    let body = extract::body_text(&doc);
    let status = resp.status.as_u16();
    let marker = guard::detect_interstitial(status, title.as_deref(), &body);

    if let Some(marker) = marker {
        if resp.status.is_success() || guard::is_challenge_status(status) {
            return Err(AcquireError::Blocked { marker });
        }
    }
    if !resp.status.is_success() {
        return Err(AcquireError::Fetch(format!("HTTP {status}")));
    }

    let extracted =
        extract::extract_document(&doc, settings.min_block_words).ok_or(AcquireError::Empty)?;
    if extracted.words < settings.min_words {
        return Err(AcquireError::TooShort {
            words: extracted.words,
            min: settings.min_words,
        });
    }

    let (text, truncated) = extract::truncate_chars(&extracted.text, settings.max_chars);
    Ok(FetchedPage {
        url: resp.final_url,
        title: extracted.title,
        text,
        words: extracted.words,
        strategy: extracted.strategy,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtext_http::StatusCode;

    fn response(status: u16, body: &str) -> TextResponse {
        TextResponse {
            status: StatusCode::from_u16(status).unwrap(),
            final_url: Url::parse("https://news.example/a").unwrap(),
            content_type: Some("text/html; charset=utf-8".into()),
            body: body.to_string(),
        }
    }

    fn article(words: usize) -> String {
        format!(
            "<html><head><title>Story</title></head><body><article><p>{}</p></article></body></html>",
            vec!["word"; words].join(" ")
        )
    }

    #[test]
    fn good_article_is_read() {
        let page = read_page(response(200, &article(120)), &FetchSettings::default()).unwrap();
        assert_eq!(page.words, 120);
        assert_eq!(page.strategy, Strategy::Article);
        assert_eq!(page.title.as_deref(), Some("Story"));
        assert!(!page.truncated);
    }

    #[test]
    fn short_page_is_too_short() {
        let err = read_page(response(200, &article(10)), &FetchSettings::default()).unwrap_err();
        assert!(matches!(err, AcquireError::TooShort { words: 10, min: 50 }));
    }

    #[test]
    fn challenge_page_is_blocked() {
        let html = "<html><head><title>Just a moment...</title></head>\
                    <body>Checking your browser before accessing.</body></html>";
        let err = read_page(response(503, html), &FetchSettings::default()).unwrap_err();
        assert!(matches!(err, AcquireError::Blocked { marker: "just a moment" }));
    }

    #[test]
    fn plain_error_status_is_a_fetch_error() {
        let err = read_page(response(404, &article(120)), &FetchSettings::default()).unwrap_err();
        assert!(matches!(err, AcquireError::Fetch(ref m) if m == "HTTP 404"));
    }

    #[test]
    fn long_text_is_truncated() {
        let settings = FetchSettings {
            max_chars: 100,
            ..FetchSettings::default()
        };
        let page = read_page(response(200, &article(200)), &settings).unwrap();
        assert!(page.truncated);
        assert_eq!(page.text.chars().count(), 100);
        assert_eq!(page.words, 200);
    }

    #[test]
    fn article_with_a_marker_in_its_title_is_read() {
        let html = format!(
            "<html><head><title>Cloudflare outage knocks half the web offline</title></head>\
             <body><article><p>{}</p></article></body></html>",
            vec!["engineers"; 520].join(" ")
        );
        let page = read_page(response(200, &html), &FetchSettings::default()).unwrap();
        assert_eq!(page.words, 520);
    }

    #[test]
    fn binary_content_is_refused() {
        let mut resp = response(200, "%PDF-1.7");
        resp.content_type = Some("application/pdf".into());
        let err = read_page(resp, &FetchSettings::default()).unwrap_err();
        assert!(matches!(err, AcquireError::Fetch(_)));
    }
}
