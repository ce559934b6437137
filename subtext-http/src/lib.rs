//! Minimal HTTP client with safe logging, shared by the provider client and
//! the page fetcher.
//!
//! - Request options: bearer auth, timeout, retry budget
//! - Redacts sensitive query params of fetched URLs and never logs secrets
//! - Optional retries of 429/5xx with exponential backoff and `Retry-After`
//!   support; the default budget is zero, every failure is final unless a
//!   caller opts in
//! - JSON helpers for provider APIs and a text helper for page fetches
//! - Page bodies are decoded by their declared charset and read under a byte cap
//! - Optional *raw* request/response logging via `SUBTEXT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), subtext_http::HttpError> {
//! use subtext_http::{Auth, RequestOpts};
//!
//! let client = subtext_http::HttpClient::new("https://api.example.com/v1/")?;
//! let opts = RequestOpts {
//!     auth: Some(Auth::Bearer("sk-test")),
//!     ..Default::default()
//! };
//! let got: serde_json::Value = client
//!     .post_json_opts("chat/completions", &serde_json::json!({}), opts)
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind, not the secret.

use reqwest::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER,
};
use encoding_rs::{Encoding, UTF_8};
use reqwest::{Client, Method, Response, Url, redirect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

pub use reqwest::StatusCode;
pub use reqwest::header;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "SUBTEXT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug. The query string is
/// redacted the same way as the structured logs.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            let s = truncate_chars(s, RAW_MAX_BODY);
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    let (host_path, query) = redact_query(url);
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let shown = if query.is_empty() {
        format!("{}://{}", url.scheme(), host_path)
    } else {
        format!("{}://{}?{}", url.scheme(), host_path, query)
    };
    parts.push(format!("'{shown}'"));
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") {
                val = "Bearer <redacted>".into();
            }
            (key, val)
        })
        .collect()
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let secret = is_secret_param(&k);
            (
                k.to_string(),
                if secret {
                    "<redacted>".into()
                } else {
                    v.to_string()
                },
            )
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("unsupported content type {0}")]
    UnsupportedContent(String),
}

// ==============================
// Auth & Request Options
// ==============================

/// How a request authenticates. Page fetches go out anonymously.
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use subtext_http::{Auth, RequestOpts};
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     auth: Some(Auth::Bearer("sk-demo")),
///     max_body_bytes: Some(1 << 20),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    /// Refuse bodies larger than this, by `Content-Length` or while streaming.
    pub max_body_bytes: Option<usize>,
    /// Accepted `Content-Type` substrings (lowercase). Other declared types
    /// are refused from the headers, before any of the body is read.
    pub content_types: Option<&'a [&'a str]>,
}

/// A fetched text document. Returned for every status code so callers can
/// inspect error pages (e.g. anti-bot interstitials) themselves.
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub status: StatusCode,
    /// URL after redirects.
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Option<Url>,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

struct RawResponse {
    req_id: String,
    status: StatusCode,
    headers: HeaderMap,
    final_url: Url,
    bytes: Vec<u8>,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use subtext_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(&with_trailing_slash(base)).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base: Some(base),
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 0,
        })
    }

    /// Construct a client without a base URL, for fetching arbitrary pages.
    /// `headers` are sent with every request.
    pub fn unanchored(
        user_agent: &str,
        headers: HeaderMap,
        max_redirects: usize,
    ) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(redirect::Policy::limited(max_redirects))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base: None,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 0,
        })
    }

    /// Override the default timeout.
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget (zero unless set).
    ///
    /// ```no_run
    /// use subtext_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com")?.with_retries(3);
    /// assert_eq!(client.max_retries, 3);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// POST JSON with per-request options (auth/timeout/retries).
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let raw = self.execute(Method::POST, url, Some(bytes), opts).await?;
        decode_json(raw)
    }

    /// GET a text document. Any status is returned as a [`TextResponse`];
    /// only transport failures are errors. Unanchored clients take absolute URLs.
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<TextResponse, HttpError> {
        let url = self.resolve(path)?;
        let raw = self.execute(Method::GET, url, None, opts).await?;
        let content_type = header_str(&raw.headers, CONTENT_TYPE).map(str::to_string);
        let encoding = body_encoding(content_type.as_deref(), &raw.bytes);
        let (body, _, had_errors) = encoding.decode(&raw.bytes);
        if had_errors {
            tracing::debug!(req_id=%raw.req_id, encoding=encoding.name(), "http.response.lossy_decode");
        }
        Ok(TextResponse {
            status: raw.status,
            final_url: raw.final_url,
            content_type,
            body: body.into_owned(),
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        match &self.base {
            Some(base) => base
                .join(path.trim_start_matches('/'))
                .map_err(|e| HttpError::Url(e.to_string())),
            None => Url::parse(path).map_err(|e| HttpError::Url(e.to_string())),
        }
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        // Pasted article URLs can carry tokens in the query string.
        let (host_path, redacted_q) = redact_query(&url);

        let req_id = format!("r-{}", uuid::Uuid::new_v4().simple());
        let mut attempt = 0usize;

        loop {
            let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);
            if let Some(bytes) = &body {
                rb = rb
                    .header(CONTENT_TYPE, "application/json")
                    .body(bytes.clone());
            }
            if let Some(Auth::Bearer(tok)) = &opts.auth {
                let tok = sanitize_api_key(tok)?;
                rb = rb.bearer_auth(tok);
            }

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%host_path,
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                has_body=%body.is_some(),
                "http.request.start"
            );

            if raw_enabled() {
                let mut shown = HeaderMap::new();
                if matches!(opts.auth, Some(Auth::Bearer(_))) {
                    shown.insert(AUTHORIZATION, HeaderValue::from_static("Bearer <redacted>"));
                }
                if body.is_some() {
                    shown.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                let curl = make_curl(&method, &url, &shown, body.as_deref());
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let t0 = std::time::Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    let final_url = resp.url().clone();
                    if let Err(refused) = admit_headers(&headers, &opts) {
                        tracing::warn!(req_id=%req_id, %status, error=%refused, "http.response.refused");
                        return Err(refused);
                    }
                    match read_capped(resp, opts.max_body_bytes).await {
                        Ok(Some(bytes)) => Ok((status, headers, final_url, bytes)),
                        Ok(None) => {
                            let limit = opts.max_body_bytes.unwrap_or_default();
                            tracing::warn!(req_id=%req_id, %status, limit, "http.response.too_large");
                            return Err(HttpError::TooLarge { limit });
                        }
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(err),
            };

            let (status, headers, final_url, bytes) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        timeout = err.is_timeout(),
                        message=%message,
                        "http.network_error"
                    );
                    if err.is_timeout() {
                        return Err(HttpError::Timeout(timeout));
                    }
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let upstream_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            let remaining = headers
                .get("x-ratelimit-remaining-requests")
                .and_then(|v| v.to_str().ok());

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=bytes.len(),
                x_request_id=%upstream_id,
                rate_limit.remaining=?remaining,
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let text = String::from_utf8_lossy(&bytes);
                let truncated = text.len() > RAW_MAX_BODY;
                tracing::info!(
                    target: "http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%truncate_chars(&text, RAW_MAX_BODY),
                    truncated
                );
            }

            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            if (is_429 || status.is_server_error()) && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if is_429 => backoff(attempt).max(Duration::from_millis(1100)),
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    body_snippet=%snip_body(&bytes),
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            return Ok(RawResponse {
                req_id: if upstream_id == "-" { req_id } else { upstream_id },
                status,
                headers,
                final_url,
                bytes,
            });
        }
    }
}

fn decode_json<T: DeserializeOwned>(raw: RawResponse) -> Result<T, HttpError> {
    let snippet = snip_body(&raw.bytes);
    if raw.status.is_success() {
        return serde_json::from_slice::<T>(&raw.bytes).map_err(|e| {
            tracing::warn!(
                req_id=%raw.req_id,
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        });
    }

    let message = extract_error_message(&raw.bytes);
    tracing::warn!(
        req_id=%raw.req_id,
        status=%raw.status,
        message=%message,
        body_snippet=%snippet,
        "http.error"
    );
    Err(HttpError::Api {
        status: raw.status,
        message,
        request_id: raw.req_id,
    })
}

// ==============================
// Helpers
// ==============================

fn header_str(h: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    h.get(name).and_then(|v| v.to_str().ok())
}

/// Refuse a response on its headers alone: a declared type outside
/// `content_types`, or a declared length over `max_body_bytes`.
fn admit_headers(headers: &HeaderMap, opts: &RequestOpts<'_>) -> Result<(), HttpError> {
    if let (Some(accepted), Some(ct)) = (opts.content_types, header_str(headers, CONTENT_TYPE)) {
        let ct = ct.to_ascii_lowercase();
        if !accepted.iter().any(|a| ct.contains(a)) {
            return Err(HttpError::UnsupportedContent(ct));
        }
    }
    if let Some(limit) = opts.max_body_bytes {
        let declared = header_str(headers, CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok());
        if declared.is_some_and(|len| len > limit as u64) {
            return Err(HttpError::TooLarge { limit });
        }
    }
    Ok(())
}

/// Stream the body chunk by chunk. `Ok(None)` once it grows past `limit`.
async fn read_capped(mut resp: Response, limit: Option<usize>) -> Result<Option<Vec<u8>>, reqwest::Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if limit.is_some_and(|max| buf.len() + chunk.len() > max) {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf))
}

/// Charset from the `Content-Type` header, else from a `<meta>` tag near the
/// top of the document, else UTF-8. A byte-order mark wins over both.
fn body_encoding(content_type: Option<&str>, body: &[u8]) -> &'static Encoding {
    if let Some((enc, _)) = Encoding::for_bom(body) {
        return enc;
    }
    content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| meta_charset(body))
        .unwrap_or(UTF_8)
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

/// Covers `<meta charset="...">` and the `http-equiv` form, whose `content`
/// attribute carries `charset=...`.
fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(1024)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let at = head.find("charset=")?;
    let label: String = head[at + 8..]
        .trim_start_matches(|c| c == '"' || c == '\'')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();
    Encoding::for_label(label.as_bytes())
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(8) as u32;
    Duration::from_millis(200u64.saturating_mul(1 << shift))
}

fn extract_error_message(body: &[u8]) -> String {
    // OpenAI style: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct OpenAiEnv {
        error: OpenAiDetail,
    }
    #[derive(Deserialize)]
    struct OpenAiDetail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<OpenAiEnv>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn truncate_chars(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", &s[..end]))
}

fn snip_body(body: &[u8]) -> String {
    truncate_chars(&String::from_utf8_lossy(body), SNIPPET_MAX).into_owned()
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn api_key_is_trimmed_and_unquoted() {
        assert_eq!(sanitize_api_key(" \"sk-abc\n\" ").unwrap(), "sk-abc");
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("sk-é").is_err());
    }

    #[test]
    fn secret_query_params_are_redacted() {
        let url = Url::parse("https://h.example/p?api_key=s3cr3t&q=news").unwrap();
        let (host_path, q) = redact_query(&url);
        assert_eq!(host_path, "h.example/p");
        assert_eq!(q[0], ("api_key".into(), "<redacted>".into()));
        assert_eq!(q[1], ("q".into(), "news".into()));
    }

    #[test]
    fn curl_never_contains_bearer_or_secret_query() {
        let url = Url::parse("https://h.example/p?token=abc").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer sk-live"));
        let curl = make_curl(&Method::GET, &url, &headers, None);
        assert!(!curl.contains("sk-live"));
        assert!(!curl.contains("abc"));
    }

    #[test]
    fn error_message_prefers_openai_envelope() {
        let body = br#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(extract_error_message(body), "Incorrect API key provided");
        assert_eq!(extract_error_message(br#"{"detail":"nope"}"#), "nope");
        assert_eq!(extract_error_message(b"plain failure"), "plain failure");
    }

    #[test]
    fn snippet_truncation_respects_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[tokio::test]
    async fn post_json_sends_bearer_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/echo"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&format!("{}/v1", server.uri())).unwrap();
        let got: serde_json::Value = client
            .post_json_opts(
                "echo",
                &serde_json::json!({"x": 1}),
                RequestOpts {
                    auth: Some(Auth::Bearer("sk-test")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(got["ok"], true);
    }

    #[tokio::test]
    async fn server_errors_are_final_without_retry_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": {"message": "boom"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client
            .post_json_opts::<_, serde_json::Value>("x", &serde_json::json!({}), RequestOpts::default())
            .await
            .unwrap_err();
        match err {
            HttpError::Api { status, message, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn retry_budget_is_honoured_when_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
        let res = client
            .post_json_opts::<_, serde_json::Value>("x", &serde_json::json!({}), RequestOpts::default())
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn get_text_returns_error_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<title>Just a moment...</title>"),
            )
            .mount(&server)
            .await;

        let client = HttpClient::unanchored("subtext-test", HeaderMap::new(), 3).unwrap();
        let page = client
            .get_text(&format!("{}/blocked", server.uri()), RequestOpts::default())
            .await
            .unwrap();
        assert_eq!(page.status, StatusCode::FORBIDDEN);
        assert!(page.body.contains("Just a moment"));
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
    }

    #[test]
    fn charset_comes_from_header_then_meta() {
        let latin = b"<p>caf\xe9</p>";
        assert_eq!(body_encoding(Some("text/html; charset=ISO-8859-1"), latin), encoding_rs::WINDOWS_1252);
        assert_eq!(body_encoding(Some("text/html; charset=\"utf-8\""), latin), UTF_8);

        let meta = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\">";
        assert_eq!(body_encoding(Some("text/html"), meta), encoding_rs::WINDOWS_1252);
        assert_eq!(body_encoding(None, b"<meta charset='koi8-r'>"), encoding_rs::KOI8_R);
        assert_eq!(body_encoding(None, b"<p>plain</p>"), UTF_8);
    }

    #[tokio::test]
    async fn get_text_decodes_the_declared_charset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=iso-8859-1")
                    .set_body_bytes(b"<p>Le caf\xe9 a rouvert apr\xe8s</p>".to_vec()),
            )
            .mount(&server)
            .await;

        let client = HttpClient::unanchored("subtext-test", HeaderMap::new(), 3).unwrap();
        let page = client.get_text(&server.uri(), RequestOpts::default()).await.unwrap();
        assert_eq!(page.body, "<p>Le café a rouvert après</p>");
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("x".repeat(4096)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::unanchored("subtext-test", HeaderMap::new(), 3).unwrap();
        let opts = RequestOpts {
            max_body_bytes: Some(1024),
            ..Default::default()
        };
        let err = client.get_text(&server.uri(), opts).await.unwrap_err();
        assert!(matches!(err, HttpError::TooLarge { limit: 1024 }), "{err}");
    }

    #[tokio::test]
    async fn undeclared_content_types_are_refused_from_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.7".to_vec()),
            )
            .mount(&server)
            .await;

        let client = HttpClient::unanchored("subtext-test", HeaderMap::new(), 3).unwrap();
        let opts = RequestOpts {
            content_types: Some(&["html", "text"]),
            ..Default::default()
        };
        let err = client.get_text(&server.uri(), opts).await.unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedContent(ref ct) if ct == "application/pdf"), "{err}");
    }
}
