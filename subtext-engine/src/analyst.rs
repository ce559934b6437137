use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use subtext_common::{Result, SchemaVersion, SubtextError};
use subtext_config::SubtextConfig;
use subtext_llm::LlmClient;
use subtext_web::{Input, PageSource, extract::word_count};
use url::Url;
use uuid::Uuid;

use crate::parse::{self, AnalysisOutcome};
use crate::present::Dashboard;
use crate::prompt;
use crate::reply::{ReplyOutcome, ReplyTone};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalystSettings {
    pub schema: SchemaVersion,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub reply_temperature: Option<f32>,
    pub reply_max_tokens: Option<u32>,
    pub reply_count: usize,
}

impl Default for AnalystSettings {
    fn default() -> Self {
        Self::from_config(&SubtextConfig::default())
    }
}

impl AnalystSettings {
    pub fn from_config(cfg: &SubtextConfig) -> Self {
        Self {
            schema: cfg.analysis.schema,
            temperature: cfg.llm.temperature,
            max_tokens: cfg.llm.max_tokens,
            reply_temperature: cfg.llm.reply_temperature.or(cfg.llm.temperature),
            reply_max_tokens: cfg.analysis.reply_max_tokens,
            reply_count: cfg.analysis.reply_count,
        }
    }
}

/// Where the analyzed text came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub label: String,
    pub url: Option<Url>,
    pub title: Option<String>,
    pub words: usize,
    pub truncated: bool,
}

/// Result of one analysis round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub source: Source,
    pub outcome: AnalysisOutcome,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

impl Scan {
    pub fn dashboard(&self) -> Option<Dashboard> {
        self.outcome.report().map(Dashboard::from_report)
    }
}

/// Owns the provider client, the page source and the session; runs one
/// action at a time.
pub struct Analyst {
    llm: Arc<dyn LlmClient>,
    pages: Arc<dyn PageSource>,
    settings: AnalystSettings,
    session: Session,
}

impl Analyst {
    pub fn new(llm: Arc<dyn LlmClient>, pages: Arc<dyn PageSource>, settings: AnalystSettings) -> Self {
        Self {
            llm,
            pages,
            settings,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &AnalystSettings {
        &self.settings
    }

    /// Analyze pasted text or a URL.
    ///
    /// Acquisition and provider failures are errors; an unreadable model
    /// reply is a successful [`Scan`] whose outcome is `Malformed`.
    pub async fn scan(&mut self, raw: &str) -> Result<Scan> {
        let input = Input::parse(raw).ok_or_else(|| {
            SubtextError::Session("nothing to analyze: paste a text or a URL first".to_string())
        })?;
        let session_id = self.session.id();
        tracing::info!(%session_id, input = %input.label(), schema = %self.settings.schema, "engine.scan.start");

        self.session.begin(input.clone());
        let (text, source) = match &input {
            Input::Text(text) => {
                let source = Source {
                    label: input.label(),
                    url: None,
                    title: None,
                    words: word_count(text),
                    truncated: false,
                };
                (text.clone(), source)
            }
            Input::Url(url) => {
                let page = self.pages.fetch(url).await.map_err(|e| {
                    tracing::warn!(%session_id, %url, error = %e, "engine.scan.acquisition_failed");
                    SubtextError::Acquisition(e.user_message())
                })?;
                let source = Source {
                    label: page.url.to_string(),
                    url: Some(page.url.clone()),
                    title: page.title.clone(),
                    words: page.words,
                    truncated: page.truncated,
                };
                (page.text, source)
            }
        };

        let schema = self.settings.schema;
        let p = prompt::analysis_prompt(schema, &text, source.url.as_ref());
        let resp = self
            .llm
            .generate(&p.user, Some(p.system), self.settings.max_tokens, self.settings.temperature)
            .await
            .inspect_err(|e| tracing::warn!(%session_id, error = %e, "engine.scan.provider_failed"))?;

        let outcome = parse::parse_analysis(&resp.text, schema);
        tracing::info!(
            %session_id,
            words = source.words,
            malformed = outcome.is_malformed(),
            tokens_used = ?resp.tokens_used,
            "engine.scan.done"
        );
        self.session.record_analysis(text, outcome.clone());

        Ok(Scan {
            source,
            outcome,
            model: resp.model,
            tokens_used: resp.tokens_used,
        })
    }

    /// Draft replies in `tone` to the last successfully analyzed text.
    pub async fn reply(&mut self, tone: ReplyTone) -> Result<ReplyOutcome> {
        let (report, text) = match (self.session.analysis(), self.session.text()) {
            (Some(AnalysisOutcome::Report(report)), Some(text)) => (report, text),
            (Some(AnalysisOutcome::Malformed { .. }), _) => {
                return Err(SubtextError::Session(
                    "the last analysis could not be read; scan again before drafting replies"
                        .to_string(),
                ));
            }
            _ => {
                return Err(SubtextError::Session(
                    "no analysis yet: scan a text before asking for replies".to_string(),
                ));
            }
        };

        let session_id = self.session.id();
        tracing::info!(%session_id, %tone, "engine.reply.start");
        let p = prompt::reply_prompt(tone, report, text, self.settings.reply_count);
        let resp = self
            .llm
            .generate(
                &p.user,
                Some(p.system),
                self.settings.reply_max_tokens,
                self.settings.reply_temperature,
            )
            .await
            .inspect_err(|e| tracing::warn!(%session_id, error = %e, "engine.reply.provider_failed"))?;

        let outcome = parse::parse_replies(&resp.text, tone);
        tracing::info!(
            %session_id,
            malformed = matches!(outcome, ReplyOutcome::Malformed { .. }),
            "engine.reply.done"
        );
        self.session.record_replies(outcome.clone());
        Ok(outcome)
    }

    /// Pretty JSON of the last analysis, or the raw reply when it did not parse.
    pub fn raw_json(&self) -> Result<String> {
        match self.session.analysis() {
            Some(AnalysisOutcome::Report(r)) => {
                Ok(serde_json::to_string_pretty(&r.raw).unwrap_or_else(|_| r.raw.to_string()))
            }
            Some(AnalysisOutcome::Malformed { raw, .. }) => Ok(raw.clone()),
            None => Err(SubtextError::Session("no analysis to show yet".to_string())),
        }
    }

    /// Clear the session; returns the new session id.
    pub fn reset(&mut self) -> Uuid {
        let old = self.session.id();
        let lasted = Utc::now() - self.session.started_at();
        self.session.reset();
        tracing::info!(
            %old,
            new = %self.session.id(),
            lasted_secs = lasted.num_seconds(),
            "engine.session.reset"
        );
        self.session.id()
    }

    pub fn set_schema(&mut self, schema: SchemaVersion) {
        self.settings.schema = schema;
    }
}
