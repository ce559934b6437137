use chrono::{DateTime, Utc};
use subtext_web::Input;
use uuid::Uuid;

use crate::parse::AnalysisOutcome;
use crate::reply::ReplyOutcome;
use crate::report::Report;

/// State of one interactive session. Lives in memory only.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    input: Option<Input>,
    /// Text actually sent to the model (pasted or extracted).
    text: Option<String>,
    analysis: Option<AnalysisOutcome>,
    replies: Option<ReplyOutcome>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            input: None,
            text: None,
            analysis: None,
            replies: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn input(&self) -> Option<&Input> {
        self.input.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn analysis(&self) -> Option<&AnalysisOutcome> {
        self.analysis.as_ref()
    }

    /// The last analysis, when it parsed into a report.
    pub fn report(&self) -> Option<&Report> {
        self.analysis.as_ref().and_then(AnalysisOutcome::report)
    }

    pub fn replies(&self) -> Option<&ReplyOutcome> {
        self.replies.as_ref()
    }

    /// A new input invalidates everything derived from the previous one.
    pub fn begin(&mut self, input: Input) {
        self.input = Some(input);
        self.text = None;
        self.analysis = None;
        self.replies = None;
    }

    pub fn record_analysis(&mut self, text: String, outcome: AnalysisOutcome) {
        self.text = Some(text);
        self.analysis = Some(outcome);
        self.replies = None;
    }

    pub fn record_replies(&mut self, outcome: ReplyOutcome) {
        self.replies = Some(outcome);
    }

    /// Clear input, analysis and replies, and start under a fresh id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.analysis.is_none() && self.replies.is_none()
    }
}
