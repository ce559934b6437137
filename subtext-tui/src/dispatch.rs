//! Command routing and the one-action-in-flight rule, kept free of the
//! terminal. The actor turns each [`Step`] into transcript lines or a
//! background call to the analyst.
use crate::{
    command::{Command, parse_command},
    render, styles,
    transcript::TranscriptLine,
};
use subtext_common::SubtextError;
use subtext_engine::{ReplyTone, SchemaVersion};

/// Work handed to the analyst.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Scan(String),
    Reply(ReplyTone),
    Raw,
    Reset,
    SetSchema(SchemaVersion),
}

impl Job {
    /// Status-bar label while the job runs. Schema switches apply to the
    /// next analysis and never hold the UI.
    fn busy_label(&self) -> Option<&'static str> {
        match self {
            Job::Scan(_) => Some("Analyzing…"),
            Job::Reply(_) => Some("Drafting replies…"),
            Job::Raw => Some("Loading the raw reply…"),
            Job::Reset => Some("Resetting…"),
            Job::SetSchema(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Show(Vec<TranscriptLine>),
    Run(Job),
    Quit,
}

#[derive(Debug)]
pub struct Dispatch {
    busy: Option<&'static str>,
    last_input: Option<String>,
    schema: SchemaVersion,
}

impl Dispatch {
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            busy: None,
            last_input: None,
            schema,
        }
    }

    pub fn busy(&self) -> Option<&'static str> {
        self.busy
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// Route one submitted line.
    pub fn submit(&mut self, line: &str) -> Step {
        let s = line.trim();
        if s.is_empty() {
            return Step::Show(render::error_lines(&SubtextError::Session(
                "empty input: paste a text or a URL first".to_string(),
            )));
        }
        self.route(parse_command(s))
    }

    /// The running job finished, successfully or not.
    pub fn finish(&mut self) {
        self.busy = None;
    }

    /// After a reset there is nothing left to re-analyze.
    pub fn forget_input(&mut self) {
        self.last_input = None;
    }

    fn route(&mut self, cmd: Command) -> Step {
        match cmd {
            Command::Quit => Step::Quit,
            Command::Help => Step::Show(render::help_lines()),
            Command::Scan(input) => self.start(Job::Scan(input)),
            Command::Rescan => match self.last_input.clone() {
                Some(input) => self.start(Job::Scan(input)),
                None => Step::Show(vec![TranscriptLine::new(
                    "Nothing to re-analyze yet.",
                    styles::dim(),
                )]),
            },
            Command::Reply(tone) => self.start(Job::Reply(tone)),
            Command::Raw => self.start(Job::Raw),
            Command::Reset => self.start(Job::Reset),
            Command::Schema(None) => Step::Show(vec![TranscriptLine::new(
                format!(
                    "Schema {} ({}); switch with /schema v1|v2.",
                    self.schema,
                    self.schema.label()
                ),
                styles::system(),
            )]),
            Command::Schema(Some(version)) => {
                self.schema = version;
                self.start(Job::SetSchema(version))
            }
            Command::Invalid(msg) => {
                Step::Show(vec![TranscriptLine::new(format!("× {msg}"), styles::error())])
            }
            Command::Unknown(s) => Step::Show(vec![
                TranscriptLine::new(format!("× Unknown command: {s}"), styles::error()),
                TranscriptLine::new("Try `/help`.", styles::dim()),
            ]),
        }
    }

    fn start(&mut self, job: Job) -> Step {
        let Some(label) = job.busy_label() else {
            return Step::Run(job);
        };
        if let Some(what) = self.busy {
            return Step::Show(vec![TranscriptLine::new(
                format!("× Still {}; wait for it to finish.", what.to_lowercase()),
                styles::warning(),
            )]);
        }
        if let Job::Scan(input) = &job {
            self.last_input = Some(input.clone());
        }
        self.busy = Some(label);
        Step::Run(job)
    }
}
