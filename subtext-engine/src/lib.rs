//! The analysis pipeline: prompt construction, reply parsing, the
//! presentation model and the per-session [`Analyst`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use subtext_engine::{Analyst, AnalystSettings, present};
//! use subtext_llm::openai::OpenAiClient;
//! use subtext_web::{FetchSettings, PageFetcher};
//!
//! # #[tokio::main]
//! # async fn main() -> subtext_common::Result<()> {
//! let llm = Arc::new(OpenAiClient::new("sk-...".into(), "gpt-4.1-mini".into())?);
//! let pages = Arc::new(PageFetcher::new(FetchSettings::default()).expect("fetcher"));
//! let mut analyst = Analyst::new(llm, pages, AnalystSettings::default());
//!
//! let scan = analyst.scan("We need your sign-off today, everyone else already agreed.").await?;
//! if let Some(dashboard) = scan.dashboard() {
//!     println!("{}", present::render_plain(&dashboard));
//! }
//! # Ok(())
//! # }
//! ```
pub mod analyst;
pub mod parse;
pub mod present;
pub mod prompt;
pub mod reply;
pub mod report;
pub mod session;

pub use analyst::{Analyst, AnalystSettings, Scan, Source};
pub use parse::AnalysisOutcome;
pub use present::{Dashboard, Item, ScoreLevel, Section};
pub use reply::{ReplyOutcome, ReplySet, ReplyTone};
pub use report::{Report, ReportBody};
pub use session::Session;
pub use subtext_common::SchemaVersion;
