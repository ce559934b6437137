use anyhow::{Context, Result, anyhow};
use std::{sync::Arc, time::Duration};
use subtext_actors::{ANALYST, actor::Addr, analyst::AnalystActor, builder::Builder};
use subtext_common::observability::{LogConfig, LogFormat};
use subtext_config::{AcquisitionConfig, LlmConfig, LlmProvider, LoggingConfig, SubtextConfig};
use subtext_engine::{Analyst, AnalystSettings};
use subtext_llm::{LlmClient, openai::OpenAiClient};
use subtext_tui::{TuiActor, spawn_tui_feeders};
use subtext_web::{FetchSettings, PageFetcher, fetch::BROWSER_USER_AGENT};

const ANALYST_MAILBOX: usize = 16;
const TUI_MAILBOX: usize = 256;
const TUI: &str = "tui:main";

pub fn log_config(cfg: &LoggingConfig, emit_stderr: bool) -> LogConfig {
    LogConfig {
        app_name: "subtext",
        log_dir: cfg.dir.clone(),
        emit_stderr,
        format: LogFormat::from_name(&cfg.format),
        default_filter: cfg.filter.clone(),
    }
}

pub fn fetch_settings(cfg: &AcquisitionConfig) -> FetchSettings {
    FetchSettings {
        timeout: Duration::from_secs(cfg.timeout_secs),
        max_redirects: cfg.max_redirects,
        min_words: cfg.min_words,
        min_block_words: cfg.min_block_words,
        max_chars: cfg.max_chars,
        max_bytes: cfg.max_page_bytes,
        user_agent: cfg
            .user_agent
            .clone()
            .unwrap_or_else(|| BROWSER_USER_AGENT.to_string()),
    }
}

pub fn build_llm_client(cfg: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match cfg.provider {
        LlmProvider::Openai => {
            let key = cfg.resolve_api_key().ok_or_else(|| {
                anyhow!(
                    "no API key: set {} (a .env file works) or llm.api_key",
                    cfg.api_key_env
                )
            })?;
            let client = OpenAiClient::with_base_url(key, cfg.model.clone(), &cfg.base_url)?
                .with_timeout(Duration::from_secs(cfg.timeout_secs))
                .with_retries(cfg.max_retries)
                .with_json_mode(cfg.json_mode);
            Ok(Arc::new(client))
        }
    }
}

pub fn build_analyst(cfg: &SubtextConfig) -> Result<Analyst> {
    let llm = build_llm_client(&cfg.llm)?;
    let pages = PageFetcher::new(fetch_settings(&cfg.acquisition))
        .context("page fetcher setup failed")?;
    Ok(Analyst::new(
        llm,
        Arc::new(pages),
        AnalystSettings::from_config(cfg),
    ))
}

/// Start the analyst and the TUI, then block until `/quit` or Ctrl-C.
pub async fn run_tui(cfg: SubtextConfig) -> Result<()> {
    let analyst = build_analyst(&cfg)?;
    let mut b = Builder::new();
    let shutdown = b.shutdown_handle();

    let r_analyst = b.reserve::<AnalystActor>(ANALYST, ANALYST_MAILBOX);
    let r_tui = b.reserve::<TuiActor>(TUI, TUI_MAILBOX);

    b.start_reserved(r_analyst, AnalystActor::new(analyst));
    let analyst_addr: Addr<AnalystActor> =
        b.addr(ANALYST).context("analyst mailbox missing")?;

    let tui = TuiActor::new(
        analyst_addr,
        cfg.analysis.schema,
        cfg.llm.model.clone(),
        shutdown.clone(),
    )?;
    b.start_reserved(r_tui, tui);
    let tui_addr: Addr<TuiActor> = b.addr(TUI).context("tui mailbox missing")?;
    spawn_tui_feeders(tui_addr, shutdown);

    tracing::info!(model = %cfg.llm.model, schema = %cfg.analysis.schema, "app.tui.start");
    let res = b.run_until_shutdown().await;
    subtext_tui::restore_terminal();
    res
}
