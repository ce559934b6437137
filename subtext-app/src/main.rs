use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use subtext_common::{SchemaVersion, observability::init_logging};
use subtext_config::{SubtextConfig, SubtextConfigLoader};
use subtext_engine::ReplyTone;
use url::Url;

mod scan;
mod wiring;

/// Read the subtext of a message, post or article.
#[derive(Debug, Parser)]
#[command(name = "subtext", version, about)]
struct Cli {
    /// YAML config file; defaults to `subtext.yaml` in the config dir or cwd.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Display schema: v1 (decoder) or v2 (dashboard).
    #[arg(long, global = true, value_name = "VERSION")]
    schema: Option<SchemaVersion>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive dashboard (the default).
    Tui,
    /// Analyze once and print the result.
    Scan(ScanArgs),
}

/// With no source flag the text is read from stdin.
#[derive(Debug, Args)]
struct ScanArgs {
    /// Text to analyze.
    #[arg(long, conflicts_with_all = ["url", "file"])]
    text: Option<String>,
    /// Web page to fetch and analyze.
    #[arg(long, conflicts_with = "file")]
    url: Option<Url>,
    /// Read the text from a file.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Also draft replies in this tone.
    #[arg(long, value_name = "TONE")]
    reply: Option<ReplyTone>,
    /// Print the raw JSON instead of the rendered dashboard.
    #[arg(long)]
    json: bool,
}

fn load_config(cli: &Cli) -> Result<SubtextConfig> {
    let loader = SubtextConfigLoader::new();
    let loader = match &cli.config {
        Some(path) => loader.with_file(path),
        None => loader.with_default_files(),
    };
    let mut cfg = loader.load()?;
    if let Some(schema) = cli.schema {
        cfg.analysis.schema = schema;
    }
    Ok(cfg)
}

/// Restore the terminal before color-eyre prints a panic report.
fn install_panic_hook() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    let panic_hook = panic_hook.into_panic_hook();
    eyre_hook.install()?;
    std::panic::set_hook(Box::new(move |info| {
        subtext_tui::restore_terminal();
        panic_hook(info);
    }));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    install_panic_hook()?;
    // A missing .env is fine; the key may come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    match cli.command {
        None | Some(Command::Tui) => {
            init_logging(wiring::log_config(&cfg.logging, false))?;
            wiring::run_tui(cfg).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Scan(args)) => {
            init_logging(wiring::log_config(&cfg.logging, cfg.logging.stderr))?;
            scan::run(cfg, args).await
        }
    }
}
