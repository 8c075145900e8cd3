use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ra_providers::OpenRouterProvider;

mod config;
mod runner;

use config::{Config, Secrets};
use runner::{ResearchContext, RunOutcome};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Requests, raw responses, model reasoning, tool arguments
    Debug,
    /// High-level flow
    Info,
    /// Quiet: repairs, unknown tools, tool failures
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "research-agent")]
#[command(author, version, about = "Single-turn research agent", long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write debug logs to file (JSON-lines format) instead of stderr
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

/// Prompt on stdout and read one line; `None` on end of input.
fn read_query() -> Result<Option<String>> {
    let mut stdout = std::io::stdout();
    write!(stdout, "What can I help you research? ")?;
    stdout.flush()?;

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read query from stdin")?;
    if read == 0 {
        return Ok(None);
    }

    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // Refuse to start without credentials
    let secrets = Secrets::load()?;
    let config = Config::load()?;
    tracing::debug!(?config, "Loaded configuration");

    let ctx = ResearchContext::from_config(&config);
    let provider = OpenRouterProvider::new(secrets.openrouter_api_key)
        .with_base_url(&config.base_url)
        .with_default_model(&config.model)
        .with_app_attribution(&config.referer, &config.title);

    let Some(query) = read_query()? else {
        println!();
        println!("No query provided.");
        return Ok(());
    };

    let mut stdout = std::io::stdout();
    let outcome = runner::run(&ctx, &provider, &query, &mut stdout).await?;
    stdout.flush()?;

    match outcome {
        RunOutcome::Completed { report, repaired } => tracing::info!(
            tools = report.invocations.len(),
            repaired,
            persisted = !report.persisted.is_error,
            "Research run finished"
        ),
        RunOutcome::CallFailed(e) => tracing::info!(error = %e, "Research run ended without a response"),
        RunOutcome::ParseFailed(e) => tracing::info!(error = %e, "Research run ended without a record"),
    }

    Ok(())
}
