use aicheck::config::Config;
use aicheck::debug_log::DebugLog;
use aicheck::error::SessionError;
use aicheck::pump::PumpOutcome;
use aicheck::render::{ChannelSink, RenderCommand, RenderSink, TerminalSink};
use aicheck::session::Checker;
use aicheck::tools::{Lifecycle, ToolBinding};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TITLE: &str = "AI記事チェッカー";
const URL_PROMPT: &str = "ブログ記事のURL: ";
const ANALYZING: &str = "ブログ記事を分析中…";

/// Judge whether a blog post reads as AI-generated.
#[derive(Debug, Parser)]
#[command(name = "aicheck", version)]
struct Cli {
    /// URL of the article to check. Prompted for when omitted.
    url: Option<String>,

    /// When the fetch tool process is started and stopped.
    #[arg(long, value_enum)]
    lifecycle: Option<Lifecycle>,

    /// Expose the server's own tool list or a single wrapped fetch tool.
    #[arg(long, value_enum)]
    binding: Option<ToolBinding>,

    /// Model id, overriding ANTHROPIC_MODEL.
    #[arg(long)]
    model: Option<String>,

    /// Print the session's debug log to stderr afterwards.
    #[arg(long)]
    debug: bool,
}

fn read_url() -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{URL_PROMPT}")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read URL from stdin")?;
    Ok(line.trim().to_string())
}

/// Map a finished session to the process status. The sink has already shown
/// the user-facing notice, so failure detail goes to the debug log only.
fn exit_code(result: &Result<PumpOutcome, SessionError>, log: &DebugLog) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            log.push(format!("session failed: {error}"));
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(lifecycle) = cli.lifecycle {
        config.lifecycle = lifecycle;
    }
    if let Some(binding) = cli.binding {
        config.binding = binding;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    config.validate()?;

    println!("{TITLE}");
    let url = match cli.url {
        Some(url) => url,
        None => read_url()?,
    };
    if !url.trim().is_empty() {
        println!("{ANALYZING}");
    }

    let log = DebugLog::with_capacity(config.debug_log_capacity);
    let checker = Checker::from_config(&config, log.clone())?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<RenderCommand>();
    let renderer = tokio::spawn(async move {
        let mut terminal = TerminalSink::stdout();
        while let Some(command) = rx.recv().await {
            terminal.apply(command);
        }
        terminal.finish();
    });

    let mut sink = ChannelSink::new(tx);
    let result = checker.check(&url, &mut sink, &cancel).await;
    drop(sink);
    renderer.await.context("render task failed")?;
    let status = exit_code(&result, &log);

    if cli.debug {
        for entry in log.entries() {
            eprintln!("[debug] {entry}");
        }
    }

    Ok(status)
}
