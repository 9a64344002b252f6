use chatwatch::commands::run_console;
use chatwatch::{channel_sink, format_line, Dispatcher, SinkMessage};
use chatwatch_core::config::Config;
use chatwatch_core::{Disposition, RawEvent};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "chatwatch", about = "Follow and filter a game chat log")]
struct Cli {
    /// Config file to layer over the defaults (default: ~/.config/chatwatch/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the chat log folder.
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Prefix each line with its timestamp.
    #[arg(long)]
    show_time: bool,

    /// Prefix each line with its channel label.
    #[arg(long)]
    show_label: bool,

    /// Emit one JSON object per visible event instead of plain lines.
    #[arg(long)]
    json: bool,

    /// Write debug logs to <tmp>/chatwatch-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load config, using defaults");
            Config::defaults()
        }),
    };
    if let Some(folder) = cli.folder {
        config.source.folder = folder;
    }

    let dispatcher = Dispatcher::new(&config)?;
    let (sink, rx) = channel_sink();
    dispatcher.add_sink(std::sync::Arc::new(sink));

    let printer = tokio::spawn(print_events(rx, Output {
        show_time: cli.show_time,
        show_label: cli.show_label,
        json: cli.json,
    }));

    dispatcher.start()?;
    eprintln!("watching {} (type `help` for commands)", dispatcher.folder().display());

    run_console(&dispatcher, BufReader::new(tokio::io::stdin()), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    dispatcher.stop_and_wait().await;
    let stats = dispatcher.stats();
    tracing::info!(?stats, "exiting");
    drop(dispatcher);
    let _ = printer.await;
    Ok(())
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    if debug {
        let path = std::env::temp_dir().join("chatwatch-debug.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!(path = %path.display(), "chatwatch debug log started");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct Output {
    show_time: bool,
    show_label: bool,
    json: bool,
}

impl Output {
    fn emit(&self, event: &RawEvent, disposition: Disposition) {
        if !disposition.is_visible() {
            return;
        }
        if self.json {
            let line = serde_json::json!({
                "channel": event.channel,
                "timestamp": event.timestamp,
                "text": event.text,
                "disposition": disposition,
            });
            println!("{line}");
        } else {
            println!("{}", format_line(event, self.show_time, self.show_label));
        }
    }
}

/// Stdout cannot be un-printed, so a replay is framed by separators instead of
/// clearing the screen.
async fn print_events(mut rx: mpsc::UnboundedReceiver<SinkMessage>, out: Output) {
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::Event { event, disposition } => out.emit(&event, disposition),
            SinkMessage::ReplayBegin => {
                if !out.json {
                    println!("──── rules changed, replaying history ────");
                }
            }
            SinkMessage::ReplayEvent { event, disposition } => out.emit(&event, disposition),
            SinkMessage::ReplayEnd => {
                if !out.json {
                    println!("──── end of history ────");
                }
            }
        }
    }
}
