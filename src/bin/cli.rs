//! CLI binary for orion.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use orion::config::OrionConfig;
use orion::daemon::VoiceLoop;
use orion::dispatch::format_reminders;
use orion::events::{EventSink, JsonLineSink, NullSink};
use orion::monitor::{MonitorHandle, ReminderMonitor};
use orion::speech::{CommandInput, SpeechInput, create_input, create_output};
use orion::store::SharedStore;
use orion::{Assistant, logging, orion_dirs};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Orion: a voice-driven personal assistant.
#[derive(Parser)]
#[command(name = "orion", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Type commands interactively. A blank line listens once for speech.
    Chat,

    /// Wake-word voice loop emitting JSON-lines events on stdout.
    Daemon,

    /// Run a single command and print the reply.
    Ask {
        /// The command text.
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Print saved reminders.
    Reminders,

    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(OrionConfig::default_config_path);
    let command = cli.command.unwrap_or(Command::Chat);

    let log_dir = matches!(command, Command::Chat | Command::Daemon).then(orion_dirs::logs_dir);
    let log_guard = logging::init(log_dir.as_deref());

    if let Command::InitConfig { force } = command {
        return init_config(&config_path, force);
    }

    let config = OrionConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let exit = match command {
        Command::Chat => run_chat(config).await?,
        Command::Daemon => run_daemon(config).await?,
        Command::Ask { text } => run_ask(config, &text.join(" ")).await?,
        Command::Reminders => list_reminders(&config)?,
        Command::InitConfig { .. } => Exit::Finished,
    };
    if exit == Exit::Interrupted {
        // The input thread is parked on a blocking read and cannot be joined.
        drop(log_guard);
        std::process::exit(0);
    }
    Ok(())
}

/// How a long-running command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Finished,
    Interrupted,
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    OrionConfig::default().save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn list_reminders(config: &OrionConfig) -> anyhow::Result<Exit> {
    let store = SharedStore::open(&config.data.data_file)?;
    println!("{}", format_reminders(&store.load()?.reminders));
    Ok(Exit::Finished)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            token.cancel();
        }
    });
    cancel
}

fn start_monitor(
    assistant: &Assistant,
    config: &OrionConfig,
    events: Arc<dyn EventSink>,
    cancel: &CancellationToken,
) -> MonitorHandle {
    ReminderMonitor::new(
        Arc::clone(assistant.store()),
        assistant.output().clone(),
        events,
        Arc::clone(assistant.clock()),
        &config.reminders,
    )
    .spawn(cancel.child_token())
}

async fn run_ask(config: OrionConfig, text: &str) -> anyhow::Result<Exit> {
    let (output, worker) = create_output(&config.speech);
    let worker = worker.spawn();
    let assistant = Assistant::from_config(&config, output)?;
    let text = text.to_owned();
    let reply = tokio::task::spawn_blocking(move || assistant.handle_text(&text)).await?;
    println!("{reply}");
    // The assistant owned the last output handle, so the worker drains and exits.
    if let Err(e) = worker.await {
        warn!("output worker failed: {e}");
    }
    Ok(Exit::Finished)
}

async fn run_chat(config: OrionConfig) -> anyhow::Result<Exit> {
    println!("Orion v{}", env!("CARGO_PKG_VERSION"));
    let cancel = cancel_on_ctrl_c();
    let (output, worker) = create_output(&config.speech);
    let _worker = worker.spawn();
    let assistant = Arc::new(Assistant::from_config(&config, output)?);
    let monitor = start_monitor(&assistant, &config, Arc::new(NullSink), &cancel);

    let recognizer = config.speech.recognizer_command.clone();
    let repl_cancel = cancel.clone();
    let repl_assistant = Arc::clone(&assistant);
    let repl = tokio::task::spawn_blocking(move || {
        chat_loop(&repl_assistant, recognizer.as_deref(), &repl_cancel);
    });

    println!("Type a command, a blank line to speak, or 'quit' to exit.\n");
    tokio::select! {
        result = repl => {
            if let Err(e) = result {
                warn!("chat loop failed: {e}");
            }
            monitor.shutdown().await;
            Ok(Exit::Finished)
        }
        () = cancel.cancelled() => {
            monitor.shutdown().await;
            Ok(Exit::Interrupted)
        }
    }
}

fn chat_loop(assistant: &Assistant, recognizer: Option<&str>, cancel: &CancellationToken) {
    let stdin = std::io::stdin();
    let mut voice: Option<CommandInput> = recognizer
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(CommandInput::new);
    let mut line = String::new();

    while !cancel.is_cancelled() {
        print!("You: ");
        let _ = std::io::stdout().flush();
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("failed to read input: {e}");
                break;
            }
        }

        let mut text = line.trim().to_owned();
        if matches!(text.to_lowercase().as_str(), "quit" | "exit") {
            break;
        }
        if text.is_empty() {
            let Some(input) = voice.as_mut() else {
                println!("Voice input is not configured (set speech.recognizer_command).");
                continue;
            };
            match input.listen() {
                Some(heard) => {
                    println!("Heard: {heard}");
                    text = heard;
                }
                None => {
                    println!("I didn't hear anything.");
                    continue;
                }
            }
        }

        match assistant.check_reminders_quietly() {
            Ok(due) => {
                for reminder in due {
                    println!("Orion: {}", orion::monitor::announcement(&reminder));
                }
            }
            Err(e) => warn!("reminder check failed: {e}"),
        }

        println!("Orion: {}", assistant.handle_text(&text));
    }
}

async fn run_daemon(config: OrionConfig) -> anyhow::Result<Exit> {
    let cancel = cancel_on_ctrl_c();
    let (output, worker) = create_output(&config.speech);
    let _worker = worker.spawn();
    let assistant = Arc::new(Assistant::from_config(&config, output)?);
    let events: Arc<dyn EventSink> = Arc::new(JsonLineSink::stdout());
    let monitor = start_monitor(&assistant, &config, Arc::clone(&events), &cancel);

    let input: Box<dyn SpeechInput> = create_input(config.speech.recognizer_command.as_deref());
    let loop_cancel = cancel.clone();
    let voice = tokio::task::spawn_blocking(move || {
        let mut input = input;
        VoiceLoop::new(&assistant, events.as_ref(), &config.conversation)
            .run(input.as_mut(), &loop_cancel);
    });

    tokio::select! {
        result = voice => {
            if let Err(e) = result {
                warn!("voice loop failed: {e}");
            }
            monitor.shutdown().await;
            Ok(Exit::Finished)
        }
        () = cancel.cancelled() => {
            monitor.shutdown().await;
            Ok(Exit::Interrupted)
        }
    }
}
