mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use fpl::{FplClient, FplContext};
use runtime::{AbortReason, Agent, LoopResult, Outcome, Provider, ToolRegistry, Turn};
use storage::{Record, SessionKey, TranscriptStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use error::{Error, Result};

const SYSTEM_PROMPT: &str = "\
You are Touchline, an expert Fantasy Premier League assistant.

You help managers with:
- Reviewing their squad, bench, captain choice and chips used
- Suggesting transfers based on their squad, budget and free transfers
- Picking the best squad and captain each gameweek
- Finding value picks and differentials
- Analysing fixture difficulty and form
- Comparing players side by side

When the user asks about \"my team\", \"my squad\" or \"my players\":
1. Use the team tools (get_my_team, get_my_season_history, get_my_transfers) to fetch their data.
2. Cross-reference their players with form and fixture data from other tools.
3. Give concrete, personalised advice.

Rules:
1. Always back up opinions with data: call a tool first.
2. State player prices in £m (e.g. £7.5m).
3. When comparing players, show a short table.
4. If the user asks something outside FPL, politely decline.";

const CONFIG_FILE: &str = "touchline.toml";
const DEFAULT_SESSION: &str = "default";
const PREVIEW_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "touchline")]
#[command(about = "A Fantasy Premier League advisor backed by live FPL data", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat {
        /// Conversation to continue
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },
    /// Ask a single question and exit
    Ask {
        /// Conversation to continue
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
        /// The question
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// List conversations
    Sessions {
        /// Show only the last N sessions
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show (or clear) a conversation transcript
    History {
        /// Session key
        #[arg(short, long)]
        session: String,
        /// Delete the transcript instead of printing it
        #[arg(long)]
        clear: bool,
    },
    /// List the tools offered to the model
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Filter used when `RUST_LOG` is unset: this binary plus the workspace crates.
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    [env!("CARGO_CRATE_NAME"), "runtime", "fpl", "storage"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config)?;
    debug!(path = %cli.config.display(), "configuration loaded");

    match cli.command {
        Some(Commands::Chat { session }) => cmd_chat(&config, &session).await,
        None => cmd_chat(&config, DEFAULT_SESSION).await,
        Some(Commands::Ask { session, question }) => {
            cmd_ask(&config, &session, &question.join(" ")).await
        }
        Some(Commands::Sessions { limit }) => cmd_sessions(&config, limit),
        Some(Commands::History { session, clear }) => cmd_history(&config, &session, clear),
        Some(Commands::Tools) => cmd_tools(&config),
    }
}

type TouchlineAgent = Agent<Provider, Arc<TranscriptStore>>;

fn build_agent(config: &Config) -> Result<TouchlineAgent> {
    let provider = Provider::new(
        config.provider()?,
        config.api_key(env_var)?,
        &config.backend.model,
        config.backend.max_tokens,
        SYSTEM_PROMPT,
    );
    info!(%provider, "model backend ready");

    let registry = build_registry(config)?;
    let store = Arc::new(create_store(config)?);
    Ok(Agent::new(provider, Arc::new(registry), store).with_config(config.loop_config()))
}

fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let context = FplContext::new(FplClient::new()?, config.team_id(env_var)?);
    let mut registry = ToolRegistry::new();
    fpl::register_all(&mut registry, Arc::new(context))?;
    Ok(registry)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

async fn cmd_chat(config: &Config, session: &str) -> Result<()> {
    println!("touchline v{}", env!("CARGO_PKG_VERSION"));
    let agent = build_agent(config)?;
    let session = SessionKey::from(session);

    println!("Session: {session}");
    println!("Model: {}", config.backend.model);
    println!("Ctrl+C cancels a running answer. Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        match exchange(&agent, &session, input).await {
            Ok(result) => print_result(&result),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    println!("\nBye.");
    Ok(())
}

async fn cmd_ask(config: &Config, session: &str, question: &str) -> Result<()> {
    let agent = build_agent(config)?;
    let result = exchange(&agent, &SessionKey::from(session), question).await?;
    print_result(&result);
    Ok(())
}

/// Run one exchange; Ctrl+C cancels it.
async fn exchange(agent: &TouchlineAgent, session: &SessionKey, input: &str) -> Result<LoopResult> {
    let cancel = CancellationToken::new();
    let run = agent.run_exchange(session, input, &cancel);
    tokio::pin!(run);

    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            run.await
        }
    };
    Ok(result?)
}

fn print_result(result: &LoopResult) {
    match &result.outcome {
        Outcome::FinalAnswer(text) => println!("\n{text}\n"),
        Outcome::Aborted(reason) => {
            let best_effort = match result.turns.last() {
                Some(Turn::Assistant { text, calls }) if calls.is_empty() && !text.is_empty() => {
                    Some(text.as_str())
                }
                _ => None,
            };
            if let Some(text) = best_effort {
                println!("\n{text}\n");
            }
            println!("{}\n", degraded_message(reason, best_effort.is_some()));
        }
    }
}

fn degraded_message(reason: &AbortReason, answered: bool) -> String {
    match reason {
        AbortReason::ModelUnavailable(error) => {
            format!("[The model is unavailable right now ({error}). Please try again shortly.]")
        }
        AbortReason::StepLimitExceeded if answered => {
            "[Stopped at the tool-call limit; this answer may be incomplete.]".to_string()
        }
        AbortReason::StepLimitExceeded => {
            "[Stopped at the tool-call limit without an answer. Try a narrower question.]"
                .to_string()
        }
        AbortReason::Cancelled => "[Cancelled.]".to_string(),
    }
}

fn cmd_sessions(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let sessions = store.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:<24}  {:<16}  {:<16}  TURNS",
        "SESSION", "STARTED", "UPDATED"
    );
    println!("{}", "-".repeat(70));

    for summary in sessions.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let updated = Local
            .from_utc_datetime(&summary.updated_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        println!(
            "{:<24}  {:<16}  {:<16}  {}",
            summary.key.as_str(),
            started.to_string(),
            updated.to_string(),
            summary.turn_count
        );
    }

    Ok(())
}

fn cmd_history(config: &Config, session: &str, clear: bool) -> Result<()> {
    let store = open_store(config)?;
    let key = SessionKey::from(session);

    if clear {
        let removed = store.clear(&key)?;
        if removed == 0 {
            return Err(Error::SessionNotFound {
                key: session.to_string(),
            });
        }
        println!("Cleared {removed} turns from '{key}'.");
        return Ok(());
    }

    let records = store.load(&key)?;
    if records.is_empty() {
        return Err(Error::SessionNotFound {
            key: session.to_string(),
        });
    }

    println!("Session: {key}\n");
    for record in &records {
        print_record(record)?;
    }
    Ok(())
}

fn print_record(record: &Record) -> Result<()> {
    let time = Local
        .from_utc_datetime(&record.timestamp.naive_utc())
        .format("%H:%M:%S");

    match record.decode::<Turn>()? {
        Turn::User { text } => println!("[{time}] USER: {}", preview(&text)),
        Turn::Assistant { text, calls } => {
            if !text.is_empty() {
                println!("[{time}] ASSISTANT: {}", preview(&text));
            }
            for call in calls {
                let arguments = serde_json::Value::Object(call.arguments);
                println!("[{time}] TOOL CALL: {} {arguments}", call.tool_name);
            }
        }
        Turn::Tool(result) => {
            let status = match result.error_kind() {
                Some(kind) => kind.to_string(),
                None => "ok".to_string(),
            };
            println!(
                "[{time}] TOOL RESULT ({status}): {}",
                preview(&result.content())
            );
        }
    }
    Ok(())
}

/// Truncate long text for display.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn cmd_tools(config: &Config) -> Result<()> {
    let registry = build_registry(config)?;
    for spec in registry.specs() {
        println!("{}", spec.name);
        println!("    {}", spec.description);
        for param in spec.input_schema.params() {
            let required = if param.required { "required" } else { "optional" };
            println!("    - {} ({}, {required})", param.name, param.ty.as_str());
        }
        println!();
    }
    Ok(())
}

fn create_store(config: &Config) -> Result<TranscriptStore> {
    let path = store_path(config);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %path.display(), "opening transcript store");
    Ok(TranscriptStore::open(&path)?)
}

fn open_store(config: &Config) -> Result<TranscriptStore> {
    let path = store_path(config);
    if !path.exists() {
        return Err(Error::DatabaseNotFound { path });
    }
    Ok(TranscriptStore::open(&path)?)
}

fn store_path(config: &Config) -> PathBuf {
    config.storage.path.clone().unwrap_or_else(|| {
        dirs_data_dir()
            .unwrap_or_else(|| Path::new(".touchline").to_path_buf())
            .join("transcripts.db")
    })
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/touchline"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("touchline"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("touchline"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_crate() {
        assert_eq!(
            default_filter(false),
            "touchline=info,runtime=info,fpl=info,storage=info"
        );
        let verbose = default_filter(true);
        assert!(verbose.contains("storage=debug"));
        assert!(tracing_subscriber::EnvFilter::try_new(&verbose).is_ok());
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short"), "short");
        let long = "£".repeat(PREVIEW_CHARS + 5);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn degraded_messages_name_the_reason() {
        let message = degraded_message(&AbortReason::ModelUnavailable("503".into()), false);
        assert!(message.contains("503"));
        assert!(degraded_message(&AbortReason::StepLimitExceeded, true).contains("incomplete"));
        assert!(degraded_message(&AbortReason::Cancelled, false).contains("Cancelled"));
    }

    #[test]
    fn configured_store_path_wins() {
        let config = Config::parse("[storage]\npath = \"/tmp/x/transcripts.db\"").unwrap();
        assert_eq!(store_path(&config), PathBuf::from("/tmp/x/transcripts.db"));
    }

    #[test]
    fn cli_parses_ask() {
        let cli = Cli::try_parse_from(["touchline", "ask", "-s", "alice", "who", "to", "captain?"])
            .unwrap();
        let Some(Commands::Ask { session, question }) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(session, "alice");
        assert_eq!(question.join(" "), "who to captain?");
    }
}
