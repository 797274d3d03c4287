//! `insight` binary: run one assistant turn (or an interactive session) from the command line.
//!
//! Configuration is loaded from `.env` and `$XDG_CONFIG_HOME/insight/config.toml` before
//! the settings are read; see `insight_config::AssistantSettings` for the variables.

mod log_format;
mod logging;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use insight_cli::session::openai_client;
use insight_cli::{build_assistant, outcome_json, render_outcome, Fixture, RunError, SessionOptions};
use insight_config::{AssistantSettings, APP_NAME};

#[derive(Parser, Debug)]
#[command(name = "insight")]
#[command(about = "Insight: ask product analytics questions from the command line")]
struct Args {
    /// User message (or pass as positional arguments)
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    /// Positional args: user message when -m/--message is not used
    #[arg(trailing_var_arg = true)]
    rest: Vec<String>,

    /// Thread ID; reuse it to continue a conversation or answer a confirmation question
    #[arg(long, value_name = "ID")]
    thread_id: Option<String>,

    /// JSON fixture with team, taxonomy, query results and optional core memory
    #[arg(long, value_name = "PATH", env = "INSIGHT_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Core memory file (default: core_memory.json next to the checkpoint database)
    #[arg(long, value_name = "PATH")]
    memory_file: Option<PathBuf>,

    /// Verbose: debug logs for graph execution on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Interactive: keep reading messages from stdin on the same thread
    #[arg(short, long)]
    interactive: bool,

    /// Print each turn as one JSON object
    #[arg(long)]
    json: bool,
}

impl Args {
    fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| (!self.rest.is_empty()).then(|| self.rest.join(" ")))
            .filter(|m| !m.trim().is_empty())
    }
}

fn new_thread_id() -> String {
    format!("thread-{}", uuid::Uuid::new_v4())
}

/// Prints a turn as text or one JSON line.
pub(crate) fn print_outcome(
    outcome: &insight::TurnOutcome,
    thread_id: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&outcome_json(outcome, thread_id))?);
    } else {
        println!("{}", render_outcome(outcome, thread_id));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if let Err(e) = insight_config::load_and_apply(APP_NAME, None) {
        eprintln!("insight: config not applied: {}", e);
    }
    logging::init(args.verbose)?;

    let message = args.message();
    if !args.interactive && message.is_none() {
        eprintln!("insight: provide a message via -m/--message or positional args");
        std::process::exit(2);
    }

    let settings = AssistantSettings::from_env().map_err(RunError::from)?;
    let fixture = match &args.fixture {
        Some(path) => Fixture::from_file(path).map_err(RunError::from)?,
        None => Fixture::default(),
    };
    let llm = Arc::new(openai_client(&settings));
    let assistant = build_assistant(
        &settings,
        SessionOptions {
            fixture,
            memory_file: args.memory_file.clone(),
        },
        llm,
    )
    .await?;

    let thread_id = args.thread_id.clone().unwrap_or_else(new_thread_id);

    if let Some(message) = message {
        match assistant.run_turn(&thread_id, &message).await {
            Ok(outcome) => print_outcome(&outcome, &thread_id, args.json)?,
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
    if args.interactive {
        repl::run_repl_loop(&assistant, &thread_id, args.json).await?;
    }
    Ok(())
}
