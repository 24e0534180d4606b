//! # Study Assistant
//!
//! Command-line front end for the task router in `rig-taskrouter`.
//!
//! One question is classified and answered by the matching specialist:
//! research questions go through a research → draft → critique loop, code
//! questions to the code helper, quiz and checklist requests to the quiz
//! helper.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- ask "Give me a quick answer about TCP handshakes"
//! cargo run -- ingest lecture-notes.pdf
//! cargo run -- chat
//! ```

/// Configuration management
mod config;

/// Workflow assembly from configuration
mod assistant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rig_taskrouter::{Message, SessionOutcome, Termination};

use crate::assistant::Assistant;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "study-assistant",
    version,
    about = "A study and coding assistant that routes each question to a specialist",
    long_about = r#"
Study Assistant routes every question to one of three specialists:

  research   a supervisor loops researcher -> writer -> critiquer until the
             draft is approved (at most three revisions)
  code       explains or writes code, and runs it when you ask
             ("run this code", "execute it")
  quiz       practice questions with an answer key, or a checklist

CONFIGURATION (environment or .env):
  LITELLM_BASE_URL, LITELLM_API_KEY   OpenAI-compatible endpoint (else local Ollama)
  MODEL_NAME                          model id (default qwen3-32b)
  TAVILY_API_KEY                      Tavily web search (else DuckDuckGo)
  EMBEDDING_MODEL, EMBEDDING_DIMS     semantic memory ranking (else lexical)
  MEMORY_PATH, NOTES_DIR              long-term memory and PDF storage
  MODEL_TIMEOUT_SECS, SEARCH_TIMEOUT_SECS, EMBEDDING_TIMEOUT_SECS,
  SANDBOX_TIMEOUT_SECS                per-call limits; a turn step gets their sum

EXAMPLES:
  study-assistant ask "Explain paging in operating systems"
  study-assistant ask --json "Quiz me on TCP congestion control"
  study-assistant ingest ./os-lecture-3.pdf
"#
)]
struct Cli {
    /// Model to use (overrides MODEL_NAME)
    #[arg(short = 'm', long = "model", global = true, env = "MODEL_NAME")]
    model: Option<String>,

    /// Step budget per turn (overrides MAX_STEPS)
    #[arg(long = "max-steps", global = true, env = "MAX_STEPS")]
    max_steps: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long = "verbose", global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a single question
    Ask {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Print the answer, visited steps and final state as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Interactive session that keeps the conversation history
    Chat,
    /// Index a PDF into long-term memory
    Ingest {
        #[arg(value_name = "PDF")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap so `env = ...` arguments see it
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let mut config = Config::from_env()?;
    if let Some(model) = cli.model {
        info!(model = %model, "Using model from command line");
        config.model = model;
    }
    if let Some(max_steps) = cli.max_steps {
        config.max_steps = max_steps;
    }
    config.validate()?;

    info!(
        model = %config.model,
        endpoint = config.base_url.as_deref().unwrap_or("ollama"),
        max_steps = config.max_steps,
        "Configuration loaded"
    );

    let assistant = Assistant::new(&config).await?;

    match cli.command {
        Command::Ask { query, json } => {
            let outcome = assistant.ask(vec![Message::user(query)]).await;
            match outcome {
                Ok(outcome) if json => println!("{}", outcome_json(&outcome)?),
                Ok(outcome) => print_answer(&outcome),
                Err(e) => {
                    error!(error = %e, "Turn failed");
                    return Err(e);
                }
            }
        }
        Command::Chat => chat(&assistant).await?,
        Command::Ingest { path } => {
            let receipt = assistant.ingest(&path).await?;
            println!(
                "Indexed {} ({} chunks) as {}",
                receipt.filename, receipt.chunks, receipt.doc_id
            );
        }
    }

    Ok(())
}

/// Read questions from stdin until EOF or `exit`
async fn chat(assistant: &Assistant) -> Result<()> {
    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nyou> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        history.push(Message::user(line));
        match assistant.ask(history.clone()).await {
            Ok(outcome) => {
                print_answer(&outcome);
                history.push(Message::assistant(outcome.answer));
            }
            Err(e) => {
                error!(error = %e, "Turn failed");
                eprintln!("\nTurn failed: {}", e);
                history.pop();
            }
        }
    }

    Ok(())
}

fn print_answer(outcome: &SessionOutcome) {
    println!("\n{}", "=".repeat(60));
    println!("{}", outcome.answer);
    println!("{}", "=".repeat(60));

    match &outcome.termination {
        Termination::Completed => {}
        Termination::BudgetExhausted { max_steps, .. } => {
            eprintln!("(stopped after {} steps; answer may be incomplete)", max_steps);
        }
        Termination::Aborted { vertex_id, reason } => {
            eprintln!("({} failed: {}; showing best answer so far)", vertex_id, reason);
        }
    }
}

fn outcome_json(outcome: &SessionOutcome) -> Result<String> {
    let termination = match &outcome.termination {
        Termination::Completed => "completed".to_string(),
        Termination::BudgetExhausted { .. } => "budget_exhausted".to_string(),
        Termination::Aborted { vertex_id, .. } => format!("aborted:{}", vertex_id),
    };
    let value = serde_json::json!({
        "answer": outcome.answer,
        "steps": outcome.visited(),
        "termination": termination,
        "final_state": outcome.final_state,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects DEBUG over INFO.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
