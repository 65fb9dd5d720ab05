//! # Slack Code Assistant
//!
//! `serve` connects to Slack over Socket Mode and answers app mentions and
//! assistant-thread messages. `ask` sends one prompt through the same provider
//! chain and prints the reply to the terminal.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- serve
//! cargo run -- ask "Roll 2d6 and 1d20"
//! ```

// =============================================================================
// IMPORTS
// =============================================================================
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use slack_code_assistant::history::PromptHistory;
use slack_code_assistant::slack::{EventHandlers, SlackApiClient, SocketModeRunner};
use slack_code_assistant::stream::{ChatStream, ConsoleStream};
use slack_code_assistant::{Config, Orchestrator};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "slack-code-assistant",
    version,
    about = "A Slack code assistant that streams LLM replies into threads",
    long_about = r#"
Slack Code Assistant

Answers programming questions in Slack threads. Replies stream from the
OpenAI Responses API (with a dice-rolling tool) and fall back to a
Hugging Face chat model when OpenAI is unavailable.

ENVIRONMENT:
  OPENAI_API_KEY        enables the streaming provider
  HUGGINGFACE_API_KEY   key for the fallback provider
  RUST_LOG              log filter directives (default: info)
  SLACK_BOT_TOKEN       bot token (xoxb-...), required by `serve`
  SLACK_APP_TOKEN       app-level token (xapp-...), required by `serve`

EXAMPLES:
  slack-code-assistant serve
  slack-code-assistant ask "How do I reverse a list in Python?"
  slack-code-assistant --model gpt-4.1 ask "Roll 3d20"
"#
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// OpenAI model to use (overrides OPENAI_MODEL env var)
    #[arg(
        short = 'm',
        long = "model",
        help = "OpenAI model to use",
        env = "OPENAI_MODEL",
        global = true
    )]
    model: Option<String>,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose/debug logging",
        default_value = "false",
        global = true
    )]
    verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Connect to Slack over Socket Mode and answer events
    Serve,

    /// Answer a single prompt in the terminal
    Ask {
        #[arg(value_name = "PROMPT")]
        prompt: String,
    },
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;

    init_logging(&config.log_level, args.verbose)?;

    if let Some(model) = args.model {
        info!(model = %model, "Using model from command line");
        config.openai_model = model;
    }

    config.validate()?;

    info!(
        openai_model = %config.openai_model,
        huggingface_model = %config.huggingface_model,
        "Configuration loaded"
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    match args.command {
        Command::Serve => serve(&config, orchestrator).await,
        Command::Ask { prompt } => ask(&orchestrator, &prompt).await,
    }
}

async fn serve(config: &Config, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let (bot_token, app_token) = config.slack_tokens()?;

    let client = Arc::new(
        SlackApiClient::new(&config.slack_api_base, bot_token, config.request_timeout())?
            .with_app_token(app_token),
    );
    let bot_user = client.auth_test().await?;
    info!(bot_user = %bot_user, "Authenticated with Slack");

    let handlers = Arc::new(EventHandlers::new(Arc::clone(&client), orchestrator));
    SocketModeRunner::new(client, handlers).run().await
}

async fn ask(orchestrator: &Orchestrator, prompt: &str) -> Result<()> {
    let mut stream = ConsoleStream::new();
    let mut history = PromptHistory::from_user_message(prompt);

    orchestrator.call_llm(&mut stream, &mut history).await;
    stream.stop(Vec::new(), None).await?;
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
fn init_logging(log_level: &str, verbose: bool) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level, verbose)?)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

/// `--verbose` forces debug output; otherwise `RUST_LOG` directives apply.
fn log_filter(log_level: &str, verbose: bool) -> Result<EnvFilter> {
    if verbose {
        return Ok(EnvFilter::new("debug"));
    }
    EnvFilter::try_new(log_level)
        .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG value '{}': {}", log_level, e))
}
