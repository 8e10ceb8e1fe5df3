//! Sales CLI - ask sales analytics questions in plain English.
//!
//! # Usage
//!
//! ```bash
//! # Answer one question
//! sales-cli ask "What are the top 3 products in shop 1?"
//!
//! # Interactive session (type `exit` to quit)
//! sales-cli chat
//!
//! # Run the built-in demo questions
//! sales-cli demo
//!
//! # List the server's tools, or call one directly
//! sales-cli tools
//! sales-cli call GetShopPerformance --params '{"shop_id": 2}'
//!
//! # Check a worked-examples file
//! sales-cli examples validate tool_examples.yaml
//! ```
//!
//! Questions go to Claude when `CLAUDE_API_KEY` is set and are matched by
//! keyword otherwise. The tool server is started as a child process
//! (`SALES_SERVER_COMMAND`, default `sales-assistant-server`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sales_assistant_client::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sales-cli")]
#[command(author, version, about = "Ask sales analytics questions in plain English")]
struct Cli {
    /// Select tools by keyword even when a Claude key is configured
    #[arg(long, global = true)]
    keywords: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question, e.g. "Show me orders for customer 5"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Answer questions interactively
    Chat,
    /// Answer the built-in demo questions
    Demo,
    /// List the tools the server offers
    Tools,
    /// Call a tool directly, bypassing selection
    Call {
        /// Tool name, e.g. `GetTopSellingProducts`
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Print the raw tool result as JSON
        #[arg(long)]
        raw: bool,
    },
    /// Manage worked examples for model selection
    Examples {
        #[command(subcommand)]
        action: ExamplesAction,
    },
}

#[derive(Subcommand)]
enum ExamplesAction {
    /// Validate a worked-examples YAML file
    Validate {
        /// Path to the YAML file
        file: PathBuf,
    },
    /// Print the built-in worked examples as YAML
    Show,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the subscriber. Logs go to stderr; stdout is for answers.
fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sales_cli=info,sales_assistant_client=warn".into());

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if cli.keywords {
        config.claude = None;
    }

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.json_logs);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli.command, &config).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Ask { question } => commands::ask::ask(config, &question.join(" ")).await?,
        Commands::Chat => commands::ask::chat(config).await?,
        Commands::Demo => commands::ask::demo(config).await?,
        Commands::Tools => commands::tools::list(config).await?,
        Commands::Call { tool, params, raw } => {
            commands::tools::call(config, &tool, &params, raw).await?;
        }
        Commands::Examples { action } => match action {
            ExamplesAction::Validate { file } => commands::examples::validate(&file).await?,
            ExamplesAction::Show => commands::examples::show()?,
        },
    }
    Ok(())
}
