//! Sales Assistant Server - analytics tools over stdio.
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout. Logs go to stderr.
//!
//! # Architecture
//!
//! - `PostgreSQL` via a lazily-connecting sqlx pool
//! - One handler task; requests are answered in arrival order
//! - Database failures fail the single request, never the process

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use sales_assistant_server::config::{LogFormat, ServerConfig};
use sales_assistant_server::db::{self, PgSalesStore};
use sales_assistant_server::{McpHandler, ToolExecutor, transport};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the subscriber. Everything is written to stderr.
fn init_tracing(log_format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sales_assistant_server=info".into());

    let json = log_format == LogFormat::Json;
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Text);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);
    tracing::debug!(?config, "Configuration loaded");

    let pool = match db::create_pool(&config.database_url, config.max_connections) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Invalid database configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(PgSalesStore::new(pool));
    let handler = McpHandler::new(ToolExecutor::new(store));

    tracing::info!("sales-assistant server ready on stdio");
    match transport::serve_stdio(&handler).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Transport failed");
            ExitCode::FAILURE
        }
    }
}
