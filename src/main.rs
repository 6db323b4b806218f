mod cli;
mod config;
mod constants;
mod core;
mod engine;
mod error;
mod ingest;
mod postprocess;
mod providers;
mod server;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::core::{Envelope, RedirectProbe, UpstreamResolver};
use crate::providers::{HttpRedirectProbe, HttpUpstream};
use crate::server::{AppState, SharedEngine};
use crate::telemetry::ResolveMonitor;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing()?;

    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Command::Serve { bind, config } => {
            let cfg = AppConfig::load(config.as_deref())?;
            log_source(&cfg);
            let bind = bind.unwrap_or_else(|| cfg.bind.clone());
            let state = AppState::new(build_engine(&cfg)?, cfg.request_budget);
            server::serve(state, &bind).await?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Resolve {
            text,
            config,
            trace,
        } => {
            let cfg = AppConfig::load(config.as_deref())?;
            log_source(&cfg);
            let engine = build_engine(&cfg)?;

            let monitor = ResolveMonitor::new();
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!(target: "tiklink::cli", "interrupted; stopping after the current attempt");
                    interrupt.cancel();
                }
            });

            let outcome = engine.resolve(&text, &monitor, &cancel).await;
            let (envelope, code) = match outcome {
                Ok(result) => (Envelope::Success { result }, ExitCode::SUCCESS),
                Err(err) => (
                    Envelope::Error {
                        error: err.to_string(),
                    },
                    ExitCode::FAILURE,
                ),
            };

            println!(
                "{}",
                serde_json::to_string_pretty(&envelope).context("serializing result")?
            );
            if trace {
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&monitor.summarize())
                        .context("serializing summary")?
                );
                for attempt in monitor.attempts() {
                    eprintln!(
                        "{:>7} {:>6.2}s {}{}",
                        attempt.outcome.as_str(),
                        attempt.duration_seconds(),
                        attempt.variant,
                        attempt
                            .error
                            .as_deref()
                            .map(|e| format!("  ({e})"))
                            .unwrap_or_default()
                    );
                }
            }
            Ok(code)
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = EnvFilter::from_default_env()
        .add_directive("tiklink=info".parse().context("parsing default log directive")?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn log_source(cfg: &AppConfig) {
    match &cfg.source {
        Some(path) => info!(target: "tiklink::config", path = %path.display(), "loaded config"),
        None => info!(target: "tiklink::config", "no config file found; using defaults"),
    }
}

fn build_engine(cfg: &AppConfig) -> anyhow::Result<SharedEngine> {
    let probe: Arc<dyn RedirectProbe> = Arc::new(HttpRedirectProbe::new(&cfg.probe)?);
    let upstream: Arc<dyn UpstreamResolver> = Arc::new(HttpUpstream::new(&cfg.upstream)?);
    info!(
        target: "tiklink::engine",
        endpoint = %cfg.upstream.endpoint,
        version = %cfg.upstream.version,
        "upstream configured"
    );
    Ok(engine::Engine::new(
        probe,
        upstream,
        cfg.upstream.version.clone(),
        cfg.links.clone(),
    ))
}
