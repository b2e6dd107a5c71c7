//! RunReady - run completion-check coordinator
//!
//! CLI entry point for triggering and observing run completion checks
//! against the remote run API.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use runready::cli::{Cli, Command, OutputFormat};
use runready::config::Config;
use runready::coordinator::{CompletionNotice, Coordinator, CoordinatorHandle};
use runready::status::{RunStatus, StatusTrigger};
use runready::{HttpBackend, RunStatusState};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("RunReady loaded config: backend={}", config.backend.base_url);

    match cli.command {
        Command::Check { run_no, wait } => cmd_check(&config, run_no, wait).await,
        Command::Status { run_no, format } => cmd_status(&config, run_no, format).await,
        Command::Watch {
            run_no,
            interval,
            timeout,
        } => cmd_watch(&config, run_no, interval, timeout).await,
    }
}

/// Spawn the coordinator against the HTTP backend and seed the local
/// cache from the remote status endpoint.
async fn start_coordinator(
    config: &Config,
    run_no: u32,
) -> Result<(CoordinatorHandle, mpsc::Receiver<CompletionNotice>, Arc<HttpBackend>)> {
    let backend = Arc::new(HttpBackend::from_config(&config.backend).context("Failed to create backend client")?);

    let (coordinator, notice_rx) = Coordinator::new(config.coordinator.clone(), backend.clone(), backend.clone());
    let handle = coordinator.handle();
    tokio::spawn(coordinator.run());

    // Seed the cache so the status guard sees fresh remote truth
    match backend.fetch_status(run_no).await {
        Ok(status) => {
            info!(run_no, %status, "Seeded status from remote");
            handle.set_status(run_no, status).await?;
        }
        Err(e) => {
            warn!(run_no, error = %e, "Could not read remote status, starting unseeded");
        }
    }

    Ok((handle, notice_rx, backend))
}

/// Trigger a manual completion check and wait for the outcome.
async fn cmd_check(config: &Config, run_no: u32, wait: u64) -> Result<()> {
    let (handle, mut notice_rx, _backend) = start_coordinator(config, run_no).await?;

    if let Some(state) = handle.status(run_no).await?
        && state.status.is_terminal()
    {
        println!("Run {} is already READY", run_no);
        handle.shutdown().await?;
        return Ok(());
    }

    handle.trigger_check(run_no, StatusTrigger::ManualCheck).await?;

    match tokio::time::timeout(Duration::from_secs(wait), notice_rx.recv()).await {
        Ok(Some(notice)) => {
            println!("{}", notice.message);
        }
        Ok(None) | Err(_) => {
            let metrics = handle.metrics().await?;
            if metrics.oracle_failures > 0 || metrics.transition_failures > 0 {
                println!("Run {} check failed; see logs for details", run_no);
            } else {
                println!("Run {} is not complete yet", run_no);
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

/// Query and print the remote status of a run.
async fn cmd_status(config: &Config, run_no: u32, format: OutputFormat) -> Result<()> {
    let backend = HttpBackend::from_config(&config.backend).context("Failed to create backend client")?;
    let status = backend.fetch_status(run_no).await.context("Failed to fetch run status")?;

    match format {
        OutputFormat::Json => {
            let state = RunStatusState {
                run_no,
                status,
                last_updated: chrono::Utc::now(),
            };
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        OutputFormat::Text => {
            println!("Run {}: {}", run_no, status);
        }
    }

    Ok(())
}

/// Re-trigger completion checks until the run reaches READY.
async fn cmd_watch(config: &Config, run_no: u32, interval: u64, timeout: Option<u64>) -> Result<()> {
    let (handle, mut notice_rx, _backend) = start_coordinator(config, run_no).await?;

    if let Some(state) = handle.status(run_no).await?
        && state.status == RunStatus::Ready
    {
        println!("Run {} is already READY", run_no);
        handle.shutdown().await?;
        return Ok(());
    }

    println!("Watching run {} (checking every {}s, Ctrl+C to stop)", run_no, interval);

    let deadline = timeout.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));

    loop {
        if let Some(deadline) = deadline
            && tokio::time::Instant::now() >= deadline
        {
            println!("Run {} still not READY, giving up", run_no);
            break;
        }

        tokio::select! {
            notice = notice_rx.recv() => {
                match notice {
                    Some(notice) => {
                        println!("{}", notice.message);
                        break;
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                handle.trigger_check(run_no, StatusTrigger::ManualCheck).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped watching run {}", run_no);
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}
