//! anteroomd — the anteroom daemon.
//!
//! Single binary that assembles the whole waiting room:
//! - Allow-list store (redb)
//! - In-memory admission queue
//! - Gate + poll-check HTTP routes
//! - Fan-out trigger draining the queue every tick
//! - Health prober + rate controller
//!
//! # Usage
//!
//! ```text
//! anteroomd --config /etc/anteroom/anteroom.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use anteroom_core::{AnteroomConfig, RateHandle};
use anteroom_gate::{GateState, build_router};
use anteroom_health::HealthProber;
use anteroom_processor::Processor;
use anteroom_queue::{MemoryQueue, QueueConfig};
use anteroom_state::AdmissionStore;
use anteroom_trigger::FanoutTrigger;
use anteroom_tuner::RateTuner;

#[derive(Parser)]
#[command(name = "anteroomd", about = "Anteroom waiting-room daemon")]
struct Cli {
    /// Path to the anteroom.toml configuration file.
    #[arg(long, default_value = "/etc/anteroom/anteroom.toml")]
    config: PathBuf,

    /// Override the configured HTTP listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,anteroomd=debug,anteroom=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = AnteroomConfig::from_file(&cli.config)?;
    let port = cli.port.unwrap_or(config.daemon.port);

    run(config, port).await
}

async fn run(config: AnteroomConfig, port: u16) -> anyhow::Result<()> {
    info!("anteroom daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&config.daemon.data_dir)?;
    let db_path = config.daemon.data_dir.join("anteroom.redb");

    // ── Initialize subsystems ──────────────────────────────────

    // Allow-list store.
    let store = AdmissionStore::open(&db_path)?;
    info!(path = ?db_path, "admission store opened");

    // Admission queue.
    let queue = MemoryQueue::new(QueueConfig {
        visibility_timeout: config.queue.visibility_timeout(),
        max_receive_count: config.queue.max_receive_count,
        max_depth: config.queue.max_depth,
    });
    info!(
        max_receive_count = config.queue.max_receive_count,
        "admission queue initialized"
    );

    // Live rate, restored from the last tuned value when one exists.
    let rate = RateHandle::new(config.admission.rate);
    let mut tuner = RateTuner::new(store.clone(), rate.clone());
    if let Some(interval) = config.probe.min_adjust_interval() {
        tuner = tuner.with_min_adjust_interval(interval);
    }
    tuner.restore()?;
    info!(rate = rate.get(), "rate controller initialized");

    // Processor + fan-out trigger.
    let processor = Arc::new(Processor::new(
        queue.clone(),
        store.clone(),
        config.admission.batch_size as usize,
        config.admission.invocation_budget(),
    ));
    let trigger = FanoutTrigger::new(
        processor,
        rate.clone(),
        config.admission.batch_size,
        config.admission.max_iterations_per_call,
        config.admission.max_concurrency as usize,
    );
    info!("queue processor initialized");

    // Health prober.
    let prober = HealthProber::new(
        store.clone(),
        config.probe.target.clone(),
        config.probe.path.clone(),
        config.probe.sample_size,
        config.probe.timeout(),
    );
    info!(target = %config.probe.target, "health prober initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let trigger_shutdown = shutdown_rx.clone();
    let health_shutdown = shutdown_rx.clone();

    // ── Start background tasks ─────────────────────────────────

    let tick = config.admission.tick_interval();

    // Queue drain loop.
    let trigger_handle = tokio::spawn(async move {
        trigger.run(tick, trigger_shutdown).await;
    });

    // Health + rate control loop. Runs as a single sequential task so
    // at most one cycle can touch the tune record at a time.
    let health_handle = tokio::spawn(async move {
        health_loop(prober, tuner, tick, health_shutdown).await;
    });

    // ── Start HTTP server ──────────────────────────────────────

    let router = build_router(GateState {
        queue,
        store,
        waiting_room_url: config.room.waiting_room_url.clone(),
        protect_url: config.room.protect_url.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "gate server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for background tasks.
    let _ = trigger_handle.await;
    let _ = health_handle.await;

    info!("anteroom daemon stopped");
    Ok(())
}

/// Probe the protected endpoint once per tick and feed the verdict to
/// the rate controller.
async fn health_loop(
    prober: HealthProber,
    tuner: RateTuner,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "health loop started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                match prober.run_cycle().await {
                    Ok(verdict) => {
                        if let Some(passed) = verdict.passed()
                            && let Err(e) = tuner.apply(passed)
                        {
                            error!(error = %e, "rate adjustment failed");
                        }
                    }
                    Err(e) => error!(error = %e, "health cycle failed"),
                }
            }
            _ = shutdown.changed() => {
                info!("health loop shutting down");
                break;
            }
        }
    }
}
