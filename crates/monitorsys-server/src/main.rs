use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use monitorsys_server::collector::MetricsCollector;
use monitorsys_server::config::resolve_config;
use monitorsys_server::gpu::GpuMonitor;
use monitorsys_server::hub::BroadcastHub;
use monitorsys_server::source::SystemSource;
use monitorsys_server::state::AppState;
use monitorsys_server::{api, ticker};

#[derive(Parser, Debug)]
#[command(name = "monitorsys-server", about = "Live host resource monitor")]
struct Args {
    /// Path to TOML configuration file (default: ./monitorsys.toml if present)
    #[arg(short, long, env = "MONITORSYS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long, env = "MONITORSYS_LISTEN")]
    listen: Option<String>,

    /// Directory holding the prebuilt dashboard (overrides the config file)
    #[arg(long)]
    frontend_dir: Option<PathBuf>,

    /// Disable GPU monitoring
    #[arg(long)]
    no_gpu: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = resolve_config(args.config.as_deref())?;

    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(dir) = args.frontend_dir {
        config.frontend_dir = Some(dir);
    }
    if args.no_gpu {
        config.gpu_enabled = false;
    }

    info!(listen = %config.listen, tick_ms = config.tick_interval().as_millis() as u64, "MonitorSys starting");

    // GPU detection and the CPU warm-up both block; do them before serving
    let gpu_enabled = config.gpu_enabled;
    let collector = tokio::task::spawn_blocking(move || {
        let gpu = GpuMonitor::detect(gpu_enabled);
        let mut collector = MetricsCollector::new(Box::new(SystemSource::new()), gpu);
        collector.prime();
        collector
    })
    .await?;

    let hub = Arc::new(BroadcastHub::new(collector, config.subscriber_buffer()));
    let state = AppState::new(hub.clone());

    let cancel = CancellationToken::new();
    let ticker_task = tokio::spawn(ticker::run(hub.clone(), config.tick_interval(), cancel.clone()));

    let app = api::build_router(state, config.frontend_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!(addr = %config.listen, "MonitorSys listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = shutdown.cancelled() => {}
            }
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    let _ = ticker_task.await;
    hub.shutdown();
    info!("MonitorSys stopped");

    Ok(())
}
