//! packet-sniffer - live and offline packet capture service.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use packet_sniffer::config::INTERFACE_ENV;
use packet_sniffer::routes;
use packet_sniffer::{AppState, Config, LiveSource};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// How long blocking capture threads get to finish once the server stops.
/// A thread parked in a device read with no traffic is abandoned after this.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "packet-sniffer")]
#[command(about = "Streams live captures over WebSocket and summarizes uploaded pcap files")]
struct Args {
    /// List available network interfaces and exit
    #[arg(short, long)]
    list_interfaces: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_interfaces {
        for iface in LiveSource::list_interfaces() {
            println!("{}", iface);
        }
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.tracing_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!(
        "{} env var: {}",
        INTERFACE_ENV,
        std::env::var(INTERFACE_ENV).unwrap_or_default()
    );
    tracing::info!("Live capture interface: {}", config.capture_interface());
    tracing::info!("Origin policy: {:?}", config.origin_policy);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let result = run_to_completion(runtime, serve(config), SHUTDOWN_GRACE);

    tracing::info!("Server stopped");
    result
}

/// Drive `server` to completion, then stop the runtime without waiting on
/// blocking tasks for longer than `grace`.
fn run_to_completion<F>(runtime: Runtime, server: F, grace: Duration) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let result = runtime.block_on(server);
    runtime.shutdown_timeout(grace);
    result
}

async fn serve(config: Config) -> Result<()> {
    let addr = SocketAddr::from((config.bind_address, config.port));
    let app = routes::create_router(AppState::new(config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
    tracing::info!("Server started on {}", addr);

    // Handle SIGTERM and SIGINT for graceful shutdown
    let shutdown = Arc::new(Notify::new());
    let shutdown_clone = shutdown.clone();
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down");
            }
        }

        shutdown_clone.notify_one();
    });

    // ConnectInfo<SocketAddr> feeds the request logging middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.notified().await;
    })
    .await
    .context("HTTP server error")
}
