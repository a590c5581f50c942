//! Parlor multiplayer party-game server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod server;
mod store;
mod sweep;

use server::ServerState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("PARLOR_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    info!("Starting parlor server...");

    let state = Arc::new(ServerState::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let timeout_sweep = tokio::spawn(sweep::run_phase_timeout_sweep(
        Arc::clone(&state),
        shutdown_rx.clone(),
    ));
    let cleanup_sweep = tokio::spawn(sweep::run_stale_room_sweep(
        Arc::clone(&state),
        shutdown_rx.clone(),
    ));

    let mut serve = tokio::spawn(server::run_server(addr, state, shutdown_rx));

    tokio::select! {
        result = &mut serve => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            let _ = shutdown_tx.send(true);

            // Bounded grace for in-flight connections and the sweeps.
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
                let _ = serve.await;
                let _ = timeout_sweep.await;
                let _ = cleanup_sweep.await;
            })
            .await;
        }
    }

    info!("Server stopped");
    Ok(())
}
