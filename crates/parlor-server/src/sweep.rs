//! Background loops: the phase-deadline sweep and stale-room cleanup.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::server::ServerState;

const TIMEOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Pop rooms whose phase deadline elapsed and run their timeout check,
/// once a second. A failure in one room is logged and skipped; the sweep
/// itself never dies.
pub async fn run_phase_timeout_sweep(
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(TIMEOUT_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = OffsetDateTime::now_utc();
                for room_code in state.store.pop_expired_rooms(now) {
                    sweep_room(&state, &room_code, now);
                }
            }
            _ = shutdown.changed() => {
                info!("Phase-timeout sweep stopped");
                return;
            }
        }
    }
}

/// Run one room's timeout check under its lock, exactly like an ordinary
/// action, then broadcast and re-arm.
fn sweep_room(state: &ServerState, room_code: &str, now: OffsetDateTime) {
    let outcome = {
        let mut room = match state.store.get_mut(room_code) {
            Ok(room) => room,
            // Deleted since it was scheduled.
            Err(_) => return,
        };
        let result = room.check_phase_timeout(now);
        result.map(|events| (events, room.next_phase_deadline))
    };

    match outcome {
        Ok((events, deadline)) => {
            let _ = state.store.update_room_timer(room_code, deadline);
            for event in &events {
                state.broadcast_event(room_code, event);
            }
        }
        Err(e) => {
            warn!("Phase timeout check failed for room {}: {}", room_code, e);
        }
    }
}

/// Delete finished and abandoned rooms on an hourly cadence.
pub async fn run_stale_room_sweep(state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let removed = state.store.cleanup_stale_rooms(OffsetDateTime::now_utc());
                if removed > 0 {
                    info!("Cleaned up {} stale rooms", removed);
                }
            }
            _ = shutdown.changed() => {
                info!("Stale-room sweep stopped");
                return;
            }
        }
    }
}
