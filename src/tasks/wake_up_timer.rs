//! Wake-up timer background task

use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::state::AppState;

/// Background task that sleeps until the pending wake-up is due and then
/// re-evaluates the active domain.
///
/// Exactly one timer is armed at a time. A new schedule published while
/// sleeping replaces the current one.
pub async fn wake_up_timer_task(state: Arc<AppState>) {
    info!("Starting wake-up timer task");

    let mut wake_up_rx = state.wake_up_tx.subscribe();

    loop {
        let scheduled = wake_up_rx.borrow_and_update().clone();

        let Some(wake_up) = scheduled else {
            // Nothing scheduled, wait for the next navigation to arm a timer
            if wake_up_rx.changed().await.is_err() {
                break;
            }
            continue;
        };

        // Count from when the wake-up was scheduled, not from when it was read
        let remaining_ms = wake_up.remaining_ms(state.clock.now());
        debug!("Wake-up {} armed for {} in {}ms", wake_up.generation, wake_up.domain, remaining_ms);

        tokio::select! {
            _ = sleep(Duration::from_millis(remaining_ms)) => {
                match state.handle_wake_up(&wake_up) {
                    Ok(Some(outcome)) => {
                        debug!("Wake-up {} produced {:?}", wake_up.generation, outcome.action);
                    }
                    Ok(None) => {
                        debug!("Wake-up {} had nothing to re-evaluate", wake_up.generation);
                    }
                    Err(e) => {
                        error!("Failed to handle wake-up for {}: {}", wake_up.domain, e);
                    }
                }

                // Handling normally publishes the next schedule. If it did
                // not, wait instead of re-arming the one that just fired.
                match wake_up_rx.has_changed() {
                    Ok(true) => {}
                    Ok(false) => {
                        if wake_up_rx.changed().await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            changed = wake_up_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Wake-up {} superseded", wake_up.generation);
            }
        }
    }

    info!("Wake-up timer task stopped");
}
