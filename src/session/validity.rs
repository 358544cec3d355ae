//! Periodic remote re-validation of the active session

use super::store::SessionStore;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Recurring validation task, armed for one session identity.
///
/// Holds only a weak reference to the store so a dropped store ends the
/// task. Dropping the loop cancels it.
pub struct ValidityLoop {
    handle: JoinHandle<()>,
}

impl ValidityLoop {
    /// Spawn the task; the first check happens one full `period` from now
    pub fn spawn(store: Weak<SessionStore>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                if !store.periodic_check().await {
                    break;
                }
            }
            tracing::debug!("Session validity loop stopped");
        });

        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ValidityLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
