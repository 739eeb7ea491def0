use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::select;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Armed {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

/// Single-shot activation timer. At most one pending activation exists;
/// arming again replaces the previous one.
#[derive(Default)]
pub struct ActivationTimer {
    armed: Mutex<Option<Armed>>,
}

impl ActivationTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` after `delay`. Must be called inside a tokio runtime.
    pub fn arm<F>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let deadline = Instant::now() + delay;

        let previous = self.armed.lock().replace(Armed {
            token: token.clone(),
            fired: fired.clone(),
        });
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        tokio::spawn(async move {
            select! {
                _ = token.cancelled() => {
                    debug!(target: "railbook-scheduler", "activation timer disarmed");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    if !token.is_cancelled() {
                        fired.store(true, Ordering::SeqCst);
                        debug!(target: "railbook-scheduler", "activation timer fired");
                        on_fire();
                    }
                }
            }
        });
    }

    /// Cancel the pending activation. Returns whether one was pending.
    pub fn disarm(&self) -> bool {
        match self.armed.lock().take() {
            Some(armed) => {
                armed.token.cancel();
                !armed.fired.load(Ordering::SeqCst)
            }
            None => false,
        }
    }
}

impl Drop for ActivationTimer {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.get_mut().take() {
            armed.token.cancel();
        }
    }
}
