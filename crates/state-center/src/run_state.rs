use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::marker::SessionMarkers;

/// Ephemeral record of a booking run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RunState {
    pub running: bool,
    pub attempts: u32,
    pub continue_past_navigation: bool,
}

/// Run state mirrored onto the session markers, so that a freshly loaded
/// page can recover whether it is in the middle of a run.
#[derive(Debug)]
pub struct RunStateHandle {
    state: Mutex<RunState>,
    markers: SessionMarkers,
}

impl RunStateHandle {
    /// Rebuild the in-memory record from whatever the markers say.
    /// The attempt counter never survives a navigation.
    pub fn restore(markers: SessionMarkers) -> Self {
        let state = RunState {
            running: markers.running.get(),
            attempts: 0,
            continue_past_navigation: markers.continuation.get(),
        };
        debug!(?state, "run state restored from session markers");
        Self {
            state: Mutex::new(state),
            markers,
        }
    }

    pub fn markers(&self) -> &SessionMarkers {
        &self.markers
    }

    pub fn snapshot(&self) -> RunState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    /// Start a fresh run: running, zero attempts.
    pub fn activate(&self) {
        let mut state = self.state.lock();
        state.running = true;
        state.attempts = 0;
        self.markers.running.set(true);
    }

    /// Count one poll tick and return the new total.
    pub fn record_attempt(&self) -> u32 {
        let mut state = self.state.lock();
        state.attempts = state.attempts.saturating_add(1);
        state.attempts
    }

    /// Written right before an action that reloads the page.
    pub fn mark_continuation(&self) {
        self.state.lock().continue_past_navigation = true;
        self.markers.continuation.set(true);
    }

    pub fn clear_continuation(&self) {
        self.state.lock().continue_past_navigation = false;
        self.markers.continuation.set(false);
    }

    pub fn should_continue(&self) -> bool {
        let state = self.state.lock();
        state.continue_past_navigation || state.running
    }

    /// Reset everything, markers included. Safe to call repeatedly.
    pub fn clear(&self) {
        *self.state.lock() = RunState::default();
        self.markers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_reads_markers_but_not_attempts() {
        let markers = SessionMarkers::in_memory();
        let first = RunStateHandle::restore(markers.clone());
        first.activate();
        first.record_attempt();
        first.record_attempt();
        first.mark_continuation();

        let second = RunStateHandle::restore(markers);
        assert_eq!(
            second.snapshot(),
            RunState {
                running: true,
                attempts: 0,
                continue_past_navigation: true,
            }
        );
    }

    #[test]
    fn clear_resets_markers_idempotently() {
        let markers = SessionMarkers::in_memory();
        let handle = RunStateHandle::restore(markers.clone());
        handle.activate();
        handle.mark_continuation();
        handle.clear();
        handle.clear();
        assert!(!markers.any_set());
        assert_eq!(handle.snapshot(), RunState::default());
    }
}
