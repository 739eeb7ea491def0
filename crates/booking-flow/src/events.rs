use tracing::{debug, info};

use crate::model::EngineState;
use crate::ports::EventsPort;

/// Default observer: everything goes to `tracing`.
#[derive(Clone, Debug, Default)]
pub struct TracingEvents;

impl EventsPort for TracingEvents {
    fn state_changed(&self, from: &EngineState, to: &EngineState) {
        info!(target: "railbook", from = from.name(), to = to.name(), "engine state changed");
    }

    fn attempt(&self, attempt: u32, ceiling: u32) {
        debug!(target: "railbook", attempt, ceiling, "poll attempt");
    }

    fn note(&self, message: &str) {
        info!(target: "railbook", "{message}");
    }
}
