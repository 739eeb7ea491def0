pub mod api;
pub mod clock;
pub mod errors;
pub mod model;
pub mod policy;
pub mod ports;

mod confirm;
mod events;
mod poll;
mod settle;

pub use api::{Orchestrator, OrchestratorBuilder};
pub use clock::{Clock, SystemClock};
pub use errors::FlowError;
pub use events::TracingEvents;
pub use model::{ConfirmOutcome, EngineState, FailureKind, Phase, PollOutcome};
pub use policy::{ConfirmTimeouts, FlowPolicy, KeywordSets, PollPolicy};
pub use ports::{EventsPort, PageKind, PageSurface, PassengerScope, ResultsState, SeatControl};
