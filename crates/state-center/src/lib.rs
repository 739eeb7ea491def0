//! State shared across page navigations: the run record, the session markers
//! backing it, and the persisted booking settings.

pub mod marker;
pub mod run_state;
pub mod settings;

pub use marker::{FileMarker, MemoryMarker, RunMarker, SessionMarkers};
pub use run_state::{RunState, RunStateHandle};
pub use settings::{JsonSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};
