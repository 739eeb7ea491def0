use async_trait::async_trait;
use candidate_filter::{Candidate, RowDescriptor, TrainType};
use railbook_core_types::{QueryPreset, SurfaceError};
use serde::{Deserialize, Serialize};

use crate::model::EngineState;

/// Everything the engine is allowed to observe or do on the booking site.
///
/// Every call may fail with a transient [`SurfaceError`]; callers absorb
/// those at tick or phase level.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Rows currently rendered in the results table.
    async fn query_results_state(&self) -> Result<ResultsState, SurfaceError>;
    /// Trigger a search. `false` when required query fields are missing.
    async fn issue_search(&self) -> Result<bool, SurfaceError>;
    /// Click the candidate's booking action. Usually navigates.
    async fn select_row(&self, candidate: &Candidate) -> Result<(), SurfaceError>;
    async fn confirmation_dialog_visible(&self) -> Result<bool, SurfaceError>;
    async fn confirm_dialog(&self) -> Result<(), SurfaceError>;
    /// Leave the confirmation view and go back to editing.
    async fn cancel_and_return(&self) -> Result<(), SurfaceError>;
    async fn set_passenger_selected(
        &self,
        name: &str,
        scope: PassengerScope,
    ) -> Result<bool, SurfaceError>;
    /// Pick the first available seat class from `ordered_names`.
    async fn set_seat_preference(
        &self,
        ordered_names: &[String],
        control: SeatControl,
    ) -> Result<bool, SurfaceError>;
    async fn read_page_text(&self) -> Result<String, SurfaceError>;
    /// Click the order submit button. `false` when it is not present.
    async fn submit_order(&self) -> Result<bool, SurfaceError>;
    async fn page_kind(&self) -> Result<PageKind, SurfaceError>;
    async fn is_logged_in(&self) -> Result<bool, SurfaceError>;
    /// Fill the search form. `false` when the form is not available.
    async fn preset_query(&self, preset: &QueryPreset) -> Result<bool, SurfaceError>;
    async fn apply_train_type_filters(&self, types: &[TrainType]) -> Result<bool, SurfaceError>;
}

/// Observer for engine progress. Calls must not block.
pub trait EventsPort: Send + Sync {
    fn state_changed(&self, from: &EngineState, to: &EngineState);
    fn attempt(&self, attempt: u32, ceiling: u32);
    fn note(&self, message: &str);
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResultsState {
    #[serde(default)]
    pub rows: Vec<RowDescriptor>,
    /// No loading indicator is showing.
    #[serde(default)]
    pub stable: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Search,
    Confirmation,
    Payment,
    #[default]
    Other,
}

/// Where to look for a passenger entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerScope {
    /// The dedicated passenger list.
    Container,
    /// Any matching element on the page.
    Page,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatControl {
    /// Drop-down seat selectors.
    List,
    /// Radio or toggle buttons.
    Toggle,
}
