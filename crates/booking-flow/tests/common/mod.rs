#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use booking_flow::{
    Clock, ConfirmTimeouts, EngineState, EventsPort, FlowPolicy, KeywordSets, Orchestrator,
    OrchestratorBuilder, PageKind, PageSurface, PassengerScope, PollPolicy, ResultsState,
    SeatControl,
};
use candidate_filter::{Candidate, RowDescriptor, TrainType};
use chrono::{DateTime, FixedOffset, TimeZone};
use parking_lot::{Mutex, MutexGuard};
use railbook_core_types::{ActionRef, BookingConfig, QueryPreset, SurfaceError};
use railbook_state_center::{MemorySettingsStore, SessionMarkers};

/// Scripted booking site.
#[derive(Debug)]
pub struct SiteState {
    pub page: PageKind,
    pub logged_in: bool,
    pub search_enabled: bool,
    pub rows: Vec<RowDescriptor>,
    pub stable: bool,
    pub failing_queries: bool,
    /// `select_row` fails as if the row went stale under the click.
    pub failing_select: bool,
    /// One-shot renderer crashes.
    pub panic_on_search: bool,
    pub panic_on_submit: bool,
    pub searches: u32,
    pub selected: Vec<String>,
    /// Page shown right after a row is clicked.
    pub navigate_on_select: Option<PageKind>,
    pub dialog_visible: bool,
    pub dialog_after_submit: bool,
    pub dialog_clears_on_confirm: bool,
    pub payment_after_confirm: bool,
    pub confirm_clicks: u32,
    pub submit_available: bool,
    pub submitted: bool,
    pub page_text: String,
    pub text_after_submit: Option<String>,
    pub returned: bool,
    pub container_passengers: Vec<String>,
    pub page_passengers: Vec<String>,
    pub picked_passengers: Vec<(String, PassengerScope)>,
    pub seat_list: Vec<String>,
    pub seat_toggles: Vec<String>,
    pub picked_seat: Option<(String, SeatControl)>,
    pub presets: Vec<QueryPreset>,
    pub type_filters: Vec<Vec<TrainType>>,
}

impl Default for SiteState {
    fn default() -> Self {
        Self {
            page: PageKind::Search,
            logged_in: true,
            search_enabled: true,
            rows: Vec::new(),
            stable: true,
            failing_queries: false,
            failing_select: false,
            panic_on_search: false,
            panic_on_submit: false,
            searches: 0,
            selected: Vec::new(),
            navigate_on_select: None,
            dialog_visible: false,
            dialog_after_submit: false,
            dialog_clears_on_confirm: true,
            payment_after_confirm: false,
            confirm_clicks: 0,
            submit_available: true,
            submitted: false,
            page_text: String::new(),
            text_after_submit: None,
            returned: false,
            container_passengers: Vec::new(),
            page_passengers: Vec::new(),
            picked_passengers: Vec::new(),
            seat_list: Vec::new(),
            seat_toggles: Vec::new(),
            picked_seat: None,
            presets: Vec::new(),
            type_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockSite {
    state: Mutex<SiteState>,
}

impl MockSite {
    pub fn new(state: SiteState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock()
    }
}

#[async_trait]
impl PageSurface for MockSite {
    async fn query_results_state(&self) -> Result<ResultsState, SurfaceError> {
        let state = self.state.lock();
        if state.failing_queries {
            return Err(SurfaceError::Stale("results table".into()));
        }
        Ok(ResultsState {
            rows: state.rows.clone(),
            stable: state.stable,
        })
    }

    async fn issue_search(&self) -> Result<bool, SurfaceError> {
        let mut state = self.state.lock();
        state.searches += 1;
        if std::mem::take(&mut state.panic_on_search) {
            drop(state);
            panic!("renderer crashed during search");
        }
        Ok(state.search_enabled)
    }

    async fn select_row(&self, candidate: &Candidate) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        if state.failing_select {
            return Err(SurfaceError::Stale("booking button".into()));
        }
        state.selected.push(candidate.train_no.clone());
        if let Some(page) = state.navigate_on_select {
            state.page = page;
        }
        Ok(())
    }

    async fn confirmation_dialog_visible(&self) -> Result<bool, SurfaceError> {
        Ok(self.state.lock().dialog_visible)
    }

    async fn confirm_dialog(&self) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.confirm_clicks += 1;
        if state.dialog_clears_on_confirm {
            state.dialog_visible = false;
        }
        if state.payment_after_confirm {
            state.page = PageKind::Payment;
        }
        Ok(())
    }

    async fn cancel_and_return(&self) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        state.returned = true;
        state.page = PageKind::Search;
        Ok(())
    }

    async fn set_passenger_selected(
        &self,
        name: &str,
        scope: PassengerScope,
    ) -> Result<bool, SurfaceError> {
        let mut state = self.state.lock();
        let listed = match scope {
            PassengerScope::Container => &state.container_passengers,
            PassengerScope::Page => &state.page_passengers,
        };
        if listed.iter().any(|p| p == name) {
            state.picked_passengers.push((name.to_string(), scope));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn set_seat_preference(
        &self,
        ordered_names: &[String],
        control: SeatControl,
    ) -> Result<bool, SurfaceError> {
        let mut state = self.state.lock();
        let offered = match control {
            SeatControl::List => &state.seat_list,
            SeatControl::Toggle => &state.seat_toggles,
        };
        if offered.is_empty() {
            return Err(SurfaceError::missing("seat control"));
        }
        let pick = ordered_names
            .iter()
            .find(|name| offered.contains(*name))
            .cloned();
        match pick {
            Some(name) => {
                state.picked_seat = Some((name, control));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn read_page_text(&self) -> Result<String, SurfaceError> {
        let state = self.state.lock();
        Ok(match (&state.text_after_submit, state.submitted) {
            (Some(text), true) => text.clone(),
            _ => state.page_text.clone(),
        })
    }

    async fn submit_order(&self) -> Result<bool, SurfaceError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.panic_on_submit) {
            drop(state);
            panic!("renderer crashed during submit");
        }
        if !state.submit_available {
            return Ok(false);
        }
        state.submitted = true;
        if state.dialog_after_submit {
            state.dialog_visible = true;
        }
        Ok(true)
    }

    async fn page_kind(&self) -> Result<PageKind, SurfaceError> {
        Ok(self.state.lock().page)
    }

    async fn is_logged_in(&self) -> Result<bool, SurfaceError> {
        Ok(self.state.lock().logged_in)
    }

    async fn preset_query(&self, preset: &QueryPreset) -> Result<bool, SurfaceError> {
        self.state.lock().presets.push(preset.clone());
        Ok(true)
    }

    async fn apply_train_type_filters(&self, types: &[TrainType]) -> Result<bool, SurfaceError> {
        self.state.lock().type_filters.push(types.to_vec());
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct RecordingEvents {
    pub attempts: Mutex<Vec<u32>>,
    pub states: Mutex<Vec<&'static str>>,
    pub notes: Mutex<Vec<String>>,
}

impl EventsPort for RecordingEvents {
    fn state_changed(&self, _from: &EngineState, to: &EngineState) {
        self.states.lock().push(to.name());
    }

    fn attempt(&self, attempt: u32, _ceiling: u32) {
        self.attempts.lock().push(attempt);
    }

    fn note(&self, message: &str) {
        self.notes.lock().push(message.to_string());
    }
}

#[derive(Debug)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

pub fn beijing(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 9, 12, h, m, s)
        .unwrap()
}

/// Millisecond-scale timings so scenarios finish quickly.
pub fn fast_policy() -> FlowPolicy {
    FlowPolicy {
        poll: PollPolicy {
            min_interval_ms: 5,
            settle_timeout_ms: 60,
            settle_grain_ms: 2,
            settle_grace_ms: 2,
            max_attempts: 20,
            navigation_grace_ms: 5,
        },
        confirm: ConfirmTimeouts {
            prep_initial_ms: 1,
            prep_step_ms: 1,
            passenger_settle_ms: 1,
            submit_timeout_ms: 300,
            submit_grain_ms: 5,
            dialog_timeout_ms: 150,
            dialog_grain_ms: 2,
            after_confirm_click_ms: 5,
        },
        keywords: KeywordSets::default(),
    }
}

/// Un-normalized so the tiny interval survives.
pub fn booking_config() -> BookingConfig {
    BookingConfig {
        from_station: "北京,BJP".into(),
        to_station: "上海,SHH".into(),
        date: "2025-10-01".into(),
        train_prefixes: Vec::new(),
        query_interval_ms: 5,
        passengers: vec!["张三".into()],
        ..BookingConfig::default()
    }
}

pub fn row(train: &str, departure: &str) -> RowDescriptor {
    RowDescriptor::new(train, ActionRef::new(format!("book-{train}")))
        .with_cells([train.to_string(), departure.to_string()])
}

pub struct Harness {
    pub engine: Orchestrator,
    pub events: Arc<RecordingEvents>,
    pub settings: Arc<MemorySettingsStore>,
}

pub fn harness(
    site: &Arc<MockSite>,
    config: BookingConfig,
    policy: FlowPolicy,
    markers: SessionMarkers,
    clock: Option<Arc<dyn Clock>>,
) -> Harness {
    let events = Arc::new(RecordingEvents::default());
    let settings = Arc::new(MemorySettingsStore::new(config));
    let mut builder = OrchestratorBuilder::new(policy)
        .with_surface(site.clone())
        .with_settings(settings.clone())
        .with_markers(markers)
        .with_events(events.clone());
    if let Some(clock) = clock {
        builder = builder.with_clock(clock);
    }
    Harness {
        engine: builder.build().expect("orchestrator builds"),
        events,
        settings,
    }
}
