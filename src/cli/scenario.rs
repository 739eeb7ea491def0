//! Scripted booking site for `railbook simulate`.
//!
//! A [`Scenario`] describes what the site shows; [`ScriptedSite`] plays it
//! back. Each loaded page is a [`ScriptedSurface`] bound to one page
//! generation: a full reload bumps the generation and every call through an
//! older surface fails as stale, the same way a discarded page context would.

use std::sync::Arc;

use async_trait::async_trait;
use booking_flow::{FlowPolicy, PageKind, PageSurface, PassengerScope, ResultsState, SeatControl};
use candidate_filter::{Candidate, TrainType};
use parking_lot::{Mutex, MutexGuard};
use railbook_core_types::{BookingConfig, QueryPreset, SurfaceError};
use serde::Deserialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    /// Clicking a row loads the confirmation page as a new document.
    #[default]
    Reload,
    /// The confirmation view replaces the results without a reload.
    InPlace,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Page shown when the simulation begins.
    pub page: PageKind,
    pub logged_in: bool,
    /// Call `start` after the first page load when nothing resumed.
    pub auto_start: bool,
    /// Inline booking settings; the settings file is used when absent.
    pub settings: Option<BookingConfig>,
    /// Replaces the configured engine policy.
    pub policy: Option<FlowPolicy>,
    pub search_enabled: bool,
    /// Result table per search; the last entry repeats.
    pub results: Vec<ResultsState>,
    pub navigation: Navigation,
    pub max_navigations: u32,
    /// Train-type toggle labels shown above the results.
    pub train_type_toggles: Vec<String>,
    pub confirmation: ConfirmationScript,
}

fn site_train_type_toggles() -> Vec<String> {
    ["GC-高铁/城际", "D-动车", "Z-直达", "T-特快", "K-快速", "其他"]
        .iter()
        .map(|label| label.to_string())
        .collect()
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            page: PageKind::Search,
            logged_in: true,
            auto_start: true,
            settings: None,
            policy: None,
            search_enabled: true,
            results: Vec::new(),
            navigation: Navigation::Reload,
            max_navigations: 4,
            train_type_toggles: site_train_type_toggles(),
            confirmation: ConfirmationScript::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConfirmationScript {
    pub container_passengers: Vec<String>,
    pub page_passengers: Vec<String>,
    pub seat_list: Vec<String>,
    pub seat_toggles: Vec<String>,
    pub submit_available: bool,
    pub page_text: String,
    pub text_after_submit: Option<String>,
    pub dialog_after_submit: bool,
    pub dialog_clears_on_confirm: bool,
    pub payment_after_submit: bool,
    pub payment_after_confirm: bool,
}

impl Default for ConfirmationScript {
    fn default() -> Self {
        Self {
            container_passengers: Vec::new(),
            page_passengers: Vec::new(),
            seat_list: Vec::new(),
            seat_toggles: Vec::new(),
            submit_available: true,
            page_text: String::new(),
            text_after_submit: None,
            dialog_after_submit: false,
            dialog_clears_on_confirm: true,
            payment_after_submit: false,
            payment_after_confirm: false,
        }
    }
}

#[derive(Debug, Default)]
struct SiteState {
    generation: u64,
    page: PageKind,
    reload_pending: bool,
    searches: u32,
    current: ResultsState,
    selected: Vec<String>,
    dialog_visible: bool,
    submitted: bool,
    confirm_clicks: u32,
    returned: bool,
    picked_passengers: Vec<String>,
    picked_seat: Option<String>,
    checked_toggles: Vec<String>,
}

/// Counters exposed after a simulation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SiteSummary {
    pub searches: u32,
    pub selected: Vec<String>,
    pub submitted: bool,
    pub confirm_clicks: u32,
    pub returned: bool,
    pub passengers: Vec<String>,
    pub seat: Option<String>,
    /// Labels of the train-type toggles left checked.
    pub train_types: Vec<String>,
    pub page: PageKind,
}

pub struct ScriptedSite {
    script: Scenario,
    state: Mutex<SiteState>,
}

impl ScriptedSite {
    pub fn new(script: Scenario) -> Arc<Self> {
        let state = SiteState {
            page: script.page,
            ..SiteState::default()
        };
        Arc::new(Self {
            script,
            state: Mutex::new(state),
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.script
    }

    /// Surface for the page currently loaded.
    pub fn attach(self: &Arc<Self>) -> Arc<ScriptedSurface> {
        let generation = self.state.lock().generation;
        Arc::new(ScriptedSurface {
            site: Arc::clone(self),
            generation,
        })
    }

    /// `true` once per full page reload.
    pub fn take_reload(&self) -> bool {
        std::mem::take(&mut self.state.lock().reload_pending)
    }

    pub fn page(&self) -> PageKind {
        self.state.lock().page
    }

    pub fn summary(&self) -> SiteSummary {
        let state = self.state.lock();
        SiteSummary {
            searches: state.searches,
            selected: state.selected.clone(),
            submitted: state.submitted,
            confirm_clicks: state.confirm_clicks,
            returned: state.returned,
            passengers: state.picked_passengers.clone(),
            seat: state.picked_seat.clone(),
            train_types: state.checked_toggles.clone(),
            page: state.page,
        }
    }
}

/// One loaded page of a [`ScriptedSite`].
pub struct ScriptedSurface {
    site: Arc<ScriptedSite>,
    generation: u64,
}

impl ScriptedSurface {
    fn live(&self) -> Result<MutexGuard<'_, SiteState>, SurfaceError> {
        let state = self.site.state.lock();
        if state.generation != self.generation {
            return Err(SurfaceError::Stale("page unloaded".into()));
        }
        Ok(state)
    }

    fn script(&self) -> &Scenario {
        &self.site.script
    }
}

#[async_trait]
impl PageSurface for ScriptedSurface {
    async fn query_results_state(&self) -> Result<ResultsState, SurfaceError> {
        Ok(self.live()?.current.clone())
    }

    async fn issue_search(&self) -> Result<bool, SurfaceError> {
        let mut state = self.live()?;
        if !self.script().search_enabled {
            return Ok(false);
        }
        state.searches += 1;
        let results = &self.script().results;
        let index = (state.searches as usize - 1).min(results.len().saturating_sub(1));
        state.current = results.get(index).cloned().unwrap_or(ResultsState {
            rows: Vec::new(),
            stable: true,
        });
        Ok(true)
    }

    async fn select_row(&self, candidate: &Candidate) -> Result<(), SurfaceError> {
        let mut state = self.live()?;
        state.selected.push(candidate.train_no.clone());
        state.page = PageKind::Confirmation;
        if self.script().navigation == Navigation::Reload {
            state.generation += 1;
            state.reload_pending = true;
        }
        debug!(train = %candidate.train_no, "scripted row clicked");
        Ok(())
    }

    async fn confirmation_dialog_visible(&self) -> Result<bool, SurfaceError> {
        Ok(self.live()?.dialog_visible)
    }

    async fn confirm_dialog(&self) -> Result<(), SurfaceError> {
        let mut state = self.live()?;
        if !state.dialog_visible {
            return Err(SurfaceError::missing("confirm button"));
        }
        let script = &self.script().confirmation;
        state.confirm_clicks += 1;
        if script.dialog_clears_on_confirm {
            state.dialog_visible = false;
        }
        if script.payment_after_confirm {
            state.page = PageKind::Payment;
        }
        Ok(())
    }

    async fn cancel_and_return(&self) -> Result<(), SurfaceError> {
        let mut state = self.live()?;
        state.returned = true;
        state.dialog_visible = false;
        state.page = PageKind::Search;
        Ok(())
    }

    async fn set_passenger_selected(
        &self,
        name: &str,
        scope: PassengerScope,
    ) -> Result<bool, SurfaceError> {
        let mut state = self.live()?;
        let script = &self.script().confirmation;
        let listed = match scope {
            PassengerScope::Container => &script.container_passengers,
            PassengerScope::Page => &script.page_passengers,
        };
        let found = listed.iter().any(|entry| entry == name);
        if found && !state.picked_passengers.iter().any(|picked| picked == name) {
            state.picked_passengers.push(name.to_string());
        }
        Ok(found)
    }

    async fn set_seat_preference(
        &self,
        ordered_names: &[String],
        control: SeatControl,
    ) -> Result<bool, SurfaceError> {
        let mut state = self.live()?;
        let script = &self.script().confirmation;
        let offered = match control {
            SeatControl::List => &script.seat_list,
            SeatControl::Toggle => &script.seat_toggles,
        };
        if offered.is_empty() {
            return Err(SurfaceError::missing("seat control"));
        }
        match ordered_names.iter().find(|name| offered.contains(*name)) {
            Some(name) => {
                state.picked_seat = Some(name.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn read_page_text(&self) -> Result<String, SurfaceError> {
        let state = self.live()?;
        let script = &self.script().confirmation;
        Ok(match (&script.text_after_submit, state.submitted) {
            (Some(text), true) => text.clone(),
            _ => script.page_text.clone(),
        })
    }

    async fn submit_order(&self) -> Result<bool, SurfaceError> {
        let mut state = self.live()?;
        let script = &self.script().confirmation;
        if !script.submit_available {
            return Ok(false);
        }
        state.submitted = true;
        if script.dialog_after_submit {
            state.dialog_visible = true;
        }
        if script.payment_after_submit {
            state.page = PageKind::Payment;
        }
        Ok(true)
    }

    async fn page_kind(&self) -> Result<PageKind, SurfaceError> {
        Ok(self.live()?.page)
    }

    async fn is_logged_in(&self) -> Result<bool, SurfaceError> {
        drop(self.live()?);
        Ok(self.script().logged_in)
    }

    async fn preset_query(&self, preset: &QueryPreset) -> Result<bool, SurfaceError> {
        let state = self.live()?;
        debug!(?preset, "scripted query preset");
        Ok(state.page == PageKind::Search)
    }

    async fn apply_train_type_filters(&self, types: &[TrainType]) -> Result<bool, SurfaceError> {
        let mut state = self.live()?;
        state.checked_toggles = self
            .script()
            .train_type_toggles
            .iter()
            .filter(|label| TrainType::from_label(label).is_some_and(|ty| types.contains(&ty)))
            .cloned()
            .collect();
        Ok(!state.checked_toggles.is_empty())
    }
}
