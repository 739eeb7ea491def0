use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use candidate_filter::train_types_for_prefixes;
use parking_lot::{Mutex, RwLock};
use railbook_core_types::{BookingConfig, RunId};
use railbook_scheduler::{
    explain_activation, format_countdown, time_until, Activation, ActivationTimer, ScheduleError,
};
use railbook_state_center::{RunState, RunStateHandle, SessionMarkers, SettingsStore};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

use crate::clock::{Clock, SystemClock};
use crate::confirm::{run_confirmation, ConfirmDeps};
use crate::errors::FlowError;
use crate::events::TracingEvents;
use crate::model::{EngineState, FailureKind, PollOutcome};
use crate::policy::FlowPolicy;
use crate::poll::{run_poll_loop, PollDeps};
use crate::ports::{EventsPort, PageKind, PageSurface};
use crate::settle::pause;

pub struct OrchestratorBuilder {
    policy: FlowPolicy,
    surface: Option<Arc<dyn PageSurface>>,
    settings: Option<Arc<dyn SettingsStore>>,
    markers: Option<SessionMarkers>,
    events: Option<Arc<dyn EventsPort>>,
    clock: Option<Arc<dyn Clock>>,
}

impl OrchestratorBuilder {
    pub fn new(policy: FlowPolicy) -> Self {
        Self {
            policy,
            surface: None,
            settings: None,
            markers: None,
            events: None,
            clock: None,
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn PageSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_markers(mut self, markers: SessionMarkers) -> Self {
        self.markers = Some(markers);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventsPort>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Loads the booking settings and restores the run state from the markers.
    pub fn build(self) -> Result<Orchestrator, FlowError> {
        let surface = self.surface.ok_or(FlowError::MissingPort("page surface"))?;
        let settings = self
            .settings
            .ok_or(FlowError::MissingPort("settings store"))?;
        let markers = self.markers.unwrap_or_else(SessionMarkers::in_memory);
        let config = settings.load();
        let (state, _) = watch::channel(EngineState::Idle);

        Ok(Orchestrator {
            inner: Arc::new(Inner {
                policy: self.policy,
                surface,
                settings,
                events: self.events.unwrap_or_else(|| Arc::new(TracingEvents)),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                run: RunStateHandle::restore(markers),
                config: RwLock::new(config),
                state,
                page: Mutex::new(PageKind::Other),
                timer: ActivationTimer::new(),
                active: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        })
    }
}

/// Engine bound to one loaded page. A full navigation discards it; the next
/// page builds a fresh one and calls [`Orchestrator::on_page_load`].
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct ActiveRun {
    id: RunId,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

struct Inner {
    policy: FlowPolicy,
    surface: Arc<dyn PageSurface>,
    settings: Arc<dyn SettingsStore>,
    events: Arc<dyn EventsPort>,
    clock: Arc<dyn Clock>,
    run: RunStateHandle,
    config: RwLock<BookingConfig>,
    state: watch::Sender<EngineState>,
    page: Mutex<PageKind>,
    timer: ActivationTimer,
    active: Mutex<Option<ActiveRun>>,
    /// Bumped by `stop`; work started under an older epoch must not publish state.
    epoch: AtomicU64,
}

impl Orchestrator {
    pub fn state(&self) -> EngineState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.inner.state.subscribe()
    }

    pub fn config(&self) -> BookingConfig {
        self.inner.config.read().clone()
    }

    pub fn run_state(&self) -> RunState {
        self.inner.run.snapshot()
    }

    /// Resume check, run on every page entry.
    #[instrument(skip_all)]
    pub async fn on_page_load(&self) -> EngineState {
        let inner = &self.inner;
        let page = inner.refresh_page().await;
        match page {
            PageKind::Search if inner.run.is_running() => {
                if !inner.logged_in().await {
                    warn!("run marker set but not logged in, not resuming");
                    return self.state();
                }
                info!("resuming polling after navigation");
                inner.run.clear_continuation();
                inner.begin_polling();
            }
            PageKind::Confirmation if inner.run.should_continue() => {
                if !inner.logged_in().await {
                    warn!("confirmation page reached but not logged in");
                    return self.state();
                }
                info!("continuing into order confirmation");
                inner.begin_confirmation();
            }
            PageKind::Confirmation => inner.events.note("stopped (confirmation page)"),
            _ => debug!(?page, "page loaded, nothing to resume"),
        }
        self.state()
    }

    /// Start a run: scheduled when a future start is configured, immediately otherwise.
    #[instrument(skip_all)]
    pub async fn start(&self) -> Result<EngineState, FlowError> {
        let inner = &self.inner;
        if self.state().is_active() {
            return Err(FlowError::AlreadyActive);
        }
        if !inner.logged_in().await {
            return Err(FlowError::NotLoggedIn);
        }
        if inner.refresh_page().await == PageKind::Confirmation {
            inner.run.activate();
            inner.begin_confirmation();
            return Ok(self.state());
        }

        let schedule = inner.config.read().schedule.clone();
        let now = inner.clock.now();
        match explain_activation(&now, &schedule) {
            Ok(activation) if activation.start_at > now => inner.arm_schedule(activation),
            Ok(_) => {
                debug!("scheduled start already inside the lead window");
                inner.begin_polling();
            }
            Err(ScheduleError::Disabled) => inner.begin_polling(),
            Err(err) => {
                warn!(error = %err, "scheduled start ignored");
                inner.begin_polling();
            }
        }
        Ok(self.state())
    }

    /// Skip any pending schedule and poll right away.
    pub async fn start_now(&self) -> Result<EngineState, FlowError> {
        let state = self.state();
        if state.is_active() && !matches!(state, EngineState::ScheduledWait { .. }) {
            return Err(FlowError::AlreadyActive);
        }
        if !self.inner.logged_in().await {
            return Err(FlowError::NotLoggedIn);
        }
        self.inner.begin_polling();
        Ok(self.state())
    }

    /// Cancel whatever is scheduled or running and clear the run state.
    pub fn stop(&self) -> EngineState {
        let inner = &self.inner;
        inner.epoch.fetch_add(1, Ordering::SeqCst);
        inner.timer.disarm();
        if let Some(active) = inner.active.lock().as_ref() {
            active.cancel.cancel();
        }
        inner.run.clear();
        inner.set_state(EngineState::Stopped);
        self.state()
    }

    /// Apply and persist a settings edit. Fields that drive an active run
    /// cannot change until it ends.
    pub fn update_config(&self, next: BookingConfig) -> Result<BookingConfig, FlowError> {
        let inner = &self.inner;
        let next = next.normalized();
        let state = self.state();
        if state.is_active() {
            let locked = inner.config.read().locked_changes(&next);
            if !locked.is_empty() {
                return Err(FlowError::ConfigLocked(locked));
            }
        }
        inner.settings.save(&next);
        *inner.config.write() = next.clone();
        if matches!(state, EngineState::ScheduledWait { .. }) {
            inner.reschedule();
        }
        Ok(next)
    }

    pub fn status_line(&self) -> String {
        let inner = &self.inner;
        match self.state() {
            EngineState::Idle | EngineState::Stopped
                if *inner.page.lock() == PageKind::Confirmation =>
            {
                "stopped (confirmation page)".to_string()
            }
            EngineState::Idle | EngineState::Stopped => "stopped".to_string(),
            EngineState::ScheduledWait { nominal, start_at } => {
                let left = time_until(&inner.clock.now(), &start_at);
                format!(
                    "waiting for scheduled start {} ({})",
                    nominal.format("%H:%M"),
                    format_countdown(left)
                )
            }
            EngineState::Polling => format!("running | attempts {}", inner.run.attempts()),
            EngineState::Selected { train_no } => {
                format!("selected {train_no}, waiting for confirmation page")
            }
            EngineState::ConfirmFlow => "confirming order".to_string(),
            EngineState::Success => "success: order submitted".to_string(),
            EngineState::Failed { reason } => format!("failed: {reason}"),
            EngineState::TimedOut { phase } => format!("timed out during {phase}"),
        }
    }

    /// Wait until nothing is scheduled or running, then return the final state.
    pub async fn join(&self) -> EngineState {
        let mut rx = self.inner.state.subscribe();
        loop {
            let (handle, waiting) = {
                let mut active = self.inner.active.lock();
                let handle = active.as_mut().and_then(|run| run.handle.take());
                let waiting =
                    matches!(*rx.borrow_and_update(), EngineState::ScheduledWait { .. });
                (handle, waiting)
            };
            if let Some(handle) = handle {
                if let Err(err) = handle.await {
                    warn!(error = %err, "booking task ended abnormally");
                }
                continue;
            }
            if !waiting || rx.changed().await.is_err() {
                return self.state();
            }
        }
    }
}

impl Inner {
    fn current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn set_state(&self, next: EngineState) {
        let previous = self.state.send_replace(next.clone());
        if previous != next {
            self.events.state_changed(&previous, &next);
        }
    }

    fn set_state_if(&self, epoch: u64, next: EngineState) {
        if self.current(epoch) {
            self.set_state(next);
        }
    }

    async fn logged_in(&self) -> bool {
        match self.surface.is_logged_in().await {
            Ok(logged_in) => logged_in,
            Err(err) => {
                debug!(error = %err, "login state unavailable");
                false
            }
        }
    }

    async fn refresh_page(&self) -> PageKind {
        let page = self.surface.page_kind().await.unwrap_or_default();
        *self.page.lock() = page;
        page
    }

    fn arm_schedule(self: &Arc<Self>, activation: Activation<chrono::FixedOffset>) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let delay = time_until(&self.clock.now(), &activation.start_at);
        info!(
            nominal = %activation.nominal,
            start_at = %activation.start_at,
            delay_ms = delay.as_millis() as u64,
            "scheduled start armed"
        );
        self.set_state(EngineState::ScheduledWait {
            nominal: activation.nominal,
            start_at: activation.start_at,
        });
        let weak = Arc::downgrade(self);
        self.timer.arm(delay, move || {
            if let Some(inner) = weak.upgrade() {
                if inner.current(epoch) {
                    inner.begin_polling();
                }
            }
        });
    }

    fn reschedule(self: &Arc<Self>) {
        self.timer.disarm();
        let schedule = self.config.read().schedule.clone();
        let now = self.clock.now();
        match explain_activation(&now, &schedule) {
            Ok(activation) if activation.start_at > now => self.arm_schedule(activation),
            Ok(_) => self.begin_polling(),
            Err(err) => {
                debug!(error = %err, "schedule no longer active");
                self.set_state(EngineState::Idle);
            }
        }
    }

    fn begin_polling(self: &Arc<Self>) {
        self.timer.disarm();
        self.run.activate();
        let epoch = self.epoch.load(Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let inner = Arc::clone(self);
        let token = cancel.clone();
        self.launch(epoch, EngineState::Polling, cancel, async move {
            inner.polling_phase(epoch, token).await
        });
    }

    fn begin_confirmation(self: &Arc<Self>) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let inner = Arc::clone(self);
        let token = cancel.clone();
        self.launch(epoch, EngineState::ConfirmFlow, cancel, async move {
            inner.confirmation_phase(epoch, token).await
        });
    }

    /// Publish `state` and register the task under one lock so `join`
    /// never observes one without the other. The task runs under a
    /// supervisor that releases the run if it panics.
    fn launch<F>(
        self: &Arc<Self>,
        epoch: u64,
        state: EngineState,
        cancel: CancellationToken,
        task: F,
    ) where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let run_id = RunId::new();
        info!(run = %run_id, phase = state.name(), "booking run launched");
        let task = task.instrument(info_span!("booking_run", run = %run_id));

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }
        self.set_state(state);

        let worker = tokio::spawn(task);
        let inner = Arc::clone(self);
        let id = run_id.clone();
        let supervisor = async move {
            if let Err(err) = worker.await {
                inner.abandon_run(epoch, &id, err);
            }
        };
        *active = Some(ActiveRun {
            id: run_id,
            cancel,
            handle: Some(tokio::spawn(supervisor)),
        });
    }

    /// The run's task died without a verdict. Clear both markers so no page
    /// resumes it, and publish a terminal state so a new run can start.
    fn abandon_run(&self, epoch: u64, id: &RunId, err: JoinError) {
        warn!(run = %id, error = %err, "booking task ended abnormally");
        let active = self.active.lock();
        let owns = active.as_ref().is_some_and(|run| &run.id == id);
        if !owns || !self.current(epoch) {
            return;
        }
        self.run.clear();
        self.set_state(EngineState::Failed {
            reason: FailureKind::Crashed,
        });
    }

    async fn prepare_search(&self, config: &BookingConfig) {
        let missing = config.missing_query_fields();
        if missing.is_empty() {
            if let Err(err) = self.surface.preset_query(&config.query_preset()).await {
                debug!(error = %err, "query preset failed");
            }
        } else {
            warn!(?missing, "query fields incomplete, searches will not be issued");
        }

        let types = train_types_for_prefixes(&config.train_prefixes);
        if !types.is_empty() {
            if let Err(err) = self.surface.apply_train_type_filters(&types).await {
                debug!(error = %err, "train type filters unavailable");
            }
        }
    }

    async fn polling_phase(self: Arc<Self>, epoch: u64, cancel: CancellationToken) {
        let config = self.config.read().clone();
        self.prepare_search(&config).await;

        let deps = PollDeps {
            surface: self.surface.as_ref(),
            events: self.events.as_ref(),
            run: &self.run,
            policy: &self.policy.poll,
        };
        let outcome = run_poll_loop(deps, &config, &cancel).await;
        if !self.current(epoch) {
            return;
        }

        match outcome {
            PollOutcome::Selected(candidate) => {
                self.set_state_if(
                    epoch,
                    EngineState::Selected {
                        train_no: candidate.train_no,
                    },
                );
                if !pause(self.policy.poll.navigation_grace(), &cancel).await {
                    return;
                }
                if self.refresh_page().await == PageKind::Confirmation {
                    debug!("confirmation view reached without reload");
                    self.confirmation_phase(epoch, cancel).await;
                }
            }
            PollOutcome::Exhausted { .. } => {
                self.run.clear();
                self.set_state_if(epoch, EngineState::Stopped);
            }
            PollOutcome::Cancelled => {}
        }
    }

    async fn confirmation_phase(&self, epoch: u64, cancel: CancellationToken) {
        self.set_state_if(epoch, EngineState::ConfirmFlow);
        let config = self.config.read().clone();
        let deps = ConfirmDeps {
            surface: self.surface.as_ref(),
            events: self.events.as_ref(),
            run: &self.run,
            timeouts: &self.policy.confirm,
            keywords: &self.policy.keywords,
        };
        let outcome = run_confirmation(deps, &config, &cancel).await;
        if let Some(state) = outcome.into_state() {
            if self.current(epoch) {
                self.run.clear();
                self.set_state(state);
            }
        }
    }
}
