use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use booking_flow::{
    Clock, EngineState, EventsPort, FlowPolicy, Orchestrator, OrchestratorBuilder, SystemClock,
    TracingEvents,
};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset};
use clap::Args;
use parking_lot::Mutex;
use railbook_state_center::{MemorySettingsStore, SessionMarkers, SettingsStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::output::{emit_structured, OutputFormat};
use crate::cli::scenario::{Scenario, ScriptedSite};

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML)
    #[arg(long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Pretend the simulation starts at this instant (RFC 3339)
    #[arg(long, value_name = "TIME")]
    pub now: Option<String>,

    /// Keep the run markers in memory instead of the session directory
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub final_state: EngineState,
    pub status: String,
    /// Why `start` was refused, when it was.
    pub refused: Option<String>,
    pub navigations: u32,
    pub searches: u32,
    pub train_types: Vec<String>,
    pub selected: Vec<String>,
    pub passengers: Vec<String>,
    pub seat: Option<String>,
    pub submitted: bool,
    pub markers_left: bool,
    pub transcript: Vec<String>,
}

/// Wall clock shifted so that it reads `origin` when the simulation starts.
#[derive(Debug)]
pub struct ShiftedClock {
    origin: DateTime<FixedOffset>,
    started: Instant,
}

impl ShiftedClock {
    pub fn starting_at(origin: DateTime<FixedOffset>) -> Self {
        Self {
            origin,
            started: Instant::now(),
        }
    }
}

impl Clock for ShiftedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let elapsed = ChronoDuration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| ChronoDuration::zero());
        self.origin + elapsed
    }
}

/// Records engine events as text lines and forwards them to `tracing`.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn push(&self, line: String) {
        self.lines.lock().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl EventsPort for Transcript {
    fn state_changed(&self, from: &EngineState, to: &EngineState) {
        TracingEvents.state_changed(from, to);
        self.push(format!("state {} -> {}", from.name(), to.name()));
    }

    fn attempt(&self, attempt: u32, ceiling: u32) {
        TracingEvents.attempt(attempt, ceiling);
        self.push(format!("attempt {attempt}/{ceiling}"));
    }

    fn note(&self, message: &str) {
        TracingEvents.note(message);
        self.push(message.to_string());
    }
}

pub struct SimulationSetup {
    pub policy: FlowPolicy,
    pub settings: Arc<dyn SettingsStore>,
    pub markers: SessionMarkers,
    pub clock: Arc<dyn Clock>,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.scenario)
        .await
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;

    let clock: Arc<dyn Clock> = match args.now.as_deref() {
        Some(raw) => Arc::new(ShiftedClock::starting_at(
            DateTime::parse_from_rfc3339(raw).with_context(|| format!("parsing --now {raw:?}"))?,
        )),
        None => Arc::new(SystemClock),
    };
    let settings: Arc<dyn SettingsStore> = match &scenario.settings {
        Some(inline) => Arc::new(MemorySettingsStore::new(inline.clone().normalized())),
        None => Arc::new(ctx.settings_store()),
    };
    let markers = if args.ephemeral {
        SessionMarkers::in_memory()
    } else {
        ctx.session_markers()
    };
    let setup = SimulationSetup {
        policy: scenario.policy.clone().unwrap_or_else(|| ctx.policy().clone()),
        settings,
        markers,
        clock,
    };

    let report = run_scenario(scenario, setup).await?;
    if !emit_structured(&report, output)? {
        print_human_report(&report);
    }
    Ok(())
}

/// Drive the engine through `scenario`. A full page reload discards the
/// current orchestrator; the next page gets a fresh one that only knows what
/// the session markers carried over.
pub async fn run_scenario(scenario: Scenario, setup: SimulationSetup) -> Result<SimulationReport> {
    let site = ScriptedSite::new(scenario);
    let transcript = Arc::new(Transcript::default());
    let build = || -> Result<Orchestrator> {
        let engine = OrchestratorBuilder::new(setup.policy.clone())
            .with_surface(site.attach())
            .with_settings(Arc::clone(&setup.settings))
            .with_markers(setup.markers.clone())
            .with_events(transcript.clone())
            .with_clock(Arc::clone(&setup.clock))
            .build()?;
        Ok(engine)
    };

    let mut engine = build()?;
    let mut refused = None;
    let resumed = engine.on_page_load().await;
    if !resumed.is_active() && site.scenario().auto_start {
        match engine.start().await {
            Ok(state) => info!(state = state.name(), "simulation started"),
            Err(err) => {
                warn!(error = %err, "start refused");
                transcript.note(&format!("start refused: {err}"));
                refused = Some(err.to_string());
            }
        }
    }
    transcript.note(&engine.status_line());

    let mut navigations = 0;
    let final_state = loop {
        let state = engine.join().await;
        if navigations >= site.scenario().max_navigations || !site.take_reload() {
            break state;
        }
        navigations += 1;
        transcript.note(&format!("page reloaded ({:?})", site.page()));
        engine = build()?;
        engine.on_page_load().await;
    };

    let summary = site.summary();
    Ok(SimulationReport {
        status: engine.status_line(),
        final_state,
        refused,
        navigations,
        searches: summary.searches,
        train_types: summary.train_types,
        selected: summary.selected,
        passengers: summary.passengers,
        seat: summary.seat,
        submitted: summary.submitted,
        markers_left: setup.markers.any_set(),
        transcript: transcript.lines(),
    })
}

fn print_human_report(report: &SimulationReport) {
    for line in &report.transcript {
        println!("  {line}");
    }
    println!("Result:      {}", report.status);
    if let Some(reason) = &report.refused {
        println!("Refused:     {reason}");
    }
    println!("Searches:    {}", report.searches);
    if !report.train_types.is_empty() {
        println!("Train types: {}", report.train_types.join(", "));
    }
    if !report.selected.is_empty() {
        println!("Selected:    {}", report.selected.join(", "));
    }
    if !report.passengers.is_empty() {
        println!("Passengers:  {}", report.passengers.join(", "));
    }
    if let Some(seat) = &report.seat {
        println!("Seat:        {seat}");
    }
    println!("Navigations: {}", report.navigations);
    if report.markers_left {
        println!("Run markers are still set; `railbook stop` clears them");
    }
}
