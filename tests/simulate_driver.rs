use std::sync::Arc;

use booking_flow::{
    ConfirmTimeouts, EngineState, FlowPolicy, KeywordSets, PageKind, PollPolicy, SystemClock,
};
use railbook_cli::cli::scenario::{Navigation, Scenario};
use railbook_cli::cli::simulate::{run_scenario, SimulationSetup};
use railbook_core_types::BookingConfig;
use railbook_state_center::{MemorySettingsStore, SessionMarkers};

fn fast_policy() -> FlowPolicy {
    FlowPolicy {
        poll: PollPolicy {
            min_interval_ms: 5,
            settle_timeout_ms: 60,
            settle_grain_ms: 2,
            settle_grace_ms: 2,
            max_attempts: 6,
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

fn setup(markers: SessionMarkers) -> SimulationSetup {
    let config = BookingConfig {
        from_station: "北京,BJP".into(),
        to_station: "上海,SHH".into(),
        date: "2025-10-01".into(),
        train_prefixes: Vec::new(),
        query_interval_ms: 5,
        passengers: vec!["张三".into()],
        ..BookingConfig::default()
    };
    SimulationSetup {
        policy: fast_policy(),
        settings: Arc::new(MemorySettingsStore::new(config)),
        markers,
        clock: Arc::new(SystemClock),
    }
}

fn scenario(yaml: &str) -> Scenario {
    serde_yaml::from_str(yaml).expect("scenario parses")
}

const ONE_TRAIN: &str = r#"
results:
  - rows:
      - label: G7
        cells: [G7, "10:00"]
        action: book-G7
    stable: true
confirmation:
  container_passengers: [张三]
  payment_after_submit: true
"#;

#[tokio::test]
async fn reload_hands_over_through_markers() {
    let markers = SessionMarkers::in_memory();
    let report = run_scenario(scenario(ONE_TRAIN), setup(markers.clone()))
        .await
        .unwrap();

    assert_eq!(report.final_state, EngineState::Success);
    assert_eq!(report.navigations, 1);
    assert_eq!(report.selected, vec!["G7"]);
    assert_eq!(report.passengers, vec!["张三"]);
    assert!(!report.markers_left);
    assert!(!markers.any_set());
    assert!(report
        .transcript
        .iter()
        .any(|line| line.starts_with("page reloaded")));
}

#[tokio::test]
async fn without_reload_budget_the_old_page_stays_selected() {
    let mut script = scenario(ONE_TRAIN);
    script.max_navigations = 0;
    let markers = SessionMarkers::in_memory();
    let report = run_scenario(script, setup(markers.clone())).await.unwrap();

    assert_eq!(
        report.final_state,
        EngineState::Selected {
            train_no: "G7".into()
        }
    );
    assert_eq!(report.status, "selected G7, waiting for confirmation page");
    assert!(report.markers_left);
    assert!(markers.running.get() && markers.continuation.get());
}

#[tokio::test]
async fn in_place_navigation_confirms_without_reload() {
    let mut script = scenario(ONE_TRAIN);
    script.navigation = Navigation::InPlace;
    let report = run_scenario(script, setup(SessionMarkers::in_memory()))
        .await
        .unwrap();

    assert_eq!(report.final_state, EngineState::Success);
    assert_eq!(report.navigations, 0);
}

#[tokio::test]
async fn logged_out_start_is_refused() {
    let mut script = scenario(ONE_TRAIN);
    script.logged_in = false;
    let report = run_scenario(script, setup(SessionMarkers::in_memory()))
        .await
        .unwrap();

    assert_eq!(report.final_state, EngineState::Idle);
    assert!(report.refused.is_some());
    assert_eq!(report.searches, 0);
}

#[tokio::test]
async fn start_on_confirmation_page_runs_the_protocol() {
    let mut script = scenario(ONE_TRAIN);
    script.page = PageKind::Confirmation;
    let report = run_scenario(script, setup(SessionMarkers::in_memory()))
        .await
        .unwrap();

    assert_eq!(report.final_state, EngineState::Success);
    assert!(report.submitted);
    assert_eq!(report.searches, 0);
}

#[tokio::test]
async fn empty_results_exhaust_the_attempt_ceiling() {
    let script = scenario("results:\n  - rows: []\n    stable: true\n");
    let report = run_scenario(script, setup(SessionMarkers::in_memory()))
        .await
        .unwrap();

    assert_eq!(report.final_state, EngineState::Stopped);
    assert_eq!(report.searches, 6);
    assert_eq!(report.status, "stopped");
}
