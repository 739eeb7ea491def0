use candidate_filter::{select_candidate, Candidate};
use railbook_core_types::{BookingConfig, SurfaceError};
use railbook_state_center::RunStateHandle;
use tokio::select;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::model::PollOutcome;
use crate::policy::PollPolicy;
use crate::ports::{EventsPort, PageSurface};
use crate::settle::wait_for_results;

pub(crate) struct PollDeps<'a> {
    pub surface: &'a dyn PageSurface,
    pub events: &'a dyn EventsPort,
    pub run: &'a RunStateHandle,
    pub policy: &'a PollPolicy,
}

/// Search repeatedly until a candidate is clicked, the attempt ceiling is
/// reached, or the run is cancelled. Every tick that does not end in a
/// selection counts as a failed attempt.
#[instrument(skip_all, fields(order = config.order_index, interval_ms = config.query_interval_ms))]
pub(crate) async fn run_poll_loop(
    deps: PollDeps<'_>,
    config: &BookingConfig,
    cancel: &CancellationToken,
) -> PollOutcome {
    let period = deps.policy.interval(config.query_interval_ms);
    let ceiling = deps.policy.max_attempts.max(1);
    // First tick completes immediately: the opening search runs at activation.
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = ticker.tick() => {}
        }
        if !deps.run.is_running() {
            return PollOutcome::Cancelled;
        }

        let attempt = deps.run.record_attempt();
        deps.events.attempt(attempt, ceiling);

        match tick(&deps, config, cancel).await {
            Ok(Some(candidate)) => {
                info!(train = %candidate.train_no, attempt, "candidate selected");
                return PollOutcome::Selected(candidate);
            }
            Ok(None) => {}
            Err(err) => debug!(attempt, error = %err, "poll tick failed"),
        }

        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }
        if attempt >= ceiling {
            info!(attempts = attempt, "attempt ceiling reached, stopping");
            return PollOutcome::Exhausted { attempts: attempt };
        }
    }
}

async fn tick(
    deps: &PollDeps<'_>,
    config: &BookingConfig,
    cancel: &CancellationToken,
) -> Result<Option<Candidate>, SurfaceError> {
    if !deps.surface.issue_search().await? {
        debug!("search not issued, query fields missing");
        return Ok(None);
    }
    let Some(rows) = wait_for_results(deps.surface, deps.policy, cancel).await? else {
        return Ok(None);
    };
    let Some(candidate) = select_candidate(&rows, config) else {
        debug!(rows = rows.len(), "no eligible candidate");
        return Ok(None);
    };

    deps.run.mark_continuation();
    if let Err(err) = deps.surface.select_row(&candidate).await {
        deps.run.clear_continuation();
        return Err(err);
    }
    Ok(Some(candidate))
}
