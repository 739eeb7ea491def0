use railbook_core_types::BookingConfig;
use railbook_state_center::RunStateHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::model::{ConfirmOutcome, FailureKind, Phase};
use crate::policy::{ConfirmTimeouts, KeywordSets};
use crate::ports::{EventsPort, PageKind, PageSurface, PassengerScope, SeatControl};
use crate::settle::pause;

pub(crate) struct ConfirmDeps<'a> {
    pub surface: &'a dyn PageSurface,
    pub events: &'a dyn EventsPort,
    pub run: &'a RunStateHandle,
    pub timeouts: &'a ConfirmTimeouts,
    pub keywords: &'a KeywordSets,
}

/// Clears the continuation marker however the protocol exits.
struct ContinuationGuard<'a>(&'a RunStateHandle);

impl Drop for ContinuationGuard<'_> {
    fn drop(&mut self) {
        self.0.clear_continuation();
    }
}

/// Fill passengers and seat, submit the order and follow it to a verdict.
#[instrument(skip_all, fields(passengers = config.passengers.len()))]
pub(crate) async fn run_confirmation(
    deps: ConfirmDeps<'_>,
    config: &BookingConfig,
    cancel: &CancellationToken,
) -> ConfirmOutcome {
    deps.run.mark_continuation();
    let _guard = ContinuationGuard(deps.run);

    if !prepare(&deps, config, cancel).await {
        return ConfirmOutcome::Cancelled;
    }
    let outcome = submit(&deps, config, cancel).await;
    info!(?outcome, "confirmation finished");
    outcome
}

async fn prepare(deps: &ConfirmDeps<'_>, config: &BookingConfig, cancel: &CancellationToken) -> bool {
    if !pause(deps.timeouts.prep_initial(), cancel).await {
        return false;
    }
    if !select_passengers(deps, config, cancel).await {
        return false;
    }
    if !pause(deps.timeouts.prep_step(), cancel).await {
        return false;
    }
    pick_seat(deps, config).await;
    pause(deps.timeouts.prep_step(), cancel).await
}

async fn select_passengers(
    deps: &ConfirmDeps<'_>,
    config: &BookingConfig,
    cancel: &CancellationToken,
) -> bool {
    if !pause(deps.timeouts.passenger_settle(), cancel).await {
        return false;
    }
    for name in &config.passengers {
        let in_container = deps
            .surface
            .set_passenger_selected(name, PassengerScope::Container)
            .await;
        let selected = match in_container {
            Ok(true) => true,
            Ok(false) | Err(_) => deps
                .surface
                .set_passenger_selected(name, PassengerScope::Page)
                .await
                .unwrap_or_else(|err| {
                    debug!(passenger = %name, error = %err, "passenger lookup failed");
                    false
                }),
        };
        if !selected {
            warn!(passenger = %name, "passenger not found on page");
        }
    }
    pause(deps.timeouts.passenger_settle(), cancel).await
}

async fn pick_seat(deps: &ConfirmDeps<'_>, config: &BookingConfig) {
    if config.seat_preference.is_empty() {
        return;
    }
    for control in [SeatControl::List, SeatControl::Toggle] {
        match deps
            .surface
            .set_seat_preference(&config.seat_preference, control)
            .await
        {
            Ok(true) => {
                debug!(?control, "seat preference applied");
                return;
            }
            Ok(false) => {}
            Err(err) => debug!(?control, error = %err, "seat control unavailable"),
        }
    }
    warn!("no preferred seat class could be selected");
}

async fn submit(
    deps: &ConfirmDeps<'_>,
    config: &BookingConfig,
    cancel: &CancellationToken,
) -> ConfirmOutcome {
    match deps.surface.submit_order().await {
        Ok(true) => deps.events.note("order submitted"),
        Ok(false) => return ConfirmOutcome::Failed(FailureKind::SubmitUnavailable),
        Err(err) => {
            warn!(error = %err, "submit click failed");
            return ConfirmOutcome::Failed(FailureKind::SubmitUnavailable);
        }
    }

    let deadline = Instant::now() + deps.timeouts.submit_timeout();
    while Instant::now() < deadline {
        if !pause(deps.timeouts.submit_grain(), cancel).await {
            return ConfirmOutcome::Cancelled;
        }

        if deps
            .surface
            .confirmation_dialog_visible()
            .await
            .unwrap_or(false)
        {
            debug!("secondary confirmation dialog visible");
            return secondary_confirmation(deps, cancel).await;
        }

        let text = page_text(deps).await;
        if deps.keywords.no_seat_in(&text).is_some() {
            if !config.allow_no_seat {
                info!("no seat available, returning to edit");
                if let Err(err) = deps.surface.cancel_and_return().await {
                    debug!(error = %err, "return button unavailable");
                }
                return ConfirmOutcome::Failed(FailureKind::NoSeat);
            }
            debug!("no-seat phrase present, waiting since no-seat is allowed");
        }
        if payment_reached(deps, &text).await {
            return ConfirmOutcome::Success;
        }
        if let Some(phrase) = deps.keywords.error_in(&text) {
            return ConfirmOutcome::Failed(FailureKind::Rejected(phrase.to_string()));
        }
    }
    ConfirmOutcome::TimedOut(Phase::Submission)
}

async fn secondary_confirmation(
    deps: &ConfirmDeps<'_>,
    cancel: &CancellationToken,
) -> ConfirmOutcome {
    let deadline = Instant::now() + deps.timeouts.dialog_timeout();
    while Instant::now() < deadline {
        if !pause(deps.timeouts.dialog_grain(), cancel).await {
            return ConfirmOutcome::Cancelled;
        }
        match deps.surface.confirmation_dialog_visible().await {
            Ok(false) => return ConfirmOutcome::Success,
            Ok(true) => {}
            Err(err) => {
                debug!(error = %err, "dialog state unavailable");
                continue;
            }
        }
        if let Err(err) = deps.surface.confirm_dialog().await {
            debug!(error = %err, "confirm button not ready");
            continue;
        }
        if !pause(deps.timeouts.after_confirm_click(), cancel).await {
            return ConfirmOutcome::Cancelled;
        }

        if !deps
            .surface
            .confirmation_dialog_visible()
            .await
            .unwrap_or(true)
        {
            return ConfirmOutcome::Success;
        }
        let text = page_text(deps).await;
        if payment_reached(deps, &text).await {
            return ConfirmOutcome::Success;
        }
        if let Some(phrase) = deps.keywords.error_in(&text) {
            return ConfirmOutcome::Failed(FailureKind::Rejected(phrase.to_string()));
        }
    }
    ConfirmOutcome::TimedOut(Phase::SecondaryConfirmation)
}

async fn page_text(deps: &ConfirmDeps<'_>) -> String {
    deps.surface.read_page_text().await.unwrap_or_else(|err| {
        debug!(error = %err, "page text unavailable");
        String::new()
    })
}

async fn payment_reached(deps: &ConfirmDeps<'_>, text: &str) -> bool {
    matches!(deps.surface.page_kind().await, Ok(PageKind::Payment))
        || deps.keywords.payment_in(text).is_some()
}
