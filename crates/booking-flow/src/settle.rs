use std::time::Duration;

use candidate_filter::RowDescriptor;
use railbook_core_types::SurfaceError;
use tokio::select;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::policy::PollPolicy;
use crate::ports::PageSurface;

/// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => !cancel.is_cancelled(),
    }
}

/// Wait for the results table to settle after a search.
///
/// `Some(rows)` once rows are visible, `Some(empty)` when loading finished
/// with nothing to show, `None` on timeout or cancellation.
pub(crate) async fn wait_for_results(
    surface: &dyn PageSurface,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Option<Vec<RowDescriptor>>, SurfaceError> {
    let deadline = Instant::now() + policy.settle_timeout();
    while Instant::now() < deadline {
        if !pause(policy.settle_grain(), cancel).await {
            return Ok(None);
        }
        let state = surface.query_results_state().await?;
        if !state.rows.is_empty() {
            return Ok(Some(state.rows));
        }
        if state.stable {
            if !pause(policy.settle_grace(), cancel).await {
                return Ok(None);
            }
            let again = surface.query_results_state().await?;
            if !again.rows.is_empty() || again.stable {
                return Ok(Some(again.rows));
            }
        }
    }
    Ok(None)
}
