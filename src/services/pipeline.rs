use futures::stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::domain::probe::HostOutcome;
use crate::error::RnetprobeError;
use crate::services::runner::CancelFlag;
use crate::sink::ResultSink;
use crate::stats::BatchSummary;

/// Feed outcomes into `sink` as they arrive.
///
/// Results are written in stream order; skipped hosts are passed to
/// `on_skip` and never reach the sink. The stream is always drained to the
/// end so every host already in flight finishes its teardown. When the sink
/// fails, `cancel` is raised so no further host starts, nothing more is
/// written, and the first sink error is returned once the stream is done.
pub async fn drain_into_sink<S, F>(
    outcomes: S,
    sink: &mut ResultSink,
    cancel: &CancelFlag,
    mut on_skip: F,
) -> Result<BatchSummary, RnetprobeError>
where
    S: Stream<Item = HostOutcome>,
    F: FnMut(&HostOutcome),
{
    let mut summary = BatchSummary::default();
    let mut failure: Option<RnetprobeError> = None;
    let mut announced = false;
    futures::pin_mut!(outcomes);
    while let Some(outcome) = outcomes.next().await {
        summary.record(&outcome);
        if outcome.is_cancelled() {
            if !announced {
                info!(host = outcome.host(), "batch cancelled");
                announced = true;
            }
            continue;
        }
        match &outcome {
            HostOutcome::Probed(result) if failure.is_none() => {
                if let Err(e) = sink.write(result) {
                    warn!(error = %e, "sink failed, stopping the batch");
                    cancel.cancel();
                    failure = Some(e);
                }
            }
            HostOutcome::Probed(_) => {}
            HostOutcome::Skipped { .. } => on_skip(&outcome),
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}
