use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use futures::FutureExt;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, instrument, warn};

use crate::adapters::net_probe::NetworkProbe;
use crate::adapters::transport::{Session, Transport};
use crate::domain::probe::{HostOutcome, PROBE_TARGET, ProbeResult, SkipReason};
use crate::error::RnetprobeError;

/// Tuning of a batch run.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Budget for opening the session and running the probe on one host.
    pub timeout: Duration,
    /// Budget for closing a session, independent of `timeout`.
    pub teardown_timeout: Duration,
    /// Hosts processed at once. `1` keeps the batch strictly sequential.
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            teardown_timeout: Duration::from_secs(10),
            jobs: 1,
        }
    }
}

/// Cooperative cancellation shared between the batch and whoever stops it.
///
/// Checked before a host starts; a host already in flight runs to the end.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// Skips are values reported by the caller; only trace them here.
fn skipped(host: &str, reason: SkipReason) -> HostOutcome {
    debug!(host, %reason, "host skipped");
    HostOutcome::Skipped {
        host: host.to_string(),
        reason,
    }
}

/// Run the connectivity probe on one host.
///
/// Surrounding whitespace is stripped before the session is opened; the
/// result keeps `host` as given. Once a session is open it is closed
/// exactly once, whatever the probe does, before this function returns.
#[instrument(skip(transport, probe, config))]
pub async fn probe_host(
    host: &str,
    transport: &dyn Transport,
    probe: &dyn NetworkProbe,
    config: &RunnerConfig,
) -> HostOutcome {
    let target_host = host.trim();
    if target_host.is_empty() {
        return skipped(
            host,
            SkipReason::SessionEstablishmentFailed("empty host".into()),
        );
    }

    let deadline = Instant::now() + config.timeout;
    let session = match timeout_at(deadline, transport.open(target_host)).await {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => return skipped(host, SkipReason::SessionEstablishmentFailed(e.to_string())),
        Err(_) => {
            let e = RnetprobeError::Timeout(config.timeout);
            return skipped(host, SkipReason::SessionEstablishmentFailed(e.to_string()));
        }
    };
    debug!("session open");

    let probed = AssertUnwindSafe(timeout_at(deadline, probe.probe(session.as_ref(), PROBE_TARGET)))
        .catch_unwind()
        .await;

    release(session, config.teardown_timeout).await;

    match probed {
        Ok(Ok(Ok(report))) => {
            debug!(?report, "probe finished");
            HostOutcome::Probed(ProbeResult::from_report(host, report))
        }
        Ok(Ok(Err(e))) => skipped(host, SkipReason::ProbeExecutionFailed(e.to_string())),
        Ok(Err(_)) => {
            let e = RnetprobeError::Timeout(config.timeout);
            skipped(host, SkipReason::ProbeExecutionFailed(e.to_string()))
        }
        Err(_) => skipped(host, SkipReason::ProbeExecutionFailed("probe panicked".into())),
    }
}

/// Close a session; failures are only logged.
async fn release(session: Box<dyn Session>, grace: Duration) {
    let host = session.host().to_string();
    match timeout(grace, session.close()).await {
        Ok(Ok(())) => debug!(host = %host, "session closed"),
        Ok(Err(e)) => warn!(host = %host, error = %e, "session teardown failed"),
        Err(_) => warn!(host = %host, "session teardown timed out after {grace:?}"),
    }
}

/// Outcomes of `hosts` in input order.
///
/// Up to `config.jobs` hosts run at once; results are still yielded in the
/// order of `hosts`. Hosts not started when `cancel` fires yield
/// [`SkipReason::Cancelled`].
pub fn outcome_stream<'a>(
    hosts: &'a [String],
    transport: &'a dyn Transport,
    probe: &'a dyn NetworkProbe,
    config: &'a RunnerConfig,
    cancel: &'a CancelFlag,
) -> impl Stream<Item = HostOutcome> + 'a {
    stream::iter(hosts)
        .map(move |host| async move {
            if cancel.is_cancelled() {
                return HostOutcome::Skipped {
                    host: host.clone(),
                    reason: SkipReason::Cancelled,
                };
            }
            probe_host(host, transport, probe, config).await
        })
        .buffered(config.jobs.max(1))
}

/// Probe every host and collect all outcomes.
pub async fn run_batch(
    hosts: &[String],
    transport: &dyn Transport,
    probe: &dyn NetworkProbe,
    config: &RunnerConfig,
    cancel: &CancelFlag,
) -> Vec<HostOutcome> {
    outcome_stream(hosts, transport, probe, config, cancel)
        .collect()
        .await
}
