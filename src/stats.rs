use crate::domain::probe::{HostOutcome, SkipReason};
#[cfg(feature = "json")]
use serde::Serialize;

/// Counters over the outcomes of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct BatchSummary {
    pub hosts: usize,
    pub probed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub ping_ok: usize,
    pub dns_ok: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &HostOutcome) {
        self.hosts += 1;
        match outcome {
            HostOutcome::Probed(r) => {
                self.probed += 1;
                self.ping_ok += usize::from(r.ping_succeeded());
                self.dns_ok += usize::from(r.name_resolution_succeeded());
            }
            HostOutcome::Skipped {
                reason: SkipReason::Cancelled,
                ..
            } => self.cancelled += 1,
            HostOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::probe::ProbeResult;

    #[test]
    fn record_counts_each_outcome_kind() {
        let mut summary = BatchSummary::default();
        summary.record(&HostOutcome::Probed(ProbeResult::new("a", true, false, vec![])));
        summary.record(&HostOutcome::Skipped {
            host: "b".into(),
            reason: SkipReason::SessionEstablishmentFailed("refused".into()),
        });
        summary.record(&HostOutcome::Skipped {
            host: "c".into(),
            reason: SkipReason::Cancelled,
        });
        assert_eq!(
            summary,
            BatchSummary {
                hosts: 3,
                probed: 1,
                skipped: 1,
                cancelled: 1,
                ping_ok: 1,
                dns_ok: 0,
            }
        );
    }
}
