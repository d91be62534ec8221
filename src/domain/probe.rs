use std::fmt;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

/// DNS name every host is asked to reach.
pub const PROBE_TARGET: &str = "one.one.one.one";

/// Separator used when the address list is rendered as a single field.
pub const ADDRESS_SEPARATOR: &str = ";";

/// Raw answer of a network probe, before it is attached to a host.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ProbeReport {
    pub ping_succeeded: bool,
    pub name_resolution_succeeded: bool,
    pub resolved_addresses: Vec<String>,
}

/// Connectivity result of one host that accepted a remote session.
///
/// Built once by the runner and only read afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct ProbeResult {
    host: String,
    ping_succeeded: bool,
    name_resolution_succeeded: bool,
    resolved_addresses: Vec<String>,
}

impl ProbeResult {
    pub fn new(
        host: impl Into<String>,
        ping_succeeded: bool,
        name_resolution_succeeded: bool,
        resolved_addresses: Vec<String>,
    ) -> Self {
        Self {
            host: host.into(),
            ping_succeeded,
            name_resolution_succeeded,
            resolved_addresses,
        }
    }

    pub fn from_report(host: impl Into<String>, report: ProbeReport) -> Self {
        Self::new(
            host,
            report.ping_succeeded,
            report.name_resolution_succeeded,
            report.resolved_addresses,
        )
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ping_succeeded(&self) -> bool {
        self.ping_succeeded
    }

    pub fn name_resolution_succeeded(&self) -> bool {
        self.name_resolution_succeeded
    }

    pub fn resolved_addresses(&self) -> &[String] {
        &self.resolved_addresses
    }

    /// Addresses in resolution order, joined with `;`. Empty when the
    /// resolver returned nothing.
    pub fn joined_addresses(&self) -> String {
        self.resolved_addresses.join(ADDRESS_SEPARATOR)
    }

    /// Inverse of [`joined_addresses`](Self::joined_addresses).
    pub fn split_addresses(joined: &str) -> Vec<String> {
        if joined.is_empty() {
            return Vec::new();
        }
        joined
            .split(ADDRESS_SEPARATOR)
            .map(|s| s.to_string())
            .collect()
    }
}

/// Why a host produced no [`ProbeResult`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    SessionEstablishmentFailed(String),
    ProbeExecutionFailed(String),
    /// Batch was cancelled before this host started.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SessionEstablishmentFailed(cause) => {
                write!(f, "session establishment failed: {cause}")
            }
            SkipReason::ProbeExecutionFailed(cause) => write!(f, "probe execution failed: {cause}"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-host outcome of a batch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOutcome {
    Probed(ProbeResult),
    Skipped { host: String, reason: SkipReason },
}

impl HostOutcome {
    pub fn host(&self) -> &str {
        match self {
            HostOutcome::Probed(r) => r.host(),
            HostOutcome::Skipped { host, .. } => host,
        }
    }

    pub fn result(&self) -> Option<&ProbeResult> {
        match self {
            HostOutcome::Probed(r) => Some(r),
            HostOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            HostOutcome::Skipped {
                reason: SkipReason::Cancelled,
                ..
            }
        )
    }
}
