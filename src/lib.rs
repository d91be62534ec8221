//! rnetprobe library: batched remote connectivity diagnostics.
//!
//! Each host gets a remote session, a reachability probe against
//! `one.one.one.one`, and a guaranteed teardown. Results flow into a
//! [`ResultSink`](sink::ResultSink) that renders them to the terminal or
//! appends them to a CSV or text file.

pub mod adapters;
pub mod domain;
mod error;
pub mod fmt;
pub mod services;
pub mod sink;
pub mod stats;

pub use domain::probe::{HostOutcome, PROBE_TARGET, ProbeReport, ProbeResult, SkipReason};
pub use error::RnetprobeError;
pub use services::pipeline::drain_into_sink;
pub use services::runner::{CancelFlag, RunnerConfig, outcome_stream, probe_host, run_batch};
pub use sink::{OutputConfig, OutputMode, ResultSink};
