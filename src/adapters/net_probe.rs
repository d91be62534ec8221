//! Reachability probe executed inside a remote session.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::transport::{CommandOutput, Session};
use crate::domain::probe::ProbeReport;
use crate::error::RnetprobeError;

/// Shell status for "command not found".
const STATUS_NOT_FOUND: i32 = 127;

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Probe `target` from the host behind `session`.
    async fn probe(
        &self,
        session: &dyn Session,
        target: &str,
    ) -> Result<ProbeReport, RnetprobeError>;
}

/// Probe built from the stock `ping` and `getent` utilities of the remote host.
#[derive(Clone, Debug)]
pub struct CommandProbe {
    pub ping_wait: Duration,
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self {
            ping_wait: Duration::from_secs(2),
        }
    }
}

#[async_trait]
impl NetworkProbe for CommandProbe {
    #[instrument(skip(self, session), fields(host = session.host()))]
    async fn probe(
        &self,
        session: &dyn Session,
        name: &str,
    ) -> Result<ProbeReport, RnetprobeError> {
        let wait = self.ping_wait.as_secs().max(1).to_string();
        let ping = session
            .exec("ping", &["-c", "1", "-W", wait.as_str(), name])
            .await?;
        ensure_found("ping", &ping)?;
        debug!(status = ?ping.status, "ping finished");

        let lookup = session.exec("getent", &["ahosts", name]).await?;
        ensure_found("getent", &lookup)?;
        debug!(status = ?lookup.status, "getent finished");

        // Exit 0 with no output still counts as resolved.
        let resolved = lookup.success();
        Ok(ProbeReport {
            ping_succeeded: ping.success(),
            name_resolution_succeeded: resolved,
            resolved_addresses: if resolved {
                parse_ahosts(&lookup.stdout)
            } else {
                Vec::new()
            },
        })
    }
}

fn ensure_found(program: &str, out: &CommandOutput) -> Result<(), RnetprobeError> {
    if out.status == Some(STATUS_NOT_FOUND) {
        return Err(RnetprobeError::Probe(format!(
            "'{program}' is not available on the remote host"
        )));
    }
    Ok(())
}

/// Addresses listed by `getent ahosts`, first column, de-duplicated in
/// output order.
pub fn parse_ahosts(stdout: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for addr in stdout.lines().filter_map(|l| l.split_whitespace().next()) {
        if !out.iter().any(|a| a == addr) {
            out.push(addr.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    const AHOSTS: &str = "1.1.1.1         STREAM one.one.one.one\n\
                          1.1.1.1         DGRAM  \n\
                          1.1.1.1         RAW    \n\
                          1.0.0.1         STREAM \n\
                          1.0.0.1         DGRAM  \n\
                          2606:4700:4700::1111 STREAM \n";

    #[test]
    fn ahosts_keeps_resolution_order_without_duplicates() {
        assert_eq!(
            parse_ahosts(AHOSTS),
            vec!["1.1.1.1", "1.0.0.1", "2606:4700:4700::1111"]
        );
    }

    #[test]
    fn ahosts_empty_output_gives_no_addresses() {
        assert!(parse_ahosts("").is_empty());
        assert!(parse_ahosts("\n\n").is_empty());
    }

    /// Session answering each program with a canned output, in call order.
    struct ScriptedSession {
        replies: Mutex<Script>,
    }

    impl ScriptedSession {
        fn new(replies: Script) -> Self {
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    fn exited(status: i32, stdout: &str) -> Result<CommandOutput, RnetprobeError> {
        Ok(CommandOutput {
            status: Some(status),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    #[async_trait]
    impl Session for ScriptedSession {
        fn host(&self) -> &str {
            "scripted"
        }

        async fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, RnetprobeError> {
            assert_eq!(args.last().copied(), Some("one.one.one.one"));
            let mut replies = self.replies.lock().unwrap();
            assert!(!replies.is_empty(), "unexpected call to {program}");
            let (expected, reply) = replies.remove(0);
            assert_eq!(program, expected);
            reply
        }

        async fn close(self: Box<Self>) -> Result<(), RnetprobeError> {
            Ok(())
        }
    }

    type Script = Vec<(&'static str, Result<CommandOutput, RnetprobeError>)>;

    async fn run(replies: Script) -> Result<ProbeReport, RnetprobeError> {
        let session = ScriptedSession::new(replies);
        CommandProbe::default()
            .probe(&session, "one.one.one.one")
            .await
    }

    #[tokio::test]
    async fn reachable_host_reports_addresses() {
        let report = run(vec![("ping", exited(0, "")), ("getent", exited(0, AHOSTS))])
            .await
            .unwrap();
        assert!(report.ping_succeeded);
        assert!(report.name_resolution_succeeded);
        assert_eq!(report.resolved_addresses.len(), 3);
    }

    #[tokio::test]
    async fn failed_ping_still_looks_up_the_name() {
        let report = run(vec![("ping", exited(1, "")), ("getent", exited(0, AHOSTS))])
            .await
            .unwrap();
        assert!(!report.ping_succeeded);
        assert!(report.name_resolution_succeeded);
    }

    #[tokio::test]
    async fn unknown_name_clears_resolution_and_addresses() {
        let report = run(vec![("ping", exited(2, "")), ("getent", exited(2, ""))])
            .await
            .unwrap();
        assert!(!report.ping_succeeded);
        assert!(!report.name_resolution_succeeded);
        assert!(report.resolved_addresses.is_empty());
    }

    #[tokio::test]
    async fn empty_lookup_output_is_resolved_without_addresses() {
        let report = run(vec![("ping", exited(0, "")), ("getent", exited(0, ""))])
            .await
            .unwrap();
        assert!(report.name_resolution_succeeded);
        assert!(report.resolved_addresses.is_empty());
    }

    #[tokio::test]
    async fn missing_utility_is_an_error() {
        let err = run(vec![("ping", exited(STATUS_NOT_FOUND, ""))])
            .await
            .unwrap_err();
        assert!(matches!(err, RnetprobeError::Probe(msg) if msg.contains("'ping'")));

        let err = run(vec![("ping", exited(0, "")), ("getent", exited(STATUS_NOT_FOUND, ""))])
            .await
            .unwrap_err();
        assert!(matches!(err, RnetprobeError::Probe(msg) if msg.contains("'getent'")));
    }

    #[tokio::test]
    async fn lost_connection_is_an_error() {
        let lost = Err(RnetprobeError::Probe("connection closed".into()));
        let err = run(vec![("ping", exited(0, "")), ("getent", lost)])
            .await
            .unwrap_err();
        assert!(matches!(err, RnetprobeError::Probe(_)));
    }
}
