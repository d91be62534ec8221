//! Transport that runs commands on the local machine.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::transport::{CommandOutput, Session, Transport};
use crate::error::RnetprobeError;

const LOCAL_NAMES: &[&str] = &["localhost", "127.0.0.1", "::1", "."];

/// Accepts only loopback names; anything else is refused at `open`.
#[derive(Clone, Debug, Default)]
pub struct LocalTransport;

pub fn is_local_host(host: &str) -> bool {
    LOCAL_NAMES.iter().any(|n| n.eq_ignore_ascii_case(host))
}

#[async_trait]
impl Transport for LocalTransport {
    async fn open(&self, host: &str) -> Result<Box<dyn Session>, RnetprobeError> {
        if !is_local_host(host) {
            return Err(RnetprobeError::Session(format!(
                "'{host}' is not a local host name"
            )));
        }
        Ok(Box::new(LocalSession {
            host: host.to_string(),
        }))
    }
}

#[derive(Debug)]
pub struct LocalSession {
    host: String,
}

#[async_trait]
impl Session for LocalSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, RnetprobeError> {
        debug!(program, ?args, "local exec");
        let out = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RnetprobeError::Probe(format!("cannot run '{program}': {e}")))?;
        Ok(out.into())
    }

    async fn close(self: Box<Self>) -> Result<(), RnetprobeError> {
        Ok(())
    }
}
