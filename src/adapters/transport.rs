//! Remote execution capability used by the probe runner.
//!
//! A [`Transport`] turns a host identifier into an open [`Session`]. Sessions
//! run commands on the host they were opened for and must be closed exactly
//! once; [`Session::close`] consumes the handle so a closed session cannot be
//! reused.

use async_trait::async_trait;

use crate::error::RnetprobeError;

/// Captured result of a command run inside a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session bound to `host`.
    async fn open(&self, host: &str) -> Result<Box<dyn Session>, RnetprobeError>;
}

#[async_trait]
pub trait Session: Send + Sync {
    fn host(&self) -> &str;

    /// Run `program` with `args` on the remote host and capture its output.
    /// A non-zero exit status is not an error.
    async fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, RnetprobeError>;

    /// Release the session.
    async fn close(self: Box<Self>) -> Result<(), RnetprobeError>;
}

impl From<std::process::Output> for CommandOutput {
    fn from(out: std::process::Output) -> Self {
        CommandOutput {
            status: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }
}
