//! OpenSSH transport.
//!
//! `open` starts a multiplexing master connection (`ssh -M -N -f`) bound to a
//! private control socket; commands reuse that connection and `close` asks the
//! master to exit (`ssh -O exit`). Authentication is left to the operator's
//! ssh agent and config; `BatchMode` keeps ssh from prompting.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::transport::{CommandOutput, Session, Transport};
use crate::error::RnetprobeError;

/// Exit status ssh itself uses for connection-level failures.
const SSH_CONNECTION_ERROR: i32 = 255;

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug)]
pub struct SshOptions {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub connect_timeout: Duration,
    /// Directory holding control sockets.
    pub control_dir: PathBuf,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            user: None,
            port: None,
            connect_timeout: Duration::from_secs(10),
            control_dir: std::env::temp_dir(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SshTransport {
    opts: SshOptions,
}

impl SshTransport {
    pub fn new(opts: SshOptions) -> Self {
        Self { opts }
    }

    fn control_path(&self) -> PathBuf {
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        self.opts
            .control_dir
            .join(format!("rnetprobe-{}-{}.sock", std::process::id(), seq))
    }

    fn base_args(&self, control_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.opts.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
        ];
        if let Some(user) = &self.opts.user {
            args.push("-l".into());
            args.push(user.clone());
        }
        if let Some(port) = self.opts.port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        args
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn open(&self, host: &str) -> Result<Box<dyn Session>, RnetprobeError> {
        if host.starts_with('-') {
            return Err(RnetprobeError::Session(format!(
                "refusing host name that looks like an option: '{host}'"
            )));
        }
        let control_path = self.control_path();
        let base = self.base_args(&control_path);
        debug!(host, control = %control_path.display(), "opening ssh master");
        // The backgrounded master inherits stdio; a pipe would never reach
        // EOF, so stderr goes to a scratch file instead.
        let err_path = control_path.with_extension("err");
        let err_file = std::fs::File::create(&err_path)
            .map_err(|e| RnetprobeError::Session(format!("cannot create {}: {e}", err_path.display())))?;
        let mut pending = PendingMaster {
            host: host.to_string(),
            base,
            control_path,
            err_path,
            armed: true,
        };
        let status = Command::new("ssh")
            .args(&pending.base)
            .args(["-o", "ControlMaster=yes", "-M", "-N", "-f", host])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(err_file))
            .kill_on_drop(true)
            .status()
            .await;
        match status {
            Ok(status) if status.success() => Ok(Box::new(pending.into_session())),
            Ok(_) => {
                pending.armed = false;
                Err(RnetprobeError::Session(first_line_or(
                    &pending.stderr(),
                    "ssh exited without a reason",
                )))
            }
            Err(e) => {
                pending.armed = false;
                Err(RnetprobeError::Session(format!("cannot run ssh: {e}")))
            }
        }
    }
}

/// Master connection requested but not yet handed to a session.
///
/// Dropped while armed (the open was abandoned mid-flight), it asks any
/// master that got as far as the background to exit. The scratch stderr
/// file is removed either way.
#[derive(Debug)]
struct PendingMaster {
    host: String,
    base: Vec<String>,
    control_path: PathBuf,
    err_path: PathBuf,
    armed: bool,
}

impl PendingMaster {
    fn stderr(&self) -> String {
        std::fs::read_to_string(&self.err_path).unwrap_or_default()
    }

    fn exit_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new("ssh");
        cmd.args(&self.base)
            .args(["-O", "exit", self.host.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    fn into_session(mut self) -> SshSession {
        self.armed = false;
        SshSession {
            host: std::mem::take(&mut self.host),
            base: std::mem::take(&mut self.base),
            control_path: std::mem::take(&mut self.control_path),
        }
    }
}

impl Drop for PendingMaster {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.err_path);
        if !self.armed {
            return;
        }
        warn!(host = %self.host, "ssh open abandoned, stopping its master");
        let mut cmd = self.exit_command();
        let control_path = self.control_path.clone();
        std::thread::spawn(move || {
            let _ = cmd.status();
            let _ = std::fs::remove_file(control_path);
        });
    }
}

#[derive(Debug)]
pub struct SshSession {
    host: String,
    base: Vec<String>,
    control_path: PathBuf,
}

#[async_trait]
impl Session for SshSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, program: &str, args: &[&str]) -> Result<CommandOutput, RnetprobeError> {
        let remote = std::iter::once(program)
            .chain(args.iter().copied())
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ");
        debug!(host = %self.host, %remote, "ssh exec");
        let out = Command::new("ssh")
            .args(&self.base)
            .args([self.host.as_str(), remote.as_str()])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RnetprobeError::Probe(format!("cannot run ssh: {e}")))?;
        connection_checked(CommandOutput::from(out))
    }

    async fn close(self: Box<Self>) -> Result<(), RnetprobeError> {
        debug!(host = %self.host, "closing ssh master");
        let out = Command::new("ssh")
            .args(&self.base)
            .args(["-O", "exit", self.host.as_str()])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RnetprobeError::Session(format!("cannot run ssh: {e}")))?;
        // The master removes its socket on exit; clear leftovers from a dead one.
        let _ = std::fs::remove_file(&self.control_path);
        if out.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&out.stderr);
            Err(RnetprobeError::Session(first_line_or(
                &stderr,
                "control master did not exit",
            )))
        }
    }
}

/// Status 255 is ssh's own failure, never the remote command's.
fn connection_checked(out: CommandOutput) -> Result<CommandOutput, RnetprobeError> {
    if out.status == Some(SSH_CONNECTION_ERROR) {
        return Err(RnetprobeError::Probe(first_line_or(
            &out.stderr,
            "ssh connection lost",
        )));
    }
    Ok(out)
}

/// Quote one word for a POSIX remote shell.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./:=@,".contains(&b))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

fn first_line_or(text: &str, fallback: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
