//! Output sink for probe results.
//!
//! Exactly one [`OutputMode`] is active per sink. `Host` writes records to the
//! terminal; `Csv` and `Text` append them to `{path}/{file_name}.{ext}` and
//! run the configured [`PostAction`] once every record is on disk.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use console::{Term, style};
use tracing::{debug, info, warn};

use crate::domain::probe::ProbeResult;
use crate::error::RnetprobeError;
use crate::fmt::{csv, json, report, text};

pub const DEFAULT_FILE_NAME: &str = "PipeResults";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Records go to the terminal unchanged.
    #[default]
    Host,
    /// Delimited file, one row per record.
    Csv,
    /// Human readable list file.
    Text,
}

impl OutputMode {
    pub fn extension(self) -> Option<&'static str> {
        match self {
            OutputMode::Host => None,
            OutputMode::Csv => Some("csv"),
            OutputMode::Text => Some("txt"),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputMode::Host => "host",
            OutputMode::Csv => "csv",
            OutputMode::Text => "text",
        })
    }
}

impl FromStr for OutputMode {
    type Err = RnetprobeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(OutputMode::Host),
            "csv" | "delimited" => Ok(OutputMode::Csv),
            "text" | "txt" => Ok(OutputMode::Text),
            other => Err(RnetprobeError::Config(format!(
                "invalid output mode '{other}' (expected host, csv or text)"
            ))),
        }
    }
}

/// Rendering of records in `Host` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HostFormat {
    #[default]
    Text,
    /// One JSON object per line, readable by `export`.
    Json,
}

/// What happens once a file sink has written every record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PostAction {
    /// Hand the file to the platform's default application.
    #[default]
    Open,
    /// Print the file path.
    Announce,
    None,
}

#[derive(Clone, Debug)]
pub struct OutputConfig {
    pub mode: OutputMode,
    /// Directory of the output file.
    pub path: PathBuf,
    /// File name without extension.
    pub file_name: String,
    pub host_format: HostFormat,
    pub post_action: PostAction,
}

impl OutputConfig {
    pub fn new(mode: OutputMode, path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            mode,
            path: path.into(),
            file_name: file_name.into(),
            host_format: HostFormat::default(),
            post_action: PostAction::default(),
        }
    }

    /// File written by this configuration, `None` in `Host` mode.
    pub fn destination(&self) -> Option<PathBuf> {
        self.mode
            .extension()
            .map(|ext| self.path.join(format!("{}.{ext}", self.file_name)))
    }
}

/// What a finished sink produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkReport {
    pub mode: OutputMode,
    pub path: Option<PathBuf>,
    pub records: usize,
}

enum Target {
    Host {
        out: Box<dyn Write + Send>,
        format: HostFormat,
    },
    File {
        path: PathBuf,
        file: File,
        mode: OutputMode,
    },
}

pub struct ResultSink {
    target: Target,
    mode: OutputMode,
    post_action: PostAction,
    records: usize,
}

impl ResultSink {
    /// Open the sink, writing `Host` records to stdout.
    pub fn open(config: &OutputConfig) -> Result<Self, RnetprobeError> {
        Self::with_host_writer(config, Box::new(Term::stdout()))
    }

    /// Open the sink with an explicit writer for `Host` mode. File modes
    /// ignore `host_out`.
    ///
    /// File destinations are opened here, so an unwritable path fails before
    /// any record is processed.
    pub fn with_host_writer(
        config: &OutputConfig,
        host_out: Box<dyn Write + Send>,
    ) -> Result<Self, RnetprobeError> {
        let target = match config.destination() {
            None => Target::Host {
                out: host_out,
                format: config.host_format,
            },
            Some(path) => {
                validate_file_name(&config.file_name)?;
                let file = open_append(&path, config.mode)?;
                debug!(path = %path.display(), mode = %config.mode, "sink opened");
                Target::File {
                    path,
                    file,
                    mode: config.mode,
                }
            }
        };
        Ok(Self {
            target,
            mode: config.mode,
            post_action: config.post_action,
            records: 0,
        })
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Render one record. File modes flush after every record so the file
    /// always ends on a record boundary.
    pub fn write(&mut self, r: &ProbeResult) -> Result<(), RnetprobeError> {
        match &mut self.target {
            Target::Host { out, format } => {
                let rendered = match format {
                    HostFormat::Text => format!("{}\n", text::render_probe(r)),
                    HostFormat::Json => json::to_json_line(r)?,
                };
                writeln!(out, "{rendered}")?;
                out.flush()?;
            }
            Target::File { path, file, mode } => {
                let rendered = match mode {
                    OutputMode::Csv => format!("{}\n", csv::encode_row(r)),
                    _ => report::render_block(r),
                };
                file.write_all(rendered.as_bytes())
                    .and_then(|_| file.flush())
                    .map_err(|e| RnetprobeError::sink(path.clone(), e))?;
            }
        }
        self.records += 1;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, records: I) -> Result<(), RnetprobeError>
    where
        I: IntoIterator<Item = &'a ProbeResult>,
    {
        for r in records {
            self.write(r)?;
        }
        Ok(())
    }

    /// Flush and, for file modes, run the post action. Consumes the sink so
    /// the action runs once, after the last write.
    pub fn finish(self) -> Result<SinkReport, RnetprobeError> {
        let path = match self.target {
            Target::Host { mut out, .. } => {
                out.flush()?;
                None
            }
            Target::File { path, file, .. } => {
                file.sync_all()
                    .map_err(|e| RnetprobeError::sink(path.clone(), e))?;
                drop(file);
                info!(path = %path.display(), records = self.records, "results written");
                run_post_action(self.post_action, &path);
                Some(path)
            }
        };
        Ok(SinkReport {
            mode: self.mode,
            path,
            records: self.records,
        })
    }
}

fn validate_file_name(name: &str) -> Result<(), RnetprobeError> {
    if name.trim().is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(RnetprobeError::Config(format!(
            "invalid output file name '{name}'"
        )));
    }
    Ok(())
}

fn open_append(path: &Path, mode: OutputMode) -> Result<File, RnetprobeError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RnetprobeError::sink(path, e))?;
    let empty = file
        .metadata()
        .map_err(|e| RnetprobeError::sink(path, e))?
        .len()
        == 0;
    if mode == OutputMode::Csv && empty {
        writeln!(file, "{}", csv::HEADER).map_err(|e| RnetprobeError::sink(path, e))?;
    }
    Ok(file)
}

fn opener(path: &Path) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

fn run_post_action(action: PostAction, path: &Path) {
    match action {
        PostAction::Open => {
            let spawned = opener(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            if let Err(e) = spawned {
                warn!(path = %path.display(), error = %e, "cannot open results");
            }
        }
        PostAction::Announce => {
            Term::stderr()
                .write_line(&format!(
                    "{} {}",
                    style("Results:").cyan().bold(),
                    style(path.display()).green()
                ))
                .ok();
        }
        PostAction::None => {}
    }
}
