use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use console::{Term, set_colors_enabled, set_colors_enabled_stderr, style};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::signal;
use tracing::debug;

use rnetprobe::adapters::local::LocalTransport;
use rnetprobe::adapters::net_probe::CommandProbe;
use rnetprobe::adapters::ssh::{SshOptions, SshTransport};
use rnetprobe::adapters::transport::Transport;
use rnetprobe::fmt::{self, json};
use rnetprobe::sink::{DEFAULT_FILE_NAME, HostFormat, PostAction};
use rnetprobe::{
    CancelFlag, HostOutcome, OutputConfig, OutputMode, ResultSink, RnetprobeError, RunnerConfig,
    drain_into_sink, outcome_stream,
};

mod config_store;
mod logging;

use config_store::{ConfigStore, Defaults};

const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Host,
    #[value(alias = "delimited")]
    Csv,
    Text,
}

impl From<ModeArg> for OutputMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Host => OutputMode::Host,
            ModeArg::Csv => OutputMode::Csv,
            ModeArg::Text => OutputMode::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    Ssh,
    Local,
}

#[derive(Parser, Debug)]
#[command(name = "rnetprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batched remote connectivity diagnostics")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color", alias = "nocolor", global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe one.one.one.one from every host and render the results
    Probe(ProbeArgs),
    /// Read JSON lines produced by `probe --format json` from stdin and render them
    Export(SinkArgs),
}

#[derive(ClapArgs, Debug)]
struct ProbeArgs {
    /// Hosts to probe, processed in the given order
    #[arg(required = true, num_args = 1.., value_name = "HOST")]
    hosts: Vec<String>,

    /// Per-host timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Hosts probed at once (1 = sequential)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// How sessions are opened
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,

    /// Remote user for ssh
    #[arg(long)]
    ssh_user: Option<String>,

    /// Remote port for ssh
    #[arg(long)]
    ssh_port: Option<u16>,

    #[command(flatten)]
    sink: SinkArgs,
}

#[derive(ClapArgs, Debug)]
struct SinkArgs {
    /// Output destination
    #[arg(short = 'm', long, value_enum, ignore_case = true)]
    mode: Option<ModeArg>,

    /// Directory of the output file (defaults to the home directory)
    #[arg(short = 'p', long)]
    path: Option<PathBuf>,

    /// Output file name without extension
    #[arg(short = 'n', long)]
    file_name: Option<String>,

    /// Terminal rendering in host mode
    #[arg(short = 'f', long, value_enum)]
    format: Option<FormatArg>,

    /// Print the output file path instead of opening it
    #[arg(long)]
    no_open: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let want_color = io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none()
        && !args.no_color;
    set_colors_enabled(want_color);
    set_colors_enabled_stderr(want_color && io::stderr().is_terminal());

    logging::init(args.verbose);
    let err_term = Term::stderr();

    let store = match ConfigStore::load() {
        Ok(store) => store,
        Err(e) => {
            fatal(&err_term, &format!("cannot load {}: {}", config_store::default_path().display(), e));
            process::exit(2);
        }
    };
    debug!(path = %store.path().display(), "configuration loaded");

    let code = match args.command {
        Commands::Probe(probe_args) => run_probe(probe_args, &store.defaults, &err_term).await,
        Commands::Export(sink_args) => run_export(sink_args, &store.defaults, &err_term),
    };
    process::exit(code);
}

fn output_config(sink: &SinkArgs, defaults: &Defaults, host_format: HostFormat) -> OutputConfig {
    let mode = sink
        .mode
        .map(OutputMode::from)
        .or(defaults.mode)
        .unwrap_or_default();
    let path = sink
        .path
        .clone()
        .or_else(|| defaults.path.clone())
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = sink
        .file_name
        .clone()
        .or_else(|| defaults.file_name.clone())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

    let mut config = OutputConfig::new(mode, path, file_name);
    config.host_format = match sink.format {
        Some(FormatArg::Text) => HostFormat::Text,
        Some(FormatArg::Json) => HostFormat::Json,
        None => host_format,
    };
    config.post_action = if sink.no_open {
        PostAction::Announce
    } else {
        PostAction::Open
    };
    config
}

fn build_transport(args: &ProbeArgs, defaults: &Defaults) -> Result<Box<dyn Transport>, RnetprobeError> {
    let kind = match (args.transport, defaults.transport.as_deref()) {
        (Some(kind), _) => kind,
        (None, None) => TransportArg::Ssh,
        (None, Some(name)) => TransportArg::from_str(name, true)
            .map_err(|_| RnetprobeError::Config(format!("invalid transport '{name}' (expected ssh or local)")))?,
    };
    let transport: Box<dyn Transport> = match kind {
        TransportArg::Local => Box::new(LocalTransport),
        TransportArg::Ssh => Box::new(SshTransport::new(SshOptions {
            user: args.ssh_user.clone().or_else(|| defaults.ssh_user.clone()),
            port: args.ssh_port.or(defaults.ssh_port),
            ..SshOptions::default()
        })),
    };
    Ok(transport)
}

async fn run_probe(args: ProbeArgs, defaults: &Defaults, err_term: &Term) -> i32 {
    let timeout = args.timeout.or(defaults.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if !timeout.is_finite() || timeout <= 0.0 {
        fatal(err_term, &format!("timeout must be a positive number of seconds, got {timeout}"));
        return 2;
    }
    let jobs = args.jobs.or(defaults.jobs).unwrap_or(1);
    if jobs == 0 {
        fatal(err_term, "--jobs must be at least 1");
        return 2;
    }
    let transport = match build_transport(&args, defaults) {
        Ok(t) => t,
        Err(e) => return handle_error(err_term, e),
    };
    let runner = RunnerConfig {
        timeout: Duration::from_secs_f64(timeout),
        jobs,
        ..RunnerConfig::default()
    };

    let output = output_config(&args.sink, defaults, HostFormat::Text);
    let mut sink = match ResultSink::open(&output) {
        Ok(sink) => sink,
        Err(e) => return handle_error(err_term, e),
    };

    let cancel = CancelFlag::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let probe = CommandProbe::default();
    let outcomes = outcome_stream(&args.hosts, transport.as_ref(), &probe, &runner, &cancel);
    let summary = match drain_into_sink(outcomes, &mut sink, &cancel, |outcome| {
        if let HostOutcome::Skipped { host, reason } = outcome {
            err_term.write_line(&fmt::text::render_failure(host, reason)).ok();
        }
    })
    .await
    {
        Ok(summary) => summary,
        Err(e) => return handle_error(err_term, e),
    };

    if let Err(e) = sink.finish() {
        return handle_error(err_term, e);
    }
    err_term
        .write_line(&fmt::text::render_summary(&summary))
        .ok();

    if summary.cancelled > 0 { 130 } else { 0 }
}

fn run_export(args: SinkArgs, defaults: &Defaults, err_term: &Term) -> i32 {
    let output = output_config(&args, defaults, HostFormat::Json);
    // Open first: an unwritable destination is reported before stdin is read.
    let mut sink = match ResultSink::open(&output) {
        Ok(sink) => sink,
        Err(e) => return handle_error(err_term, e),
    };
    let records = match json::read_json_lines(io::stdin().lock()) {
        Ok(records) => records,
        Err(e) => return handle_error(err_term, e),
    };
    if let Err(e) = sink.write_all(&records) {
        return handle_error(err_term, e);
    }
    match sink.finish() {
        Ok(report) => {
            debug!(records = report.records, mode = %report.mode, "export finished");
            0
        }
        Err(e) => handle_error(err_term, e),
    }
}

fn fatal(term: &Term, msg: &str) {
    term.write_line(&style(format!("Error: {msg}")).red().bold().to_string())
        .ok();
}

fn handle_error(term: &Term, err: RnetprobeError) -> i32 {
    fatal(term, &err.to_string());
    match err {
        RnetprobeError::Config(_) => 2,
        RnetprobeError::Sink { .. } => 3,
        RnetprobeError::Parse(_) => 4,
        _ => 1,
    }
}
