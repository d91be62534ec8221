use console::style;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::registry::LookupSpan;

/// Compact event format: a colored marker, then the event fields.
pub struct MarkerFormatter;

impl<S, N> FormatEvent<S, N> for MarkerFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let marker = match *event.metadata().level() {
            Level::TRACE => style("[ ]").dim(),
            Level::DEBUG => style("[?]").blue(),
            Level::INFO => style("[+]").green().bold(),
            Level::WARN => style("[*]").yellow().bold(),
            Level::ERROR => style("[-]").red().bold(),
        };
        write!(writer, "{} ", marker.for_stderr())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}: ", span.name())?;
            }
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "rnetprobe=debug"
    } else {
        "rnetprobe=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(MarkerFormatter)
        .init();
}
