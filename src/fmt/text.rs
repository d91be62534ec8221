use console::style;

use crate::domain::probe::{ProbeResult, SkipReason};
use crate::stats::BatchSummary;

fn verdict(ok: bool) -> String {
    if ok {
        style("ok").green().to_string()
    } else {
        style("failed").red().to_string()
    }
}

/// Render a probe result for the terminal.
pub fn render_probe(r: &ProbeResult) -> String {
    let addrs = if r.resolved_addresses().is_empty() {
        style("-").dim().to_string()
    } else {
        style(r.joined_addresses()).green().to_string()
    };
    format!(
        "{host_lbl} {host_val}\n\
         {ping_lbl} {ping_val}\n\
         {dns_lbl} {dns_val}\n\
         {addr_lbl} {addr_val}",
        host_lbl = style("Host:").cyan().bold(),
        host_val = style(r.host()).green(),
        ping_lbl = style("Ping:").cyan().bold(),
        ping_val = verdict(r.ping_succeeded()),
        dns_lbl = style("Name Resolution:").cyan().bold(),
        dns_val = verdict(r.name_resolution_succeeded()),
        addr_lbl = style("Resolved Addresses:").cyan().bold(),
        addr_val = addrs,
    )
}

/// One-line notice for a host that produced no result.
pub fn render_failure(host: &str, reason: &SkipReason) -> String {
    format!(
        "{} {}: {}",
        style("[-]").red().bold(),
        style(host).red().bold(),
        style(reason).red()
    )
}

pub fn render_summary(s: &BatchSummary) -> String {
    let mut out = format!(
        "{} {} host(s): {} probed, {} skipped (ping ok: {}, dns ok: {})",
        style("Summary:").cyan().bold(),
        s.hosts,
        style(s.probed).green(),
        if s.skipped > 0 {
            style(s.skipped).red()
        } else {
            style(s.skipped)
        },
        s.ping_ok,
        s.dns_ok
    );
    if s.cancelled > 0 {
        out.push_str(&format!(
            ", {}",
            style(format!("{} cancelled", s.cancelled)).yellow()
        ));
    }
    out
}
