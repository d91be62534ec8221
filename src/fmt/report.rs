//! Flat, human readable list used by the text file sink.

use crate::domain::probe::ProbeResult;

const LABELS: [&str; 4] = [
    "Host",
    "PingSucceeded",
    "NameResolutionSucceeded",
    "ResolvedAddresses",
];

/// One record as an aligned `Label : value` block followed by a blank line.
pub fn render_block(r: &ProbeResult) -> String {
    let width = LABELS.iter().map(|l| l.len()).max().unwrap_or(0);
    let values = [
        r.host().to_string(),
        r.ping_succeeded().to_string(),
        r.name_resolution_succeeded().to_string(),
        r.joined_addresses(),
    ];
    let mut out = String::new();
    for (label, value) in LABELS.iter().zip(values) {
        out.push_str(&format!("{label:<width$} : {value}\n"));
    }
    out.push('\n');
    out
}
