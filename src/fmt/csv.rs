//! Delimited rendering of probe results.
//!
//! Fields are comma separated and quoted only when they contain a comma, a
//! quote or a line break (RFC 4180). The address list is a single field,
//! joined with `;`.

use std::borrow::Cow;

use crate::domain::probe::ProbeResult;
use crate::error::RnetprobeError;

pub const HEADER: &str = "host,ping_succeeded,name_resolution_succeeded,resolved_addresses";

const COLUMNS: usize = 4;

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One record as a CSV line, without the trailing newline.
pub fn encode_row(r: &ProbeResult) -> String {
    format!(
        "{},{},{},{}",
        escape(r.host()),
        r.ping_succeeded(),
        r.name_resolution_succeeded(),
        escape(&r.joined_addresses())
    )
}

fn parse_bool(field: &str, line: usize) -> Result<bool, RnetprobeError> {
    match field.trim() {
        f if f.eq_ignore_ascii_case("true") => Ok(true),
        f if f.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(RnetprobeError::Parse(format!(
            "line {line}: expected true/false, got '{other}'"
        ))),
    }
}

/// Split a document into records of raw fields, honouring quoted fields.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, RnetprobeError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) => {
                fields.push(std::mem::take(&mut field));
                if !(fields.len() == 1 && fields[0].is_empty()) {
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                line += 1;
                record_line = line;
            }
            (c, _) => {
                if c == '\n' {
                    line += 1;
                }
                field.push(c);
            }
        }
    }
    if in_quotes {
        return Err(RnetprobeError::Parse(format!(
            "line {record_line}: unterminated quoted field"
        )));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }
    Ok(records)
}

/// Parse a whole CSV document back into records. Header lines are skipped
/// wherever they appear.
pub fn parse_document(text: &str) -> Result<Vec<ProbeResult>, RnetprobeError> {
    let mut out = Vec::new();
    for (line, fields) in split_records(text)? {
        if fields.join(",") == HEADER {
            continue;
        }
        if fields.len() != COLUMNS {
            return Err(RnetprobeError::Parse(format!(
                "line {line}: expected {COLUMNS} fields, got {}",
                fields.len()
            )));
        }
        out.push(ProbeResult::new(
            fields[0].clone(),
            parse_bool(&fields[1], line)?,
            parse_bool(&fields[2], line)?,
            ProbeResult::split_addresses(&fields[3]),
        ));
    }
    Ok(out)
}
