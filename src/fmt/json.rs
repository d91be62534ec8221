//! Newline-delimited JSON, the wire format between `probe` and `export`.

use std::io::BufRead;

use crate::domain::probe::ProbeResult;
use crate::error::RnetprobeError;

/// Serialize one record as a single JSON line (no trailing newline).
#[allow(unused_variables)]
pub fn to_json_line(r: &ProbeResult) -> Result<String, RnetprobeError> {
    #[cfg(feature = "json")]
    {
        Ok(serde_json::to_string(r)?)
    }
    #[cfg(not(feature = "json"))]
    {
        Err(RnetprobeError::Other("json feature disabled".into()))
    }
}

/// Read records from newline-delimited JSON, skipping blank lines.
#[allow(unused_variables)]
pub fn read_json_lines<R: BufRead>(reader: R) -> Result<Vec<ProbeResult>, RnetprobeError> {
    #[cfg(feature = "json")]
    {
        let mut out = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .map_err(|e| RnetprobeError::Parse(format!("line {}: {e}", idx + 1)))?;
            out.push(record);
        }
        Ok(out)
    }
    #[cfg(not(feature = "json"))]
    {
        Err(RnetprobeError::Other("json feature disabled".into()))
    }
}
