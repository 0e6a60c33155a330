//! CSV and JSON output of enriched issues

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::enrich::EnrichedIssue;
use crate::{Error, Result};

/// Output serialization format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Pick a format from a file extension; anything but `.json` is CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::Config(format!(
                "Unknown output format '{}'. Expected csv or json",
                other
            ))),
        }
    }
}

/// Serialize records into a buffer
///
/// CSV always carries the header row, also for zero records.
pub fn render(records: &[EnrichedIssue], format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(Vec::new());
            writer.write_record(EnrichedIssue::FIELDS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.into_inner().map_err(|e| Error::Io(e.into_error()))
        }
        OutputFormat::Json => {
            let mut buf = serde_json::to_vec_pretty(records)?;
            buf.push(b'\n');
            Ok(buf)
        }
    }
}

/// Write records to a file, or stdout when no path is given
///
/// The whole document is rendered before anything is written.
pub fn write_output(
    records: &[EnrichedIssue],
    format: OutputFormat,
    path: Option<&Path>,
) -> Result<()> {
    let buf = render(records, format)?;

    match path {
        Some(path) => {
            std::fs::write(path, &buf)?;
            info!(
                path = %path.display(),
                count = records.len(),
                %format,
                "Wrote enriched issues"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&buf)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
