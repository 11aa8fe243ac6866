//! Job files: a TOML list of `[[job]]` tables,
//!
//! ```toml
//! [[job]]
//! name = "Sunset Clip"
//! url = "https://media.example.com/v/8812"
//! extension = "mp4"
//! segments = 6        # optional
//! ```
//!
//! or, for files ending in `.csv`, a table with a header row. Columns are
//! matched by name (`name`/`nombre`, `url`/`enlace`, `extension`, optional
//! `segments`), so their order does not matter:
//!
//! ```text
//! nombre,enlace,extension
//! "Sunset Clip",https://media.example.com/v/8812,mp4
//! ```

use anyhow::{Context, Result};
use segfetch_core::{JobDescriptor, TransferJob};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default, rename = "job")]
    jobs: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(default, alias = "nombre")]
    name: String,
    #[serde(default, alias = "enlace")]
    url: String,
    #[serde(default)]
    extension: String,
    #[serde(default)]
    segments: Option<usize>,
}

/// Parse a TOML job file. Entries with an empty name, url or extension are skipped.
pub fn parse_jobs(text: &str) -> Result<Vec<TransferJob>> {
    let manifest: Manifest = toml::from_str(text).context("parse job file")?;
    Ok(into_jobs(manifest.jobs))
}

/// Parse a CSV job list with a header row. Short rows and rows with an empty
/// name, url or extension are skipped; blank lines are ignored.
pub fn parse_csv_jobs(input: impl Read) -> Result<Vec<TransferJob>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut entries = Vec::new();
    for (i, row) in reader.deserialize::<ManifestEntry>().enumerate() {
        match row {
            Ok(entry) => entries.push(entry),
            Err(e) if e.is_io_error() => return Err(e).context("read job rows"),
            Err(e) => tracing::warn!(row = i + 1, error = %e, "skipping malformed job row"),
        }
    }
    Ok(into_jobs(entries))
}

fn into_jobs(entries: Vec<ManifestEntry>) -> Vec<TransferJob> {
    let mut jobs = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let Some(desc) = JobDescriptor::new(&entry.name, &entry.url, &entry.extension) else {
            tracing::warn!(entry = i + 1, "skipping job with an empty name, url or extension");
            continue;
        };
        let job = TransferJob::from(desc).with_segments(entry.segments.unwrap_or(0));
        jobs.push(job);
    }
    jobs
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Loads a job file, picking the format from the extension (`.csv` or TOML).
pub fn load_jobs(path: &Path) -> Result<Vec<TransferJob>> {
    if is_csv(path) {
        let file = std::fs::File::open(path)
            .with_context(|| format!("read job file {}", path.display()))?;
        return parse_csv_jobs(std::io::BufReader::new(file))
            .with_context(|| format!("in {}", path.display()));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read job file {}", path.display()))?;
    parse_jobs(&text).with_context(|| format!("in {}", path.display()))
}
