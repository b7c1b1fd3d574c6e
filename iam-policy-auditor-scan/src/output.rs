//! Result persistence: CSV (tabular) or JSON (hierarchical).
//!
//! The persisted document is the ORIGINAL pre-redaction one, alongside the
//! mapping rendering, so an auditor can reconstruct exactly what was
//! substituted. That trades a confidentiality leak in the on-disk artifact
//! for auditability; revisit if the artifact ever leaves the account owner.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ScanError, ScanResult};
use crate::record::PolicyRecord;
use crate::verdict::Verdict;

/// Fixed CSV column order; downstream tooling depends on these names.
pub const CSV_HEADER: [&str; 7] = [
    "account",
    "name",
    "arn",
    "version",
    "vulnerable",
    "policy",
    "mappings",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// JSON entry: the CSV fields plus the derived tri-state verdict.
#[derive(Serialize)]
struct JsonEntry<'a> {
    account: &'a str,
    name: &'a str,
    arn: &'a str,
    version: &'a str,
    vulnerable: &'a str,
    policy: &'a str,
    mappings: String,
    verdict: Verdict,
}

impl<'a> JsonEntry<'a> {
    fn from_record(record: &'a PolicyRecord) -> Self {
        Self {
            account: &record.account,
            name: &record.name,
            arn: &record.arn,
            version: &record.version,
            vulnerable: record.ai_response.as_deref().unwrap_or(""),
            policy: &record.original_document,
            mappings: record.mapping_summary(),
            verdict: record.verdict(),
        }
    }
}

/// Default output location: `cache/{account}_{utc-minute}.{ext}`.
pub fn default_output_path(account: &str, now: DateTime<Utc>, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!(
        "cache/{account}_{}.{}",
        now.format("%Y-%m-%d-%H%MZ"),
        format.extension()
    ))
}

/// Persist records to `path`, creating parent directories as needed.
/// CSV appends rows under the existing header when the file already
/// exists; JSON rewrites the file as a whole (an appended JSON fragment
/// would not parse).
pub fn write_results(
    path: &Path,
    records: &[PolicyRecord],
    format: OutputFormat,
) -> ScanResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| ScanError::Output(format!("failed to create '{}': {e}", parent.display())))?;
        }
    }

    log::info!("Saving scan: {}", path.display());

    match format {
        OutputFormat::Csv => write_csv(path, records),
        OutputFormat::Json => write_json(path, records),
    }
}

fn write_csv(path: &Path, records: &[PolicyRecord]) -> ScanResult<()> {
    let new_file = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ScanError::Output(format!("failed to open '{}': {e}", path.display())))?;

    let mut writer = csv::Writer::from_writer(file);
    if new_file {
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| ScanError::Output(format!("failed to write header: {e}")))?;
    }
    for record in records {
        let mappings = record.mapping_summary();
        writer
            .write_record([
                record.account.as_str(),
                record.name.as_str(),
                record.arn.as_str(),
                record.version.as_str(),
                record.ai_response.as_deref().unwrap_or(""),
                record.original_document.as_str(),
                mappings.as_str(),
            ])
            .map_err(|e| {
                ScanError::Output(format!("failed to write row for '{}': {e}", record.name))
            })?;
    }
    writer
        .flush()
        .map_err(|e| ScanError::Output(format!("failed to flush '{}': {e}", path.display())))
}

fn write_json(path: &Path, records: &[PolicyRecord]) -> ScanResult<()> {
    let entries: Vec<JsonEntry<'_>> = records.iter().map(JsonEntry::from_record).collect();
    let file = File::create(path)
        .map_err(|e| ScanError::Output(format!("failed to create '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &entries)
        .map_err(|e| ScanError::Output(format!("failed to serialize results: {e}")))?;
    writer
        .flush()
        .map_err(|e| ScanError::Output(format!("failed to flush '{}': {e}", path.display())))
}
