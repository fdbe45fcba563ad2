//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use ext4cp_core::EntryKind;
use ext4cp_core::ExtractionObserver;
use ext4cp_core::ExtractionReport;
use ext4cp_core::LogicalPath;
use ext4cp_core::volume::VolumeInfo;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct ExtractionOutput {
    files_extracted: usize,
    directories_created: usize,
    placeholders_created: usize,
    symlinks_created: usize,
    symlinks_skipped: usize,
    directories_omitted: usize,
    entries_renamed: usize,
    bytes_written: u64,
    duration_ms: u128,
}

impl From<&ExtractionReport> for ExtractionOutput {
    fn from(report: &ExtractionReport) -> Self {
        Self {
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            placeholders_created: report.placeholders_created,
            symlinks_created: report.symlinks_created,
            symlinks_skipped: report.symlinks_skipped,
            directories_omitted: report.directories_omitted,
            entries_renamed: report.entries_renamed,
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

// Diagnostics would corrupt the document; only the result is printed.
impl ExtractionObserver for JsonFormatter {
    fn on_volume_opened(&mut self, _image: &str, _info: &VolumeInfo) {}

    fn on_entry(&mut self, _parent: &LogicalPath, _name: &str, _kind: EntryKind) {}

    fn on_directory_omitted(&mut self, _image: &str, _parent: &LogicalPath, _name: &str) {}
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        let output = JsonOutput::success("extract", ExtractionOutput::from(report));
        Self::output(&output)
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("extract", error.to_string());
        let _ = Self::output(&output);
    }
}
