//! Human-readable output: the diagnostic lines and a final error line.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use ext4cp_core::EntryKind;
use ext4cp_core::ExtractionObserver;
use ext4cp_core::ExtractionReport;
use ext4cp_core::LogicalPath;
use ext4cp_core::volume::VolumeInfo;

/// Verbosity at which a summary follows a successful run.
const SUMMARY_VERBOSITY: u8 = 3;

pub struct HumanFormatter {
    verbosity: u8,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn volume_line(image: &str, info: &VolumeInfo) -> String {
        format!(
            "{image}, Volume {} has block size {}",
            info.uuid, info.block_size
        )
    }

    fn entry_line(parent: &LogicalPath, name: &str) -> String {
        format!("{parent}/{name}")
    }

    fn omitted_line(image: &str, parent: &LogicalPath, name: &str) -> String {
        format!("{image}: -R not specified; omitting directory '{parent}/{name}'")
    }
}

impl ExtractionObserver for HumanFormatter {
    fn on_volume_opened(&mut self, image: &str, info: &VolumeInfo) {
        let _ = self.term.write_line(&Self::volume_line(image, info));
    }

    fn on_entry(&mut self, parent: &LogicalPath, name: &str, _kind: EntryKind) {
        let _ = self.term.write_line(&Self::entry_line(parent, name));
    }

    fn on_directory_omitted(&mut self, image: &str, parent: &LogicalPath, name: &str) {
        let _ = self.term.write_line(&Self::omitted_line(image, parent, name));
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        if self.verbosity < SUMMARY_VERBOSITY {
            return Ok(());
        }

        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} Extraction complete",
                style("✓").green().bold()
            ));
        } else {
            let _ = self.term.write_line("Extraction complete");
        }

        let _ = self
            .term
            .write_line(&format!("  Files extracted: {}", report.files_extracted));
        let _ = self
            .term
            .write_line(&format!("  Directories: {}", report.directories_created));
        let _ = self
            .term
            .write_line(&format!("  Special files: {}", report.placeholders_created));
        let _ = self.term.write_line(&format!(
            "  Symlinks: {} ({} already present)",
            report.symlinks_created, report.symlinks_skipped
        ));
        if report.directories_omitted > 0 {
            let _ = self.term.write_line(&format!(
                "  Directories omitted: {}",
                report.directories_omitted
            ));
        }
        if report.entries_renamed > 0 {
            let _ = self
                .term
                .write_line(&format!("  Renamed: {}", report.entries_renamed));
        }
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(report.bytes_written)
        ));
        let _ = self
            .term
            .write_line(&format!("  Duration: {:?}", report.duration));

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always shown, whatever the verbosity.
        let _ = self.term.write_line(&format!("Error: {error}"));
    }
}
