//! Extraction reporting and diagnostic callbacks.

use std::time::Duration;

use crate::EntryKind;
use crate::LogicalPath;
use crate::volume::VolumeInfo;

/// Report of an extraction run.
///
/// Contains counters for every host-side action the materializer performed.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Number of regular files written.
    pub files_extracted: usize,

    /// Number of destination directories created.
    pub directories_created: usize,

    /// Number of empty stand-ins written for devices, FIFOs and sockets.
    pub placeholders_created: usize,

    /// Number of symbolic links created.
    pub symlinks_created: usize,

    /// Number of symbolic links left alone because one already existed.
    pub symlinks_skipped: usize,

    /// Number of directories skipped because recursion was off.
    pub directories_omitted: usize,

    /// Number of entries written under a `_N`-suffixed name.
    pub entries_renamed: usize,

    /// Total file bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the run.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of destination entries created.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted
            + self.directories_created
            + self.placeholders_created
            + self.symlinks_created
    }
}

/// Callback trait for diagnostics emitted during extraction.
///
/// The engine never prints. Whether an event is emitted at all is decided by
/// the configured verbosity; implementations only decide how to render it.
///
/// # Examples
///
/// ```
/// use ext4cp_core::EntryKind;
/// use ext4cp_core::ExtractionObserver;
/// use ext4cp_core::LogicalPath;
/// use ext4cp_core::volume::VolumeInfo;
///
/// struct PrintObserver;
///
/// impl ExtractionObserver for PrintObserver {
///     fn on_volume_opened(&mut self, image: &str, info: &VolumeInfo) {
///         println!("{image}, Volume {} has block size {}", info.uuid, info.block_size);
///     }
///
///     fn on_entry(&mut self, parent: &LogicalPath, name: &str, _kind: EntryKind) {
///         println!("{parent}/{name}");
///     }
///
///     fn on_directory_omitted(&mut self, image: &str, parent: &LogicalPath, name: &str) {
///         println!("{image}: -R not specified; omitting directory '{parent}/{name}'");
///     }
/// }
/// ```
pub trait ExtractionObserver {
    /// Called once after the image has been opened.
    fn on_volume_opened(&mut self, image: &str, info: &VolumeInfo);

    /// Called for every entry that is materialized on the host.
    ///
    /// `parent` is the entry's containing path relative to the traversal
    /// root.
    fn on_entry(&mut self, parent: &LogicalPath, name: &str, kind: EntryKind);

    /// Called when a directory is skipped because recursion is off.
    fn on_directory_omitted(&mut self, image: &str, parent: &LogicalPath, name: &str);
}

/// No-op implementation of `ExtractionObserver`.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {
    fn on_volume_opened(&mut self, _image: &str, _info: &VolumeInfo) {}

    fn on_entry(&mut self, _parent: &LogicalPath, _name: &str, _kind: EntryKind) {}

    fn on_directory_omitted(&mut self, _image: &str, _parent: &LogicalPath, _name: &str) {}
}

/// Observer that records every event as a formatted line.
///
/// Handy for tests and for callers that want to post-process diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    /// Recorded lines, in emission order.
    pub lines: Vec<String>,
}

impl ExtractionObserver for RecordingObserver {
    fn on_volume_opened(&mut self, image: &str, info: &VolumeInfo) {
        self.lines.push(format!(
            "{image}, Volume {} has block size {}",
            info.uuid, info.block_size
        ));
    }

    fn on_entry(&mut self, parent: &LogicalPath, name: &str, _kind: EntryKind) {
        self.lines.push(format!("{parent}/{name}"));
    }

    fn on_directory_omitted(&mut self, image: &str, parent: &LogicalPath, name: &str) {
        self.lines.push(format!(
            "{image}: -R not specified; omitting directory '{parent}/{name}'"
        ));
    }
}
