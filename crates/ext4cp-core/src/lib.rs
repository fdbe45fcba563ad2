//! Extraction engine for copying files out of ext2/3/4 disk images.
//!
//! `ext4cp-core` reads a filesystem image without mounting it and
//! reproduces selected files, directories, and symlinks on the host. It
//! resolves slash-separated paths inside the image, walks directory trees
//! in on-disk order, and materializes each entry, optionally flattening
//! the hierarchy into a single directory or renaming on conflict.
//!
//! # Examples
//!
//! ```no_run
//! use ext4cp_core::DestDir;
//! use ext4cp_core::ExtractConfig;
//! use ext4cp_core::NoopObserver;
//! use ext4cp_core::extract_image;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dest = DestDir::new("/output/dir")?;
//! let config = ExtractConfig {
//!     recursive: true,
//!     ..ExtractConfig::new("system.img")
//! };
//! let report = extract_image("system.img", &["etc"], &dest, &config, &mut NoopObserver)?;
//! println!("Extracted {} files", report.files_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod ext4;
pub mod extraction;
pub mod report;
pub mod source;
pub mod types;
pub mod volume;

// Re-export main API types
pub use api::extract_image;
pub use api::extract_paths;
pub use config::ExtractConfig;
pub use config::PathStyle;
pub use error::ExtractionError;
pub use error::Result;
pub use report::ExtractionObserver;
pub use report::ExtractionReport;
pub use report::NoopObserver;
pub use report::RecordingObserver;
pub use source::SourceSpec;
pub use source::parse_sources;

// Re-export types module for easier access
pub use types::DestDir;
pub use types::EntryKind;
pub use types::LogicalPath;
