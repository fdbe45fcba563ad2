//! High-level public API for image extraction.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use crate::DestDir;
use crate::ExtractConfig;
use crate::ExtractionError;
use crate::ExtractionObserver;
use crate::ExtractionReport;
use crate::Result;
use crate::ext4::Ext4Volume;
use crate::extraction::Materializer;
use crate::extraction::extract_target;
use crate::extraction::resolve;
use crate::volume::Volume;

/// Extracts target paths from an already opened volume.
///
/// Each target is resolved from the volume root and extracted in turn. A
/// target that fails to resolve does not stop the others; once every target
/// has been tried, the first resolution failure is returned. Any other error
/// (image read failure, host write failure) stops the run immediately.
///
/// # Errors
///
/// Returns the first resolution error, or the first I/O or image error.
///
/// # Examples
///
/// ```no_run
/// use ext4cp_core::DestDir;
/// use ext4cp_core::ExtractConfig;
/// use ext4cp_core::NoopObserver;
/// use ext4cp_core::extract_paths;
/// use ext4cp_core::volume::MemoryVolume;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut volume = MemoryVolume::new();
/// volume.insert_file("etc/hostname", b"device\n")?;
///
/// let dest = DestDir::new("/tmp/out")?;
/// let config = ExtractConfig::new("memory");
/// let report = extract_paths(&volume, &["etc/hostname"], &dest, &config, &mut NoopObserver)?;
/// assert_eq!(report.files_extracted, 1);
/// # Ok(())
/// # }
/// ```
pub fn extract_paths<V: Volume, S: AsRef<str>>(
    volume: &V,
    targets: &[S],
    dest: &DestDir,
    config: &ExtractConfig,
    observer: &mut dyn ExtractionObserver,
) -> Result<ExtractionReport> {
    let start = Instant::now();
    let mut materializer = Materializer::new(config, dest, observer);
    let mut deferred: Option<ExtractionError> = None;

    for target in targets {
        let resolved = match resolve(volume, volume.root()?, target.as_ref()) {
            Ok(resolved) => resolved,
            Err(e @ (ExtractionError::NotFound { .. } | ExtractionError::NotADirectory { .. })) => {
                deferred.get_or_insert(e);
                continue;
            }
            Err(e) => return Err(e),
        };
        extract_target(volume, resolved, &mut materializer)?;
    }

    if let Some(e) = deferred {
        return Err(e);
    }

    let mut report = materializer.into_report();
    report.duration = start.elapsed();
    Ok(report)
}

/// Opens an ext2/3/4 image file and extracts target paths from it.
///
/// At verbosity 1 and above the observer hears about the opened volume
/// before any target is processed.
///
/// # Errors
///
/// Returns an error if the image cannot be opened or parsed, or any error
/// from [`extract_paths`].
///
/// # Examples
///
/// ```no_run
/// use ext4cp_core::DestDir;
/// use ext4cp_core::ExtractConfig;
/// use ext4cp_core::NoopObserver;
/// use ext4cp_core::extract_image;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::new("/tmp/rootfs")?;
/// let config = ExtractConfig {
///     recursive: true,
///     ..ExtractConfig::new("system.img")
/// };
/// let report = extract_image("system.img", &["."], &dest, &config, &mut NoopObserver)?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn extract_image<P: AsRef<Path>, S: AsRef<str>>(
    image: P,
    targets: &[S],
    dest: &DestDir,
    config: &ExtractConfig,
    observer: &mut dyn ExtractionObserver,
) -> Result<ExtractionReport> {
    let file = File::open(image.as_ref())?;
    let volume = Ext4Volume::open(BufReader::new(file))?;

    if config.reports_notes() {
        observer.on_volume_opened(&config.image_name, &volume.info());
    }

    extract_paths(&volume, targets, dest, config, observer)
}
