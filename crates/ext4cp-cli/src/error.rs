//! Error conversion utilities for CLI.
//!
//! Converts ext4cp-core's typed errors (thiserror) into single-line
//! contextual errors (anyhow).

use anyhow::Result;
use anyhow::anyhow;
use ext4cp_core::ExtractionError;
use std::path::Path;

/// Converts `ExtractionError` to a one-line anyhow error naming the image.
///
/// Resolution and usage errors already carry a complete message and pass
/// through unchanged.
pub fn convert_extraction_error(err: ExtractionError, image: &Path) -> anyhow::Error {
    match err {
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                image.display(),
                io_err
            )
        }
        ExtractionError::InvalidImage(reason) => {
            anyhow!(
                "'{}' is not a readable ext2/3/4 image: {}",
                image.display(),
                reason
            )
        }
        ExtractionError::UnsupportedFeature(feature) => {
            anyhow!(
                "Image '{}' uses an unsupported feature: {}",
                image.display(),
                feature
            )
        }
        _ => anyhow::Error::from(err),
    }
}

/// Adds image context to a core result.
pub fn add_image_context<T>(result: Result<T, ExtractionError>, image: &Path) -> Result<T> {
    result.map_err(|e| convert_extraction_error(e, image))
}
