//! Validated destination directory type.

use crate::ExtractionError;
use crate::Result;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// The destination root an extraction writes into.
///
/// The directory must already exist; nothing above it is ever created.
/// The path is kept as given (not canonicalized) so destination paths stay
/// recognisable to the caller.
///
/// # Examples
///
/// ```no_run
/// use ext4cp_core::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::new("/tmp/rootfs")?;
/// println!("Extracting to: {}", dest.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Creates a new `DestDir` after checking the path is an existing
    /// directory.
    ///
    /// An empty path means the current working directory.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Io` if the path does not exist or is not a
    /// directory.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let mut path = path.into();
        if path.as_os_str().is_empty() {
            path = PathBuf::from(".");
        }

        if !path.exists() {
            return Err(ExtractionError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("destination directory does not exist: {}", path.display()),
            )));
        }

        if !path.is_dir() {
            return Err(ExtractionError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("destination is not a directory: {}", path.display()),
            )));
        }

        Ok(Self(path))
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}
