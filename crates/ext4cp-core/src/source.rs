//! `IMAGE:PATH` source specifiers.

use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;

/// Target path meaning "the whole starting directory".
pub const WHOLE_DIRECTORY: &str = ".";

/// A parsed `IMAGE:PATH` source specifier.
///
/// # Examples
///
/// ```
/// use ext4cp_core::SourceSpec;
///
/// # fn main() -> Result<(), ext4cp_core::ExtractionError> {
/// let spec = SourceSpec::parse("system.img:/etc/ssh/")?;
/// assert_eq!(spec.image.to_str(), Some("system.img"));
/// assert_eq!(spec.path, "etc/ssh");
///
/// let whole = SourceSpec::parse("system.img")?;
/// assert_eq!(whole.path, ".");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Host path of the image file.
    pub image: PathBuf,
    /// Path inside the image, relative to its root; `.` for everything.
    pub path: String,
}

impl SourceSpec {
    /// Parses a specifier, splitting on the first `:`.
    ///
    /// A missing or empty path part selects the whole image. One trailing
    /// `/` is dropped, and so are leading `/` characters: every path is
    /// taken relative to the image root.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidSource` if the image part is empty.
    pub fn parse(spec: &str) -> Result<Self> {
        let (image, path) = match spec.split_once(':') {
            Some((image, path)) => (image, path),
            None => (spec, WHOLE_DIRECTORY),
        };

        if image.is_empty() {
            return Err(ExtractionError::InvalidSource(format!(
                "'{spec}' does not name an image"
            )));
        }

        let path = path.strip_suffix('/').unwrap_or(path);
        let path = path.trim_start_matches('/');
        let path = if path.is_empty() { WHOLE_DIRECTORY } else { path };

        Ok(Self {
            image: PathBuf::from(image),
            path: path.to_string(),
        })
    }

    /// Returns `true` if this specifier selects the whole image root.
    #[must_use]
    pub fn is_whole_image(&self) -> bool {
        self.path == WHOLE_DIRECTORY
    }
}

/// Parses every specifier and checks they all name the same image.
///
/// Returns the image path and the target paths in argument order.
///
/// # Errors
///
/// Returns `ExtractionError::InvalidSource` if no specifier is given or one
/// cannot be parsed, and `ExtractionError::MultipleImages` for the first
/// specifier naming a different image.
pub fn parse_sources<S: AsRef<str>>(specs: &[S]) -> Result<(PathBuf, Vec<String>)> {
    let mut image: Option<PathBuf> = None;
    let mut paths = Vec::with_capacity(specs.len());

    for spec in specs {
        let parsed = SourceSpec::parse(spec.as_ref())?;
        match &image {
            None => image = Some(parsed.image),
            Some(expected) if !same_image(expected, &parsed.image) => {
                return Err(ExtractionError::MultipleImages {
                    expected: expected.clone(),
                    found: parsed.image,
                });
            }
            Some(_) => {}
        }
        paths.push(parsed.path);
    }

    image
        .map(|image| (image, paths))
        .ok_or_else(|| ExtractionError::InvalidSource("no source given".to_string()))
}

// Images are compared by spelling, the way the user typed them.
fn same_image(a: &Path, b: &Path) -> bool {
    a.as_os_str() == b.as_os_str()
}
