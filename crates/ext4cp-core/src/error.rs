//! Error types for image extraction operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while extracting entries from a filesystem image.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// I/O operation failed, either on the image or on the host.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path component is absent from its parent directory.
    #[error("'{name}' not found in '{parent}'.")]
    NotFound {
        /// The missing component.
        name: String,
        /// Logical path of the directory that was searched.
        parent: String,
    },

    /// An intermediate path component resolved to something other than a
    /// directory.
    #[error("'{path}' is not a directory")]
    NotADirectory {
        /// Logical path of the offending component.
        path: String,
    },

    /// Source specifiers referenced more than one image.
    #[error("Single command can only extract from one image, not '{found}'.")]
    MultipleImages {
        /// The image named by the first specifier.
        expected: PathBuf,
        /// The conflicting image.
        found: PathBuf,
    },

    /// A source specifier could not be parsed.
    #[error("invalid source specifier: {0}")]
    InvalidSource(String),

    /// The image is not a readable ext2/3/4 filesystem.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The image uses an on-disk feature this reader cannot decode.
    #[error("unsupported image feature: {0}")]
    UnsupportedFeature(String),
}

impl ExtractionError {
    /// Returns `true` if this error is a usage error detected before any
    /// traversal starts.
    ///
    /// # Examples
    ///
    /// ```
    /// use ext4cp_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::MultipleImages {
    ///     expected: PathBuf::from("a.img"),
    ///     found: PathBuf::from("b.img"),
    /// };
    /// assert!(err.is_usage_error());
    ///
    /// let err = ExtractionError::NotFound {
    ///     name: "passwd".into(),
    ///     parent: "/etc".into(),
    /// };
    /// assert!(!err.is_usage_error());
    /// ```
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(self, Self::MultipleImages { .. } | Self::InvalidSource(_))
    }

    /// Returns `true` if this error is a path resolution failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use ext4cp_core::ExtractionError;
    ///
    /// let err = ExtractionError::InvalidImage("bad magic".to_string());
    /// assert_eq!(err.context(), Some("bad magic"));
    ///
    /// let err = ExtractionError::InvalidSource(String::new());
    /// assert_eq!(err.context(), Some(""));
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidSource(msg) | Self::InvalidImage(msg) | Self::UnsupportedFeature(msg) => {
                Some(msg)
            }
            _ => None,
        }
    }

    pub(crate) fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage(reason.into())
    }
}
