//! Extraction configuration.

/// Default size of the buffer file contents are streamed through (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for one extraction run.
///
/// The value is built once, before traversal starts, and is only ever read
/// afterwards: every component receives it by reference.
///
/// # Examples
///
/// ```
/// use ext4cp_core::ExtractConfig;
/// use ext4cp_core::config::PathStyle;
///
/// let config = ExtractConfig {
///     recursive: true,
///     flatten: true,
///     ..ExtractConfig::new("system.img")
/// };
/// assert_eq!(config.path_style(), PathStyle::Flattened);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Descend into directories.
    pub recursive: bool,

    /// Discard the directory hierarchy and place every file directly under
    /// the destination root.
    pub flatten: bool,

    /// Never overwrite an existing destination entry; pick a `_N`-suffixed
    /// name instead.
    pub conflict_rename: bool,

    /// Append `.bin` to `.fw` file names on hosts that refuse to create
    /// them.
    pub filename_workaround: bool,

    /// Diagnostic level: 0 is silent, 1 adds notes, 2 lists every entry.
    pub verbosity: u8,

    /// Image name used in diagnostics.
    pub image_name: String,

    /// Size of the buffer file contents are copied through.
    pub chunk_size: usize,
}

impl Default for ExtractConfig {
    /// Creates a configuration with every optional behavior off.
    ///
    /// Default values:
    /// - `recursive`: false
    /// - `flatten`: false
    /// - `conflict_rename`: false
    /// - `filename_workaround`: false
    /// - `verbosity`: 0
    /// - `image_name`: empty
    /// - `chunk_size`: 64 KiB
    fn default() -> Self {
        Self {
            recursive: false,
            flatten: false,
            conflict_rename: false,
            filename_workaround: false,
            verbosity: 0,
            image_name: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ExtractConfig {
    /// Creates a default configuration for the named image.
    #[must_use]
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            ..Self::default()
        }
    }

    /// Returns the destination path strategy selected by `flatten`.
    #[must_use]
    pub const fn path_style(&self) -> PathStyle {
        if self.flatten {
            PathStyle::Flattened
        } else {
            PathStyle::Hierarchical
        }
    }

    /// Returns `true` if notes (omitted directories, volume identity)
    /// should be reported.
    #[must_use]
    pub const fn reports_notes(&self) -> bool {
        self.verbosity >= 1
    }

    /// Returns `true` if every extracted entry should be reported.
    #[must_use]
    pub const fn reports_entries(&self) -> bool {
        self.verbosity >= 2
    }
}

/// How logical paths are turned into destination paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Reproduce the directory hierarchy below the destination root.
    Hierarchical,
    /// Collapse the hierarchy into one name joined by
    /// [`PathStyle::FLATTEN_SEPARATOR`].
    Flattened,
}

impl PathStyle {
    /// Character that replaces path separators in flattened names.
    pub const FLATTEN_SEPARATOR: &'static str = "_";
}
