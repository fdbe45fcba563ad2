//! Destination path construction.
//!
//! Turns a logical position (containing path plus entry name) into the host
//! path the materializer writes to, then applies the conflict-rename and
//! filename-workaround policies.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::DestDir;
use crate::LogicalPath;
use crate::config::PathStyle;

/// Reserved suffix some hosts refuse to create files with.
const REJECTED_SUFFIX: &str = ".fw";

/// Suffix appended to names ending in [`REJECTED_SUFFIX`].
const WORKAROUND_SUFFIX: &str = ".bin";

/// Returns the destination path for `name` inside `parent`.
///
/// Hierarchical paths mirror the image layout below `dest`. Flattened paths
/// join every component with [`PathStyle::FLATTEN_SEPARATOR`] into a single
/// name directly under `dest`.
///
/// # Examples
///
/// ```
/// use ext4cp_core::DestDir;
/// use ext4cp_core::LogicalPath;
/// use ext4cp_core::config::PathStyle;
/// use ext4cp_core::extraction::naming::destination_path;
/// use std::path::Path;
///
/// # fn main() -> Result<(), ext4cp_core::ExtractionError> {
/// let dest = DestDir::new(".")?;
/// let parent = LogicalPath::from_components(["etc", "ssh"]);
///
/// let flat = destination_path(&dest, PathStyle::Flattened, &parent, "sshd_config");
/// assert_eq!(flat, Path::new("./etc_ssh_sshd_config"));
///
/// let tree = destination_path(&dest, PathStyle::Hierarchical, &parent, "sshd_config");
/// assert_eq!(tree, Path::new("./etc/ssh/sshd_config"));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn destination_path(
    dest: &DestDir,
    style: PathStyle,
    parent: &LogicalPath,
    name: &str,
) -> PathBuf {
    match style {
        PathStyle::Hierarchical => {
            let mut path = dest.as_path().to_path_buf();
            path.extend(parent.components());
            path.push(name);
            path
        }
        PathStyle::Flattened => {
            if parent.is_root() {
                dest.as_path().join(name)
            } else {
                let joined = parent.join(name).join_with(PathStyle::FLATTEN_SEPARATOR);
                dest.as_path().join(joined)
            }
        }
    }
}

/// Returns `true` if anything occupies `path`, dangling symlinks included.
#[must_use]
pub fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Finds a free variant of `path` by suffixing its stem with `_1`, `_2`, ...
///
/// Every candidate is derived from the original name, so the sequence is
/// `a.txt`, `a_1.txt`, `a_2.txt` and never `a_1_1.txt`. Returns the path
/// unchanged when it is already free, along with whether a rename happened.
#[must_use]
pub fn unique_path(path: &Path) -> (PathBuf, bool) {
    if !is_occupied(path) {
        return (path.to_path_buf(), false);
    }

    let stem = path.file_stem().map(OsString::from).unwrap_or_default();
    let extension = path.extension();

    let mut counter: u64 = 1;
    loop {
        let mut name = stem.clone();
        name.push(format!("_{counter}"));
        if let Some(extension) = extension {
            name.push(".");
            name.push(extension);
        }

        let candidate = path.with_file_name(name);
        if !is_occupied(&candidate) {
            return (candidate, true);
        }
        counter += 1;
    }
}

/// Appends `.bin` to a path ending in `.fw` when `host_rejects` is set.
///
/// The caller decides whether the host needs it; the extractor passes
/// `cfg!(windows)` combined with the user's opt-in.
#[must_use]
pub fn apply_filename_workaround(path: PathBuf, host_rejects: bool) -> PathBuf {
    if !host_rejects {
        return path;
    }

    let ends_with_reserved = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(REJECTED_SUFFIX));

    if ends_with_reserved {
        let mut raw = path.into_os_string();
        raw.push(WORKAROUND_SUFFIX);
        PathBuf::from(raw)
    } else {
        path
    }
}
