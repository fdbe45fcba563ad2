//! Path resolution against an image's directory hierarchy.

use crate::EntryKind;
use crate::ExtractionError;
use crate::LogicalPath;
use crate::Result;
use crate::source::WHOLE_DIRECTORY;
use crate::volume::Volume;

/// Where a target path landed.
#[derive(Debug)]
pub enum ResolvedTarget<I> {
    /// The target named a directory's contents (`.`): walk it directly,
    /// without materializing the directory itself.
    WholeDirectory {
        /// The directory to enumerate.
        inode: I,
        /// Logical path of the directory from the image root.
        path: LogicalPath,
    },
    /// The target named one entry.
    Entry {
        /// The entry's inode.
        inode: I,
        /// The entry's kind as recorded in its parent directory.
        kind: EntryKind,
        /// Logical path of the containing directory from the image root.
        parent: LogicalPath,
        /// The entry's name.
        name: String,
    },
}

/// Resolves a `/`-separated `target` starting at directory `start`.
///
/// Every component but the last must name a directory. The last one is
/// looked up in its parent's enumeration, first match wins. A final `.`
/// stands for the parent itself and resolves to
/// [`ResolvedTarget::WholeDirectory`] without any lookup. Empty components
/// are ignored, so `etc//ssh` and `etc/ssh` are the same target.
///
/// # Errors
///
/// Returns `ExtractionError::NotFound` naming the missing component and the
/// directory it was searched in, `ExtractionError::NotADirectory` if an
/// intermediate component is not a directory, or any volume read error.
pub fn resolve<V: Volume>(
    volume: &V,
    start: V::Inode,
    target: &str,
) -> Result<ResolvedTarget<V::Inode>> {
    let mut components: Vec<&str> = target.split('/').filter(|c| !c.is_empty()).collect();
    let last = components.pop().unwrap_or(WHOLE_DIRECTORY);

    let mut current = start;
    let mut path = LogicalPath::root();

    for component in components {
        let entry = volume
            .lookup(&current, component)?
            .ok_or_else(|| not_found(component, &path))?;

        path = path.join(component);
        if !entry.kind.is_directory() {
            return Err(ExtractionError::NotADirectory {
                path: path.to_absolute(),
            });
        }
        current = volume.get_inode(entry.inode)?;
    }

    if last == WHOLE_DIRECTORY {
        return Ok(ResolvedTarget::WholeDirectory {
            inode: current,
            path,
        });
    }

    let entry = volume
        .lookup(&current, last)?
        .ok_or_else(|| not_found(last, &path))?;

    Ok(ResolvedTarget::Entry {
        inode: volume.get_inode(entry.inode)?,
        kind: entry.kind,
        parent: path,
        name: entry.name,
    })
}

fn not_found(name: &str, parent: &LogicalPath) -> ExtractionError {
    ExtractionError::NotFound {
        name: name.to_string(),
        parent: parent.to_absolute(),
    }
}
