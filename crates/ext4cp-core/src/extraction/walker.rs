//! Depth-first traversal of directory inodes.

use std::vec;

use super::materializer::Materializer;
use super::resolver::ResolvedTarget;
use crate::LogicalPath;
use crate::Result;
use crate::volume::DirEntry;
use crate::volume::Volume;

/// One directory being enumerated.
struct Frame {
    entries: vec::IntoIter<DirEntry>,
    path: LogicalPath,
}

/// Walks the contents of `dir`, materializing each entry and descending
/// wherever the materializer asks to.
///
/// `path` is the position of `dir` relative to the traversal root. Entries
/// are visited in enumeration order, depth first: a descended directory is
/// finished before its next sibling is looked at. An explicit stack replaces
/// recursion, so nesting depth does not grow the call stack.
///
/// # Errors
///
/// Stops at the first volume or host error.
pub fn walk<V: Volume>(
    volume: &V,
    dir: &V::Inode,
    path: LogicalPath,
    materializer: &mut Materializer<'_>,
) -> Result<()> {
    let mut stack = vec![Frame {
        entries: volume.open_dir(dir)?.into_iter(),
        path,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(entry) = frame.entries.next() else {
            stack.pop();
            continue;
        };

        let inode = volume.get_inode(entry.inode)?;
        let descend =
            materializer.materialize(volume, &inode, &frame.path, &entry.name, entry.kind)?;

        if descend && !entry.is_dot_or_dotdot() {
            let child = Frame {
                entries: volume.open_dir(&inode)?.into_iter(),
                path: frame.path.join(&entry.name),
            };
            stack.push(child);
        }
    }

    Ok(())
}

/// Extracts one resolved target.
///
/// A whole-directory target is walked with an empty relative path, so its
/// children land directly in the destination root. A named entry is
/// materialized under its own name and, when it is a directory the
/// materializer descends into, walked with its name as the relative path.
///
/// # Errors
///
/// Propagates errors from [`walk`] and the materializer.
pub fn extract_target<V: Volume>(
    volume: &V,
    target: ResolvedTarget<V::Inode>,
    materializer: &mut Materializer<'_>,
) -> Result<()> {
    match target {
        ResolvedTarget::WholeDirectory { inode, .. } => {
            walk(volume, &inode, LogicalPath::root(), materializer)
        }
        ResolvedTarget::Entry {
            inode, kind, name, ..
        } => {
            let root = LogicalPath::root();
            if materializer.materialize(volume, &inode, &root, &name, kind)? {
                walk(volume, &inode, root.join(&name), materializer)?;
            }
            Ok(())
        }
    }
}
