//! Read-only volume abstraction the extraction engine walks.
//!
//! A [`Volume`] exposes exactly what traversal needs: a root inode, inode
//! lookup by identity, directory enumeration in on-disk order, and a byte
//! stream for file contents or symlink targets. Two backends exist:
//! [`Ext4Volume`](crate::ext4::Ext4Volume) for real images and
//! [`MemoryVolume`] for tests and benchmarks.

mod memory;

pub use memory::MemoryVolume;

use std::fmt;
use std::io::Read;

use crate::EntryKind;
use crate::Result;

/// Identity of an inode within a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeId(pub u32);

impl InodeId {
    /// Inode number of the root directory on ext2/3/4 volumes.
    pub const ROOT: Self = Self(2);
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity metadata of an opened volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Volume UUID in canonical `8-4-4-4-12` lowercase hex form.
    pub uuid: String,
    /// Filesystem block size in bytes.
    pub block_size: u32,
}

/// One record of a directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name as stored in the directory.
    pub name: String,
    /// Inode the entry refers to.
    pub inode: InodeId,
    /// Kind of the referenced inode.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Creates a new directory entry.
    #[must_use]
    pub fn new(name: impl Into<String>, inode: InodeId, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            inode,
            kind,
        }
    }

    /// Returns `true` for the `.` and `..` self/parent references.
    #[must_use]
    pub fn is_dot_or_dotdot(&self) -> bool {
        is_dot_or_dotdot(&self.name)
    }
}

/// Returns `true` for `.` and `..`.
#[must_use]
pub fn is_dot_or_dotdot(name: &str) -> bool {
    name == "." || name == ".."
}

/// A read-only filesystem image.
///
/// Inode handles are transient: the engine fetches one per directory entry
/// with [`get_inode`](Self::get_inode) and drops it once the entry is
/// processed.
pub trait Volume {
    /// Handle to a loaded inode.
    type Inode;

    /// Returns the volume identity.
    fn info(&self) -> VolumeInfo;

    /// Loads the root directory inode.
    ///
    /// # Errors
    ///
    /// Returns an error if the root inode cannot be read.
    fn root(&self) -> Result<Self::Inode>;

    /// Loads an inode by identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is out of range or the inode cannot
    /// be read.
    fn get_inode(&self, id: InodeId) -> Result<Self::Inode>;

    /// Enumerates a directory inode in on-disk order, `.` and `..`
    /// included.
    ///
    /// # Errors
    ///
    /// Returns an error if the inode is not a directory or its blocks cannot
    /// be read.
    fn open_dir(&self, inode: &Self::Inode) -> Result<Vec<DirEntry>>;

    /// Opens a byte stream over a file's contents or a symlink's target.
    ///
    /// # Errors
    ///
    /// Returns an error if the inode has no readable content.
    fn open_read<'a>(&'a self, inode: &Self::Inode) -> Result<Box<dyn Read + 'a>>;

    /// Finds the first entry called `name` in a directory.
    ///
    /// Duplicate names are not detected; enumeration order decides.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`open_dir`](Self::open_dir).
    fn lookup(&self, dir: &Self::Inode, name: &str) -> Result<Option<DirEntry>> {
        Ok(self
            .open_dir(dir)?
            .into_iter()
            .find(|entry| entry.name == name))
    }
}
