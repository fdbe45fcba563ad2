//! In-memory volume backend.

use std::collections::HashMap;
use std::io::Cursor;
use std::io::Read;

use super::DirEntry;
use super::InodeId;
use super::Volume;
use super::VolumeInfo;
use crate::EntryKind;
use crate::ExtractionError;
use crate::Result;

const FIRST_FREE_INODE: u32 = 11;

#[derive(Debug, Clone)]
enum MemoryNode {
    Directory(Vec<DirEntry>),
    File(Vec<u8>),
    Symlink(String),
    Special(EntryKind),
}

impl MemoryNode {
    const fn kind(&self) -> EntryKind {
        match self {
            Self::Directory(_) => EntryKind::Directory,
            Self::File(_) => EntryKind::File,
            Self::Symlink(_) => EntryKind::Symlink,
            Self::Special(kind) => *kind,
        }
    }
}

/// A volume held entirely in memory.
///
/// Directories keep entries in insertion order, starting with the `.` and
/// `..` records an ext4 directory block would carry. Inode numbers follow
/// the ext4 convention: the root is inode 2 and new inodes are numbered
/// from 11 upwards.
///
/// # Examples
///
/// ```
/// use ext4cp_core::volume::MemoryVolume;
/// use ext4cp_core::volume::Volume;
///
/// # fn main() -> Result<(), ext4cp_core::ExtractionError> {
/// let mut volume = MemoryVolume::new();
/// volume.insert_file("etc/hostname", b"device\n")?;
///
/// let root = volume.root()?;
/// let names: Vec<String> = volume.open_dir(&root)?.into_iter().map(|e| e.name).collect();
/// assert_eq!(names, [".", "..", "etc"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryVolume {
    info: VolumeInfo,
    nodes: HashMap<InodeId, MemoryNode>,
    next_id: u32,
}

impl Default for MemoryVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVolume {
    /// Creates a volume containing only an empty root directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_info(VolumeInfo {
            uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            block_size: 4096,
        })
    }

    /// Creates an empty volume reporting the given identity.
    #[must_use]
    pub fn with_info(info: VolumeInfo) -> Self {
        let root = InodeId::ROOT;
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            MemoryNode::Directory(vec![
                DirEntry::new(".", root, EntryKind::Directory),
                DirEntry::new("..", root, EntryKind::Directory),
            ]),
        );
        Self {
            info,
            nodes,
            next_id: FIRST_FREE_INODE,
        }
    }

    /// Creates a directory under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a directory of this volume.
    pub fn add_dir(&mut self, parent: InodeId, name: &str) -> Result<InodeId> {
        self.ensure_directory(parent)?;
        let id = self.allocate();
        self.nodes.insert(
            id,
            MemoryNode::Directory(vec![
                DirEntry::new(".", id, EntryKind::Directory),
                DirEntry::new("..", parent, EntryKind::Directory),
            ]),
        );
        self.add_link(parent, name, id)?;
        Ok(id)
    }

    /// Creates a regular file under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a directory of this volume.
    pub fn add_file(
        &mut self,
        parent: InodeId,
        name: &str,
        data: impl Into<Vec<u8>>,
    ) -> Result<InodeId> {
        self.add_node(parent, name, MemoryNode::File(data.into()))
    }

    /// Creates a symbolic link under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a directory of this volume.
    pub fn add_symlink(&mut self, parent: InodeId, name: &str, target: &str) -> Result<InodeId> {
        self.add_node(parent, name, MemoryNode::Symlink(target.to_string()))
    }

    /// Creates a device node, FIFO or socket under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is not a special kind or `parent` is not a
    /// directory of this volume.
    pub fn add_special(&mut self, parent: InodeId, name: &str, kind: EntryKind) -> Result<InodeId> {
        if !kind.is_special() {
            return Err(ExtractionError::invalid_image(format!(
                "{kind} is not a special node kind"
            )));
        }
        self.add_node(parent, name, MemoryNode::Special(kind))
    }

    /// Adds another directory entry referring to an existing inode.
    ///
    /// Duplicate names are accepted and kept in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not a directory or `target` does not
    /// exist.
    pub fn add_link(&mut self, parent: InodeId, name: &str, target: InodeId) -> Result<()> {
        let kind = self.node(target)?.kind();
        match self.nodes.get_mut(&parent) {
            Some(MemoryNode::Directory(entries)) => {
                entries.push(DirEntry::new(name, target, kind));
                Ok(())
            }
            _ => Err(not_a_directory(parent)),
        }
    }

    /// Creates a directory at `path`, creating missing parents.
    ///
    /// Existing directories along the way are reused.
    ///
    /// # Errors
    ///
    /// Returns an error if a component exists and is not a directory.
    pub fn insert_dir(&mut self, path: &str) -> Result<InodeId> {
        let mut current = InodeId::ROOT;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current = match self.find(current, component)? {
                Some(entry) if entry.kind.is_directory() => entry.inode,
                Some(_) => {
                    return Err(ExtractionError::NotADirectory {
                        path: component.to_string(),
                    });
                }
                None => self.add_dir(current, component)?,
            };
        }
        Ok(current)
    }

    /// Creates a regular file at `path`, creating missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent component is not a directory.
    pub fn insert_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> Result<InodeId> {
        let (parent, name) = self.prepare_parent(path)?;
        self.add_file(parent, name, data)
    }

    /// Creates a symbolic link at `path`, creating missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent component is not a directory.
    pub fn insert_symlink(&mut self, path: &str, target: &str) -> Result<InodeId> {
        let (parent, name) = self.prepare_parent(path)?;
        self.add_symlink(parent, name, target)
    }

    /// Creates a special node at `path`, creating missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is not special or a parent component is
    /// not a directory.
    pub fn insert_special(&mut self, path: &str, kind: EntryKind) -> Result<InodeId> {
        let (parent, name) = self.prepare_parent(path)?;
        self.add_special(parent, name, kind)
    }

    fn prepare_parent<'p>(&mut self, path: &'p str) -> Result<(InodeId, &'p str)> {
        let trimmed = path.trim_matches('/');
        match trimmed.rsplit_once('/') {
            Some((dir, name)) => Ok((self.insert_dir(dir)?, name)),
            None => Ok((InodeId::ROOT, trimmed)),
        }
    }

    fn add_node(&mut self, parent: InodeId, name: &str, node: MemoryNode) -> Result<InodeId> {
        self.ensure_directory(parent)?;
        let id = self.allocate();
        self.nodes.insert(id, node);
        self.add_link(parent, name, id)?;
        Ok(id)
    }

    fn find(&self, dir: InodeId, name: &str) -> Result<Option<DirEntry>> {
        match self.node(dir)? {
            MemoryNode::Directory(entries) => {
                Ok(entries.iter().find(|entry| entry.name == name).cloned())
            }
            _ => Err(not_a_directory(dir)),
        }
    }

    fn ensure_directory(&self, id: InodeId) -> Result<()> {
        match self.node(id)? {
            MemoryNode::Directory(_) => Ok(()),
            _ => Err(not_a_directory(id)),
        }
    }

    fn node(&self, id: InodeId) -> Result<&MemoryNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| ExtractionError::invalid_image(format!("inode {id} does not exist")))
    }

    fn allocate(&mut self) -> InodeId {
        let id = InodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn not_a_directory(id: InodeId) -> ExtractionError {
    ExtractionError::invalid_image(format!("inode {id} is not a directory"))
}

impl Volume for MemoryVolume {
    type Inode = InodeId;

    fn info(&self) -> VolumeInfo {
        self.info.clone()
    }

    fn root(&self) -> Result<InodeId> {
        Ok(InodeId::ROOT)
    }

    fn get_inode(&self, id: InodeId) -> Result<InodeId> {
        self.node(id)?;
        Ok(id)
    }

    fn open_dir(&self, inode: &InodeId) -> Result<Vec<DirEntry>> {
        match self.node(*inode)? {
            MemoryNode::Directory(entries) => Ok(entries.clone()),
            _ => Err(not_a_directory(*inode)),
        }
    }

    fn open_read<'a>(&'a self, inode: &InodeId) -> Result<Box<dyn Read + 'a>> {
        match self.node(*inode)? {
            MemoryNode::File(data) => Ok(Box::new(Cursor::new(data.as_slice()))),
            MemoryNode::Symlink(target) => Ok(Box::new(Cursor::new(target.as_bytes()))),
            MemoryNode::Special(_) => Ok(Box::new(std::io::empty())),
            MemoryNode::Directory(_) => Err(ExtractionError::invalid_image(format!(
                "inode {inode} is a directory"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn names(volume: &MemoryVolume, dir: InodeId) -> Vec<String> {
        volume
            .open_dir(&dir)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn test_new_volume_has_root() {
        let volume = MemoryVolume::new();
        let root = volume.root().unwrap();
        assert_eq!(root, InodeId::ROOT);
        assert_eq!(names(&volume, root), [".", ".."]);
        assert_eq!(volume.info().block_size, 4096);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut volume = MemoryVolume::new();
        volume.add_file(InodeId::ROOT, "zeta", b"z").unwrap();
        volume.add_dir(InodeId::ROOT, "alpha").unwrap();
        volume.add_symlink(InodeId::ROOT, "mid", "zeta").unwrap();
        assert_eq!(names(&volume, InodeId::ROOT), [".", "..", "zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_dot_entries_point_to_self_and_parent() {
        let mut volume = MemoryVolume::new();
        let etc = volume.add_dir(InodeId::ROOT, "etc").unwrap();
        let entries = volume.open_dir(&etc).unwrap();
        assert_eq!(entries[0].inode, etc);
        assert_eq!(entries[1].inode, InodeId::ROOT);
        assert!(entries.iter().all(DirEntry::is_dot_or_dotdot));
    }

    #[test]
    fn test_insert_file_creates_parents() {
        let mut volume = MemoryVolume::new();
        volume.insert_file("etc/ssh/sshd_config", b"x").unwrap();
        volume.insert_file("etc/passwd", b"y").unwrap();

        let etc = volume.lookup(&InodeId::ROOT, "etc").unwrap().unwrap();
        assert_eq!(etc.kind, EntryKind::Directory);
        assert_eq!(names(&volume, etc.inode), [".", "..", "ssh", "passwd"]);
    }

    #[test]
    fn test_insert_through_file_fails() {
        let mut volume = MemoryVolume::new();
        volume.insert_file("etc", b"not a dir").unwrap();
        let err = volume.insert_file("etc/passwd", b"y").unwrap_err();
        assert!(matches!(err, ExtractionError::NotADirectory { .. }));
    }

    #[test]
    fn test_open_read_contents() {
        let mut volume = MemoryVolume::new();
        let file = volume.insert_file("data.bin", vec![1, 2, 3]).unwrap();
        let link = volume.insert_symlink("link", "../data.bin").unwrap();
        let fifo = volume.insert_special("pipe", EntryKind::Fifo).unwrap();

        let mut buf = Vec::new();
        volume.open_read(&file).unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);

        let mut target = String::new();
        volume
            .open_read(&link)
            .unwrap()
            .read_to_string(&mut target)
            .unwrap();
        assert_eq!(target, "../data.bin");

        buf.clear();
        volume.open_read(&fifo).unwrap().read_to_end(&mut buf).unwrap();
        assert!(buf.is_empty());

        assert!(volume.open_read(&InodeId::ROOT).is_err());
    }

    #[test]
    fn test_add_special_rejects_regular_kinds() {
        let mut volume = MemoryVolume::new();
        assert!(
            volume
                .add_special(InodeId::ROOT, "x", EntryKind::File)
                .is_err()
        );
        assert!(
            volume
                .add_special(InodeId::ROOT, "null", EntryKind::CharDevice)
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_inode() {
        let volume = MemoryVolume::new();
        assert!(volume.get_inode(InodeId(999)).is_err());
        assert!(volume.open_dir(&InodeId(999)).is_err());
    }

    #[test]
    fn test_add_link_to_missing_parent() {
        let mut volume = MemoryVolume::new();
        let file = volume.insert_file("f", b"").unwrap();
        assert!(volume.add_link(file, "x", file).is_err());
        assert!(volume.add_dir(file, "sub").is_err());
    }
}
