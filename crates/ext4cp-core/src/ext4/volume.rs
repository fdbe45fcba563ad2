//! [`Volume`] implementation over an ext2/3/4 image.

use std::cell::RefCell;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use super::Ext4FileReader;
use super::Ext4Inode;
use super::I_BLOCK_SIZE;
use super::SUPERBLOCK_OFFSET;
use super::SUPERBLOCK_SIZE;
use super::Superblock;
use super::dir::RawDirEntry;
use super::dir::parse_dir_block;
use super::dir::parse_inline_dir;
use super::extent::BlockMap;
use super::extent::BlockSource;
use super::extent::Mapping;
use super::inode::group_inode_table;
use crate::EntryKind;
use crate::ExtractionError;
use crate::Result;
use crate::volume::DirEntry;
use crate::volume::InodeId;
use crate::volume::Volume;
use crate::volume::VolumeInfo;

/// A read-only ext2/3/4 filesystem image.
///
/// Works over any seekable byte source: an image file, a block device or
/// an in-memory buffer. Reads go through a `RefCell` so that many
/// [`Ext4FileReader`]s can borrow the volume at once; only one of them
/// touches the device at any moment.
///
/// # Examples
///
/// ```no_run
/// use ext4cp_core::ext4::Ext4Volume;
/// use ext4cp_core::volume::Volume;
/// use std::fs::File;
/// use std::io::BufReader;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let volume = Ext4Volume::open(BufReader::new(File::open("system.img")?))?;
/// let info = volume.info();
/// println!("{} ({} byte blocks)", info.uuid, info.block_size);
/// # Ok(())
/// # }
/// ```
pub struct Ext4Volume<R> {
    device: RefCell<R>,
    superblock: Superblock,
}

impl<R: Read + Seek> Ext4Volume<R> {
    /// Opens a volume by reading and validating its superblock.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidImage` if the source is too short or
    /// holds no ext2/3/4 superblock, `ExtractionError::UnsupportedFeature`
    /// for on-disk layouts this reader cannot decode, and
    /// `ExtractionError::Io` if the source cannot be read.
    pub fn open(mut device: R) -> Result<Self> {
        let mut region = vec![0u8; SUPERBLOCK_SIZE];
        device.seek(SeekFrom::Start(SUPERBLOCK_OFFSET))?;
        device.read_exact(&mut region).map_err(truncated)?;
        let superblock = Superblock::parse(&region)?;

        Ok(Self {
            device: RefCell::new(device),
            superblock,
        })
    }

    /// Returns the parsed superblock.
    #[must_use]
    pub const fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub(crate) fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.seek(SeekFrom::Start(offset))?;
        device.read_exact(buf).map_err(truncated)
    }

    /// Loads an inode by number.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidImage` if the number is out of range
    /// or the record cannot be decoded.
    pub fn read_inode(&self, id: InodeId) -> Result<Ext4Inode> {
        let sb = &self.superblock;
        if id.0 == 0 || id.0 > sb.inodes_count {
            return Err(ExtractionError::invalid_image(format!(
                "inode {id} out of range 1..={}",
                sb.inodes_count
            )));
        }

        let group = (id.0 - 1) / sb.inodes_per_group;
        let index = (id.0 - 1) % sb.inodes_per_group;

        let mut desc = vec![0u8; usize::from(sb.desc_size)];
        self.read_exact_at(sb.group_desc_offset(group), &mut desc)?;
        let table = group_inode_table(&desc, sb.desc_size)?;

        let offset = table * u64::from(sb.block_size)
            + u64::from(index) * u64::from(sb.inode_size);
        let mut record = vec![0u8; usize::from(sb.inode_size)];
        self.read_exact_at(offset, &mut record)?;

        Ext4Inode::parse(id, &record)
    }

    fn read_dir_records(&self, inode: &Ext4Inode) -> Result<Vec<RawDirEntry>> {
        let has_filetype = self.superblock.has_filetype();

        if inode.has_inline_data() {
            return parse_inline_dir(inode.id.0, &inode.inline_data()?, I_BLOCK_SIZE, has_filetype);
        }

        let block_size = u64::from(self.superblock.block_size);
        let map = BlockMap::load(self, &inode.i_block, inode.uses_extents())?;
        let blocks = inode.size.div_ceil(block_size);

        let mut records = Vec::new();
        for logical in 0..blocks {
            if let Mapping::Mapped { physical, .. } = map.lookup(self, logical)? {
                let block = self.read_block(physical)?;
                records.extend(parse_dir_block(&block, has_filetype)?);
            }
        }
        Ok(records)
    }

    fn entry_kind(&self, record: &RawDirEntry) -> Result<EntryKind> {
        match record.kind {
            Some(kind) => Ok(kind),
            None => self.read_inode(InodeId(record.inode))?.kind(),
        }
    }
}

fn truncated(err: io::Error) -> ExtractionError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ExtractionError::invalid_image("image truncated")
    } else {
        ExtractionError::Io(err)
    }
}

impl<R: Read + Seek> BlockSource for Ext4Volume<R> {
    fn read_block(&self, block: u64) -> Result<Vec<u8>> {
        let block_size = self.superblock.block_size;
        let mut data = vec![0u8; block_size as usize];
        self.read_exact_at(block * u64::from(block_size), &mut data)?;
        Ok(data)
    }

    fn block_size(&self) -> u32 {
        self.superblock.block_size
    }
}

impl<R: Read + Seek> Volume for Ext4Volume<R> {
    type Inode = Ext4Inode;

    fn info(&self) -> VolumeInfo {
        VolumeInfo {
            uuid: self.superblock.uuid_string(),
            block_size: self.superblock.block_size,
        }
    }

    fn root(&self) -> Result<Ext4Inode> {
        self.read_inode(InodeId::ROOT)
    }

    fn get_inode(&self, id: InodeId) -> Result<Ext4Inode> {
        self.read_inode(id)
    }

    fn open_dir(&self, inode: &Ext4Inode) -> Result<Vec<DirEntry>> {
        if inode.kind()? != EntryKind::Directory {
            return Err(ExtractionError::invalid_image(format!(
                "inode {} is not a directory",
                inode.id
            )));
        }

        self.read_dir_records(inode)?
            .into_iter()
            .map(|record| {
                let kind = self.entry_kind(&record)?;
                Ok(DirEntry::new(
                    record.name_lossy(),
                    InodeId(record.inode),
                    kind,
                ))
            })
            .collect()
    }

    fn open_read<'a>(&'a self, inode: &Ext4Inode) -> Result<Box<dyn Read + 'a>> {
        match inode.kind()? {
            EntryKind::Directory => Err(ExtractionError::invalid_image(format!(
                "inode {} is a directory",
                inode.id
            ))),
            EntryKind::File | EntryKind::Symlink => {
                Ok(Box::new(Ext4FileReader::new(self, inode)?))
            }
            _ => Ok(Box::new(io::empty())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::ext4::inode::tests::record;
    use crate::ext4::superblock::tests::region;
    use std::io::Cursor;

    const BLOCK: usize = 1024;
    const INODE_TABLE: usize = 5;
    const FIRST_DATA: usize = 32;
    const INCOMPAT_FILETYPE: u32 = 0x2;
    const EXTENTS_FL: u32 = 0x8_0000;
    const INLINE_DATA_FL: u32 = 0x1000_0000;

    /// Assembles a tiny 1 KiB-block image in memory.
    pub(crate) struct ImageBuilder {
        data: Vec<u8>,
    }

    fn extent_root(logical: u32, len: u16, physical: u32) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&0xF30Au16.to_le_bytes());
        raw.extend_from_slice(&1u16.to_le_bytes());
        raw.extend_from_slice(&4u16.to_le_bytes());
        raw.extend_from_slice(&0u16.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&logical.to_le_bytes());
        raw.extend_from_slice(&len.to_le_bytes());
        raw.extend_from_slice(&0u16.to_le_bytes());
        raw.extend_from_slice(&physical.to_le_bytes());
        raw
    }

    /// Encodes directory records, stretching the last one to `total`.
    fn dir_records(entries: &[(u32, &str, u8)], total: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, (inode, name, file_type)) in entries.iter().enumerate() {
            let natural = (8 + name.len() + 3) & !3;
            let rec_len = if i + 1 == entries.len() {
                total - out.len()
            } else {
                natural
            };
            out.extend_from_slice(&inode.to_le_bytes());
            out.extend_from_slice(&u16::try_from(rec_len).unwrap().to_le_bytes());
            out.push(u8::try_from(name.len()).unwrap());
            out.push(*file_type);
            out.extend_from_slice(name.as_bytes());
            out.resize(out.len() + rec_len - 8 - name.len(), 0);
        }
        out
    }

    impl ImageBuilder {
        pub(crate) fn new() -> Self {
            let mut data = vec![0u8; FIRST_DATA * BLOCK];
            data[1024..2048].copy_from_slice(&region(0, INCOMPAT_FILETYPE));
            data[2048 + 0x08..2048 + 0x0C]
                .copy_from_slice(&u32::try_from(INODE_TABLE).unwrap().to_le_bytes());
            Self { data }
        }

        fn alloc(&mut self, bytes: &[u8]) -> u32 {
            let first = self.data.len() / BLOCK;
            let blocks = bytes.len().div_ceil(BLOCK).max(1);
            self.data.extend_from_slice(bytes);
            self.data.resize((first + blocks) * BLOCK, 0);
            u32::try_from(first).unwrap()
        }

        fn put_inode(&mut self, ino: u32, raw: &[u8]) {
            let offset = INODE_TABLE * BLOCK + (ino as usize - 1) * 256;
            self.data[offset..offset + 256].copy_from_slice(raw);
        }

        pub(crate) fn extent_file(&mut self, ino: u32, contents: &[u8]) {
            let start = self.alloc(contents);
            let blocks = u16::try_from(contents.len().div_ceil(BLOCK)).unwrap();
            let raw = record(
                0o100_644,
                contents.len() as u64,
                EXTENTS_FL,
                &extent_root(0, blocks, start),
            );
            self.put_inode(ino, &raw);
        }

        /// A file of `size` bytes whose only mapped block is logical 2.
        pub(crate) fn sparse_file(&mut self, ino: u32, size: u64, contents: &[u8]) {
            let start = self.alloc(contents);
            let raw = record(0o100_644, size, EXTENTS_FL, &extent_root(2, 1, start));
            self.put_inode(ino, &raw);
        }

        /// A file on the classic block map.
        pub(crate) fn mapped_file(&mut self, ino: u32, contents: &[u8]) {
            let start = self.alloc(contents);
            let mut pointers = Vec::new();
            for i in 0..u32::try_from(contents.len().div_ceil(BLOCK)).unwrap() {
                pointers.extend_from_slice(&(start + i).to_le_bytes());
            }
            let raw = record(0o100_644, contents.len() as u64, 0, &pointers);
            self.put_inode(ino, &raw);
        }

        pub(crate) fn fast_symlink(&mut self, ino: u32, target: &[u8]) {
            let raw = record(0o120_777, target.len() as u64, 0, target);
            self.put_inode(ino, &raw);
        }

        pub(crate) fn special(&mut self, ino: u32, mode: u16) {
            self.put_inode(ino, &record(mode, 0, 0, &[]));
        }

        pub(crate) fn dir(&mut self, ino: u32, parent: u32, entries: &[(u32, &str, u8)]) {
            let mut all = vec![(ino, ".", 2u8), (parent, "..", 2u8)];
            all.extend_from_slice(entries);
            let start = self.alloc(&dir_records(&all, BLOCK));
            let raw = record(0o40_755, BLOCK as u64, EXTENTS_FL, &extent_root(0, 1, start));
            self.put_inode(ino, &raw);
        }

        /// A directory stored entirely in `i_block`.
        pub(crate) fn inline_dir(&mut self, ino: u32, parent: u32, entries: &[(u32, &str, u8)]) {
            let mut i_block = parent.to_le_bytes().to_vec();
            i_block.extend(dir_records(entries, I_BLOCK_SIZE - 4));
            let raw = record(0o40_755, I_BLOCK_SIZE as u64, INLINE_DATA_FL, &i_block);
            self.put_inode(ino, &raw);
        }

        pub(crate) fn open(self) -> Ext4Volume<Cursor<Vec<u8>>> {
            Ext4Volume::open(Cursor::new(self.data)).unwrap()
        }
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn sample() -> Ext4Volume<Cursor<Vec<u8>>> {
        let mut image = ImageBuilder::new();
        image.dir(
            2,
            2,
            &[(12, "zeta.txt", 1), (13, "etc", 2), (14, "link", 7), (15, "null", 3)],
        );
        image.extent_file(12, b"last letter\n");
        image.dir(13, 2, &[(16, "passwd", 1)]);
        image.mapped_file(16, b"root:x:0:0:root:/root:/bin/sh\n");
        image.fast_symlink(14, b"etc/passwd");
        image.special(15, 0o20_666);
        image.open()
    }

    #[test]
    fn test_info_from_superblock() {
        let info = sample().info();
        assert_eq!(info.uuid, "5a1e5c3b-0c1f-4f7e-9a61-3d2b8e6f4a10");
        assert_eq!(info.block_size, 1024);
    }

    #[test]
    fn test_root_listing_in_disk_order() {
        let volume = sample();
        let root = volume.root().unwrap();
        let entries = volume.open_dir(&root).unwrap();
        assert_eq!(names(&entries), [".", "..", "zeta.txt", "etc", "link", "null"]);
        assert_eq!(entries[3].kind, EntryKind::Directory);
        assert_eq!(entries[4].kind, EntryKind::Symlink);
        assert_eq!(entries[5].kind, EntryKind::CharDevice);
    }

    #[test]
    fn test_read_files_through_both_block_maps() {
        let volume = sample();

        let mut out = String::new();
        let inode = volume.get_inode(InodeId(12)).unwrap();
        volume.open_read(&inode).unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "last letter\n");

        let etc = volume.lookup(&volume.root().unwrap(), "etc").unwrap().unwrap();
        let etc = volume.get_inode(etc.inode).unwrap();
        let passwd = volume.lookup(&etc, "passwd").unwrap().unwrap();
        let mut out = String::new();
        volume
            .open_read(&volume.get_inode(passwd.inode).unwrap())
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "root:x:0:0:root:/root:/bin/sh\n");
    }

    #[test]
    fn test_special_reads_empty() {
        let volume = sample();
        let mut out = Vec::new();
        volume
            .open_read(&volume.get_inode(InodeId(15)).unwrap())
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_open_dir_rejects_file() {
        let volume = sample();
        let file = volume.get_inode(InodeId(12)).unwrap();
        assert!(volume.open_dir(&file).is_err());
        assert!(volume.open_read(&volume.root().unwrap()).is_err());
    }

    #[test]
    fn test_inline_directory_listing() {
        let mut image = ImageBuilder::new();
        image.inline_dir(2, 2, &[(12, "a", 1), (13, "b", 1)]);
        image.extent_file(12, b"a");
        image.extent_file(13, b"b");
        let volume = image.open();

        let entries = volume.open_dir(&volume.root().unwrap()).unwrap();
        assert_eq!(names(&entries), [".", "..", "a", "b"]);
        assert_eq!(entries[0].inode, InodeId(2));
    }

    #[test]
    fn test_inode_out_of_range() {
        let volume = sample();
        assert!(volume.get_inode(InodeId(0)).is_err());
        assert!(volume.get_inode(InodeId(65)).is_err());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let err = Ext4Volume::open(Cursor::new(vec![0u8; 4096])).err().unwrap();
        assert!(matches!(err, ExtractionError::InvalidImage(_)));

        let err = Ext4Volume::open(Cursor::new(vec![0u8; 100])).err().unwrap();
        assert!(matches!(err, ExtractionError::InvalidImage(_)));
    }
}
