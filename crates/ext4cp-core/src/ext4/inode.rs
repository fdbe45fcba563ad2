//! Group descriptor and inode decoding.

use super::I_BLOCK_SIZE;
use super::read_fixed;
use super::read_le_u16;
use super::read_le_u32;
use super::xattr::find_system_data;
use crate::EntryKind;
use crate::ExtractionError;
use crate::Result;
use crate::volume::InodeId;

const EXT4_EXTENTS_FL: u32 = 0x0008_0000;
const EXT4_INLINE_DATA_FL: u32 = 0x1000_0000;

const S_IFMT: u16 = 0xF000;
const S_IFIFO: u16 = 0x1000;
const S_IFCHR: u16 = 0x2000;
const S_IFDIR: u16 = 0x4000;
const S_IFBLK: u16 = 0x6000;
const S_IFREG: u16 = 0x8000;
const S_IFLNK: u16 = 0xA000;
const S_IFSOCK: u16 = 0xC000;

/// Size of the fixed inode fields every revision carries.
const GOOD_OLD_INODE_SIZE: usize = 128;

/// Returns the inode table's first block from a group descriptor.
pub(crate) fn group_inode_table(bytes: &[u8], desc_size: u16) -> Result<u64> {
    let lo = u64::from(read_le_u32(bytes, 0x08)?);
    let hi = if desc_size >= 64 {
        u64::from(read_le_u32(bytes, 0x28)?)
    } else {
        0
    };
    Ok(lo | (hi << 32))
}

/// A decoded inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ext4Inode {
    /// Inode number.
    pub id: InodeId,
    /// Type and permission bits.
    pub mode: u16,
    /// Size in bytes.
    pub size: u64,
    /// Inode flags.
    pub flags: u32,
    /// Raw `i_block` area: extent root, block pointers or inline bytes.
    pub i_block: [u8; I_BLOCK_SIZE],
    /// Extended attribute area after the fixed fields.
    pub ibody: Vec<u8>,
}

impl Ext4Inode {
    /// Parses an inode record.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidImage` if the record is shorter than
    /// 128 bytes or its extra size runs past the record.
    pub fn parse(id: InodeId, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < GOOD_OLD_INODE_SIZE {
            return Err(ExtractionError::invalid_image(format!(
                "inode {id} record truncated"
            )));
        }

        let size_lo = u64::from(read_le_u32(bytes, 0x04)?);
        let size_hi = u64::from(read_le_u32(bytes, 0x6C)?);

        let ibody = if bytes.len() > GOOD_OLD_INODE_SIZE {
            let extra_isize = usize::from(read_le_u16(bytes, 0x80)?);
            let start = GOOD_OLD_INODE_SIZE + extra_isize;
            bytes
                .get(start..)
                .ok_or_else(|| {
                    ExtractionError::invalid_image(format!("inode {id} extra size too large"))
                })?
                .to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            id,
            mode: read_le_u16(bytes, 0x00)?,
            size: size_lo | (size_hi << 32),
            flags: read_le_u32(bytes, 0x20)?,
            i_block: read_fixed::<I_BLOCK_SIZE>(bytes, 0x28)?,
            ibody,
        })
    }

    /// Returns the entry kind encoded in the mode bits.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidImage` for an unknown type.
    pub fn kind(&self) -> Result<EntryKind> {
        match self.mode & S_IFMT {
            S_IFREG => Ok(EntryKind::File),
            S_IFDIR => Ok(EntryKind::Directory),
            S_IFCHR => Ok(EntryKind::CharDevice),
            S_IFBLK => Ok(EntryKind::BlockDevice),
            S_IFIFO => Ok(EntryKind::Fifo),
            S_IFSOCK => Ok(EntryKind::Socket),
            S_IFLNK => Ok(EntryKind::Symlink),
            other => Err(ExtractionError::invalid_image(format!(
                "inode {} has unknown type {other:#06x}",
                self.id
            ))),
        }
    }

    /// Returns `true` if block mapping goes through an extent tree.
    #[must_use]
    pub const fn uses_extents(&self) -> bool {
        self.flags & EXT4_EXTENTS_FL != 0
    }

    /// Returns `true` if the contents live inside the inode.
    #[must_use]
    pub const fn has_inline_data(&self) -> bool {
        self.flags & EXT4_INLINE_DATA_FL != 0
    }

    /// Returns `true` for a symlink whose target is stored in `i_block`.
    #[must_use]
    pub fn is_fast_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
            && self.size < I_BLOCK_SIZE as u64
            && !self.uses_extents()
            && !self.has_inline_data()
    }

    /// Returns the full inline contents: `i_block` followed by the
    /// `system.data` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute area is malformed.
    pub fn inline_data(&self) -> Result<Vec<u8>> {
        let mut data = self.i_block.to_vec();
        if let Some(tail) = find_system_data(&self.ibody)? {
            data.extend_from_slice(&tail);
        }
        Ok(data)
    }
}
