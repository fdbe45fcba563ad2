//! Read-only ext2/ext3/ext4 volume backend.
//!
//! Parses just enough of the on-disk format to enumerate directories and
//! stream file contents: the superblock, group descriptors, inodes, extent
//! trees, legacy block maps, inline data and linear directory blocks.
//! Checksums are not verified and the journal is ignored.

mod dir;
mod extent;
mod inode;
mod reader;
mod superblock;
mod volume;
mod xattr;

pub use inode::Ext4Inode;
pub use reader::Ext4FileReader;
pub use superblock::Superblock;
pub use volume::Ext4Volume;

use crate::ExtractionError;
use crate::Result;

/// Byte offset of the primary superblock.
pub(crate) const SUPERBLOCK_OFFSET: u64 = 1024;

/// Size of the superblock region.
pub(crate) const SUPERBLOCK_SIZE: usize = 1024;

/// Size of `i_block`, the inode's inline block-pointer area.
pub(crate) const I_BLOCK_SIZE: usize = 60;

fn ensure_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            ExtractionError::invalid_image(format!(
                "structure truncated: need {len} bytes at offset {offset}, have {}",
                data.len()
            ))
        })
}

#[inline]
pub(crate) fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    Ok(ensure_slice(data, offset, 1)?[0])
}

#[inline]
pub(crate) fn read_le_u16(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = ensure_slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub(crate) fn read_le_u32(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = ensure_slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub(crate) fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    let bytes = ensure_slice(data, offset, N)?;
    let mut out = [0_u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}
