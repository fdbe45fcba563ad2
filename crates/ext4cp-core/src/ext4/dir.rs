//! Directory block decoding.

use super::read_le_u16;
use super::read_le_u32;
use super::read_u8;
use crate::EntryKind;
use crate::ExtractionError;
use crate::Result;

/// File type recorded for a checksum tail entry.
const EXT4_FT_DIR_CSUM: u8 = 0xDE;

const DIR_ENTRY_HEADER: usize = 8;

/// Size of the parent pointer that opens an inline directory.
const INLINE_DIR_PARENT_SIZE: usize = 4;

/// A directory record as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDirEntry {
    pub inode: u32,
    pub name: Vec<u8>,
    /// Recorded kind, or `None` when the record does not say.
    pub kind: Option<EntryKind>,
}

impl RawDirEntry {
    pub(crate) fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Maps a directory-entry file type byte to an entry kind.
pub(crate) const fn kind_from_file_type(file_type: u8) -> Option<EntryKind> {
    match file_type {
        1 => Some(EntryKind::File),
        2 => Some(EntryKind::Directory),
        3 => Some(EntryKind::CharDevice),
        4 => Some(EntryKind::BlockDevice),
        5 => Some(EntryKind::Fifo),
        6 => Some(EntryKind::Socket),
        7 => Some(EntryKind::Symlink),
        _ => None,
    }
}

/// Decodes `rec_len`, which borrows its low bits on 64 KiB blocks.
fn rec_len_from_disk(raw: u16, block_size: usize) -> usize {
    let len = usize::from(raw);
    if block_size >= 65536 && (raw == 0xFFFF || raw == 0) {
        return block_size;
    }
    (len & 0xFFFC) | ((len & 0x3) << 16)
}

/// Parses every live record of a linear directory block.
///
/// Deleted records (inode 0) are skipped and parsing stops at a checksum
/// tail. When `has_filetype` is off the type byte is really the high byte
/// of the name length and is ignored.
pub(crate) fn parse_dir_block(block: &[u8], has_filetype: bool) -> Result<Vec<RawDirEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0_usize;

    while offset + DIR_ENTRY_HEADER <= block.len() {
        let inode = read_le_u32(block, offset)?;
        let rec_len = rec_len_from_disk(read_le_u16(block, offset + 4)?, block.len());
        let name_len = usize::from(read_u8(block, offset + 6)?);
        let file_type = read_u8(block, offset + 7)?;

        if rec_len < DIR_ENTRY_HEADER || offset + rec_len > block.len() {
            return Err(ExtractionError::invalid_image(format!(
                "directory record at offset {offset} has bad length {rec_len}"
            )));
        }

        if inode == 0 && name_len == 0 && file_type == EXT4_FT_DIR_CSUM && rec_len == 12 {
            break;
        }

        if inode != 0 {
            let name_start = offset + DIR_ENTRY_HEADER;
            if name_start + name_len > offset + rec_len {
                return Err(ExtractionError::invalid_image(format!(
                    "directory record at offset {offset} has name past its end"
                )));
            }
            entries.push(RawDirEntry {
                inode,
                name: block[name_start..name_start + name_len].to_vec(),
                kind: if has_filetype {
                    kind_from_file_type(file_type)
                } else {
                    None
                },
            });
        }

        offset += rec_len;
    }

    Ok(entries)
}

/// Parses an inline directory.
///
/// `data` is `i_block` followed by the `system.data` attribute. It opens
/// with the parent's inode number instead of `.` and `..` records, so both
/// are synthesized in front of the stored entries.
pub(crate) fn parse_inline_dir(
    self_inode: u32,
    data: &[u8],
    i_block_len: usize,
    has_filetype: bool,
) -> Result<Vec<RawDirEntry>> {
    let parent = read_le_u32(data, 0)?;

    let mut entries = vec![
        RawDirEntry {
            inode: self_inode,
            name: b".".to_vec(),
            kind: Some(EntryKind::Directory),
        },
        RawDirEntry {
            inode: parent,
            name: b"..".to_vec(),
            kind: Some(EntryKind::Directory),
        },
    ];

    let split = i_block_len.min(data.len());
    entries.extend(parse_dir_block(
        &data[INLINE_DIR_PARENT_SIZE..split],
        has_filetype,
    )?);
    if data.len() > split {
        entries.extend(parse_dir_block(&data[split..], has_filetype)?);
    }
    Ok(entries)
}
