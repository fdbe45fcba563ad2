//! In-inode extended attribute lookup.
//!
//! Only used to find the `system.data` attribute that holds the tail of an
//! inline-data file or directory.

use super::read_le_u16;
use super::read_le_u32;
use super::read_u8;
use crate::ExtractionError;
use crate::Result;

const XATTR_MAGIC: u32 = 0xEA02_0000;
const XATTR_INDEX_SYSTEM: u8 = 7;
const ENTRY_HEADER_SIZE: usize = 16;

/// Returns the value of the `system.data` attribute stored in the inode
/// body, if any.
///
/// `ibody` is the region after the fixed inode fields, starting with the
/// attribute magic. Value offsets are relative to the first entry.
pub(crate) fn find_system_data(ibody: &[u8]) -> Result<Option<Vec<u8>>> {
    if ibody.len() < 4 || read_le_u32(ibody, 0)? != XATTR_MAGIC {
        return Ok(None);
    }

    let entries = &ibody[4..];
    let mut offset = 0_usize;

    while offset + 4 <= entries.len() {
        let name_len = usize::from(read_u8(entries, offset)?);
        let name_index = read_u8(entries, offset + 1)?;
        if name_len == 0 && name_index == 0 {
            break;
        }

        let value_offs = usize::from(read_le_u16(entries, offset + 2)?);
        let value_inum = read_le_u32(entries, offset + 4)?;
        let value_size = read_le_u32(entries, offset + 8)? as usize;

        let name_start = offset + ENTRY_HEADER_SIZE;
        let name = entries
            .get(name_start..name_start + name_len)
            .ok_or_else(|| ExtractionError::invalid_image("xattr name extends past inode"))?;

        if name_index == XATTR_INDEX_SYSTEM && name == b"data" {
            if value_inum != 0 {
                return Err(ExtractionError::UnsupportedFeature(
                    "ea_inode inline data".to_string(),
                ));
            }
            let value = entries
                .get(value_offs..value_offs + value_size)
                .ok_or_else(|| ExtractionError::invalid_image("xattr value extends past inode"))?;
            return Ok(Some(value.to_vec()));
        }

        offset = (name_start + name_len + 3) & !3;
    }

    Ok(None)
}
