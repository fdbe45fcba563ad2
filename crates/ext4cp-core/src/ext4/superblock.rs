//! Superblock decoding.

use super::SUPERBLOCK_SIZE;
use super::read_fixed;
use super::read_le_u16;
use super::read_le_u32;
use crate::ExtractionError;
use crate::Result;

const EXT4_SUPER_MAGIC: u16 = 0xEF53;

const INCOMPAT_COMPRESSION: u32 = 0x0001;
const INCOMPAT_FILETYPE: u32 = 0x0002;
const INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
const INCOMPAT_META_BG: u32 = 0x0010;
const INCOMPAT_64BIT: u32 = 0x0080;
const INCOMPAT_ENCRYPT: u32 = 0x10000;

/// Descriptor size used when the 64-bit feature is off.
const GROUP_DESC_SIZE_32: u16 = 32;

/// Decoded ext2/3/4 superblock fields the reader relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Total number of inodes.
    pub inodes_count: u32,
    /// First data block (1 on 1 KiB-block volumes, 0 otherwise).
    pub first_data_block: u32,
    /// Block size in bytes.
    pub block_size: u32,
    /// Blocks per block group.
    pub blocks_per_group: u32,
    /// Inodes per block group.
    pub inodes_per_group: u32,
    /// On-disk inode record size.
    pub inode_size: u16,
    /// Effective group descriptor size.
    pub desc_size: u16,
    /// Incompatible feature flags.
    pub feature_incompat: u32,
    /// Volume UUID bytes.
    pub uuid: [u8; 16],
    /// Volume label.
    pub volume_name: String,
}

impl Superblock {
    /// Parses a superblock from its 1024-byte region.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidImage` for a bad magic number or
    /// impossible geometry, and `ExtractionError::UnsupportedFeature` for
    /// compressed, encrypted, `meta_bg` or journal-device volumes.
    pub fn parse(region: &[u8]) -> Result<Self> {
        if region.len() < SUPERBLOCK_SIZE {
            return Err(ExtractionError::invalid_image("superblock region truncated"));
        }

        let magic = read_le_u16(region, 0x38)?;
        if magic != EXT4_SUPER_MAGIC {
            return Err(ExtractionError::invalid_image(format!(
                "bad superblock magic {magic:#06x}, expected {EXT4_SUPER_MAGIC:#06x}"
            )));
        }

        let log_block_size = read_le_u32(region, 0x18)?;
        if log_block_size > 6 {
            return Err(ExtractionError::invalid_image(format!(
                "unsupported block size shift {log_block_size}"
            )));
        }
        let block_size = 1024_u32 << log_block_size;

        let feature_incompat = read_le_u32(region, 0x60)?;
        check_features(feature_incompat)?;

        let inode_size = match read_le_u32(region, 0x4C)? {
            0 => 128,
            _ => read_le_u16(region, 0x58)?,
        };
        if inode_size < 128 || !inode_size.is_power_of_two() || u32::from(inode_size) > block_size
        {
            return Err(ExtractionError::invalid_image(format!(
                "invalid inode size {inode_size}"
            )));
        }

        let desc_size = if feature_incompat & INCOMPAT_64BIT == 0 {
            GROUP_DESC_SIZE_32
        } else {
            read_le_u16(region, 0xFE)?
        };
        if desc_size < GROUP_DESC_SIZE_32 || !desc_size.is_power_of_two() {
            return Err(ExtractionError::invalid_image(format!(
                "invalid group descriptor size {desc_size}"
            )));
        }

        let blocks_per_group = read_le_u32(region, 0x20)?;
        let inodes_per_group = read_le_u32(region, 0x28)?;
        if blocks_per_group == 0 || inodes_per_group == 0 {
            return Err(ExtractionError::invalid_image("empty block group geometry"));
        }

        let label = read_fixed::<16>(region, 0x78)?;
        let label_end = label.iter().position(|b| *b == 0).unwrap_or(label.len());

        Ok(Self {
            inodes_count: read_le_u32(region, 0x00)?,
            first_data_block: read_le_u32(region, 0x14)?,
            block_size,
            blocks_per_group,
            inodes_per_group,
            inode_size,
            desc_size,
            feature_incompat,
            uuid: read_fixed::<16>(region, 0x68)?,
            volume_name: String::from_utf8_lossy(&label[..label_end]).into_owned(),
        })
    }

    /// Returns the UUID in canonical `8-4-4-4-12` lowercase hex form.
    #[must_use]
    pub fn uuid_string(&self) -> String {
        let hex: Vec<String> = self.uuid.iter().map(|b| format!("{b:02x}")).collect();
        format!(
            "{}-{}-{}-{}-{}",
            hex[0..4].concat(),
            hex[4..6].concat(),
            hex[6..8].concat(),
            hex[8..10].concat(),
            hex[10..16].concat()
        )
    }

    /// Returns `true` if directory entries record the file type.
    #[must_use]
    pub const fn has_filetype(&self) -> bool {
        self.feature_incompat & INCOMPAT_FILETYPE != 0
    }

    /// Byte offset of the descriptor for `group`.
    ///
    /// The descriptor table starts in the block after the superblock.
    #[must_use]
    pub fn group_desc_offset(&self, group: u32) -> u64 {
        let table_block = u64::from(self.first_data_block) + 1;
        table_block * u64::from(self.block_size) + u64::from(group) * u64::from(self.desc_size)
    }
}

fn check_features(incompat: u32) -> Result<()> {
    let unsupported = [
        (INCOMPAT_COMPRESSION, "compression"),
        (INCOMPAT_ENCRYPT, "encrypt"),
        (INCOMPAT_META_BG, "meta_bg"),
        (INCOMPAT_JOURNAL_DEV, "journal_dev"),
    ];
    for (flag, name) in unsupported {
        if incompat & flag != 0 {
            return Err(ExtractionError::UnsupportedFeature(name.to_string()));
        }
    }
    Ok(())
}
