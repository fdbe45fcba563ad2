//! Logical-to-physical block mapping.
//!
//! Two schemes exist on disk: extent trees (ext4) and the classic
//! direct/indirect block map (ext2/ext3). Both are reduced to a
//! [`BlockMap`] answering "where does logical block N live".

use super::I_BLOCK_SIZE;
use super::read_le_u16;
use super::read_le_u32;
use crate::ExtractionError;
use crate::Result;

const EXT4_EXTENT_MAGIC: u16 = 0xF30A;

/// Longest initialized extent; larger lengths mark unwritten extents.
const EXT_INIT_MAX_LEN: u16 = 32768;

/// Deepest extent tree the kernel builds.
const MAX_EXTENT_DEPTH: u16 = 5;

const EXTENT_ENTRY_SIZE: usize = 12;

/// Number of direct block pointers in `i_block`.
pub(crate) const DIRECT_BLOCKS: usize = 12;

/// One contiguous run of file blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Extent {
    pub logical: u32,
    pub len: u32,
    pub physical: u64,
    pub unwritten: bool,
}

/// Where a logical block lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mapping {
    /// `run` physically contiguous blocks starting at `physical`.
    Mapped { physical: u64, run: u64 },
    /// Sparse or unwritten: reads as zeroes.
    Hole,
}

/// Source of raw blocks for walking on-disk index structures.
pub(crate) trait BlockSource {
    fn read_block(&self, block: u64) -> Result<Vec<u8>>;
    fn block_size(&self) -> u32;
}

/// Block map of one inode.
#[derive(Debug, Clone)]
pub(crate) enum BlockMap {
    /// Leaves of an extent tree, sorted by logical block.
    Extents(Vec<Extent>),
    /// Classic map: 12 direct pointers, then single, double and triple
    /// indirect blocks.
    Indirect([u32; 15]),
}

impl BlockMap {
    /// Builds the map for an inode's `i_block` area.
    pub(crate) fn load<S: BlockSource>(
        source: &S,
        i_block: &[u8; I_BLOCK_SIZE],
        uses_extents: bool,
    ) -> Result<Self> {
        if uses_extents {
            let mut extents = Vec::new();
            collect_extents(source, i_block, None, &mut extents)?;
            extents.sort_by_key(|e| e.logical);
            Ok(Self::Extents(extents))
        } else {
            let mut pointers = [0u32; 15];
            for (i, pointer) in pointers.iter_mut().enumerate() {
                *pointer = read_le_u32(i_block, i * 4)?;
            }
            Ok(Self::Indirect(pointers))
        }
    }

    /// Resolves one logical block.
    pub(crate) fn lookup<S: BlockSource>(&self, source: &S, logical: u64) -> Result<Mapping> {
        match self {
            Self::Extents(extents) => Ok(lookup_extent(extents, logical)),
            Self::Indirect(pointers) => lookup_indirect(source, pointers, logical),
        }
    }
}

fn lookup_extent(extents: &[Extent], logical: u64) -> Mapping {
    let idx = extents.partition_point(|e| u64::from(e.logical) <= logical);
    let Some(extent) = idx.checked_sub(1).map(|i| extents[i]) else {
        return Mapping::Hole;
    };

    let offset = logical - u64::from(extent.logical);
    if offset >= u64::from(extent.len) || extent.unwritten {
        return Mapping::Hole;
    }
    Mapping::Mapped {
        physical: extent.physical + offset,
        run: u64::from(extent.len) - offset,
    }
}

fn collect_extents<S: BlockSource>(
    source: &S,
    node: &[u8],
    expected_depth: Option<u16>,
    out: &mut Vec<Extent>,
) -> Result<()> {
    let magic = read_le_u16(node, 0x00)?;
    if magic != EXT4_EXTENT_MAGIC {
        return Err(ExtractionError::invalid_image(format!(
            "bad extent header magic {magic:#06x}"
        )));
    }
    let entries = usize::from(read_le_u16(node, 0x02)?);
    let depth = read_le_u16(node, 0x06)?;

    if depth > MAX_EXTENT_DEPTH {
        return Err(ExtractionError::invalid_image(format!(
            "extent tree depth {depth} exceeds {MAX_EXTENT_DEPTH}"
        )));
    }
    if expected_depth.is_some_and(|d| d != depth) {
        return Err(ExtractionError::invalid_image(
            "extent tree depth inconsistency",
        ));
    }

    for idx in 0..entries {
        let base = EXTENT_ENTRY_SIZE * (idx + 1);
        let logical = read_le_u32(node, base)?;

        if depth == 0 {
            let raw_len = read_le_u16(node, base + 4)?;
            let start_hi = u64::from(read_le_u16(node, base + 6)?);
            let start_lo = u64::from(read_le_u32(node, base + 8)?);
            let unwritten = raw_len > EXT_INIT_MAX_LEN;
            let len = if unwritten {
                raw_len - EXT_INIT_MAX_LEN
            } else {
                raw_len
            };
            out.push(Extent {
                logical,
                len: u32::from(len),
                physical: start_lo | (start_hi << 32),
                unwritten,
            });
        } else {
            let leaf_lo = u64::from(read_le_u32(node, base + 4)?);
            let leaf_hi = u64::from(read_le_u16(node, base + 8)?);
            let child = source.read_block(leaf_lo | (leaf_hi << 32))?;
            collect_extents(source, &child, Some(depth - 1), out)?;
        }
    }

    Ok(())
}

fn lookup_indirect<S: BlockSource>(
    source: &S,
    pointers: &[u32; 15],
    logical: u64,
) -> Result<Mapping> {
    let per_block = u64::from(source.block_size() / 4);

    let mut index = logical;
    if index < DIRECT_BLOCKS as u64 {
        return Ok(to_mapping(pointers[index as usize]));
    }
    index -= DIRECT_BLOCKS as u64;

    // Each level covers per_block^level blocks.
    let mut span = per_block;
    for level in 1..=3_usize {
        if index < span {
            let root = pointers[DIRECT_BLOCKS + level - 1];
            return walk_indirect(source, root, index, level, per_block);
        }
        index -= span;
        span = span.saturating_mul(per_block);
    }

    Err(ExtractionError::invalid_image(format!(
        "logical block {logical} beyond triple-indirect range"
    )))
}

fn walk_indirect<S: BlockSource>(
    source: &S,
    root: u32,
    mut index: u64,
    levels: usize,
    per_block: u64,
) -> Result<Mapping> {
    let mut block = root;
    for level in (0..levels).rev() {
        if block == 0 {
            return Ok(Mapping::Hole);
        }
        let divisor = per_block.pow(level as u32);
        let slot = (index / divisor) as usize;
        index %= divisor;
        let data = source.read_block(u64::from(block))?;
        block = read_le_u32(&data, slot * 4)?;
    }
    Ok(to_mapping(block))
}

const fn to_mapping(block: u32) -> Mapping {
    if block == 0 {
        Mapping::Hole
    } else {
        Mapping::Mapped {
            physical: block as u64,
            run: 1,
        }
    }
}
