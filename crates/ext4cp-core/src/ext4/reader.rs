//! Streaming reader over an inode's contents.

use std::io;
use std::io::Read;
use std::io::Seek;

use super::Ext4Inode;
use super::Ext4Volume;
use super::extent::BlockMap;
use super::extent::BlockSource;
use super::extent::Mapping;
use crate::Result;

/// Reads a file's bytes, or a symlink's target, straight from the image.
///
/// Contents are never buffered whole: each `read` fills the caller's
/// buffer from at most one physically contiguous run. Holes read as zeroes
/// and reads stop at the inode size even if the last block is larger.
pub struct Ext4FileReader<'a, R: Read + Seek> {
    volume: &'a Ext4Volume<R>,
    source: Source,
    pos: u64,
    size: u64,
}

enum Source {
    /// Bytes held in the inode itself.
    Inline(Vec<u8>),
    Blocks(BlockMap),
}

impl<'a, R: Read + Seek> Ext4FileReader<'a, R> {
    pub(crate) fn new(volume: &'a Ext4Volume<R>, inode: &Ext4Inode) -> Result<Self> {
        let source = if inode.is_fast_symlink() {
            Source::Inline(inode.i_block.to_vec())
        } else if inode.has_inline_data() {
            Source::Inline(inode.inline_data()?)
        } else {
            Source::Blocks(BlockMap::load(volume, &inode.i_block, inode.uses_extents())?)
        };

        let size = match &source {
            Source::Inline(data) => inode.size.min(data.len() as u64),
            Source::Blocks(_) => inode.size,
        };

        Ok(Self {
            volume,
            source,
            pos: 0,
            size,
        })
    }

    /// Total number of bytes the reader yields.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the reader yields nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl<R: Read + Seek> Read for Ext4FileReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.size.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = remaining.min(buf.len() as u64);

        let n = match &self.source {
            Source::Inline(data) => {
                let start = self.pos as usize;
                let n = want as usize;
                buf[..n].copy_from_slice(&data[start..start + n]);
                n
            }
            Source::Blocks(map) => {
                let block_size = u64::from(self.volume.block_size());
                let logical = self.pos / block_size;
                let within = self.pos % block_size;

                match map.lookup(self.volume, logical).map_err(io::Error::other)? {
                    Mapping::Hole => {
                        let n = want.min(block_size - within) as usize;
                        buf[..n].fill(0);
                        n
                    }
                    Mapping::Mapped { physical, run } => {
                        let span = run * block_size - within;
                        let n = want.min(span) as usize;
                        self.volume
                            .read_exact_at(physical * block_size + within, &mut buf[..n])
                            .map_err(io::Error::other)?;
                        n
                    }
                }
            }
        };

        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ext4::volume::tests::ImageBuilder;
    use crate::volume::InodeId;

    #[test]
    fn test_reads_extent_file_across_blocks() {
        let mut image = ImageBuilder::new();
        let data: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        image.extent_file(12, &data);
        let volume = image.open();

        let inode = volume.read_inode(InodeId(12)).unwrap();
        let mut reader = Ext4FileReader::new(&volume, &inode).unwrap();
        assert_eq!(reader.len(), 2500);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_small_reads_stop_at_size() {
        let mut image = ImageBuilder::new();
        image.extent_file(12, b"abcdefghij");
        let volume = image.open();

        let inode = volume.read_inode(InodeId(12)).unwrap();
        let mut reader = Ext4FileReader::new(&volume, &inode).unwrap();
        let mut buf = [0u8; 4];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"abcdefghij");
    }

    #[test]
    fn test_fast_symlink_target() {
        let mut image = ImageBuilder::new();
        image.fast_symlink(13, b"etc/passwd");
        let volume = image.open();

        let inode = volume.read_inode(InodeId(13)).unwrap();
        let mut target = String::new();
        Ext4FileReader::new(&volume, &inode)
            .unwrap()
            .read_to_string(&mut target)
            .unwrap();
        assert_eq!(target, "etc/passwd");
    }

    #[test]
    fn test_sparse_file_reads_zeroes() {
        let mut image = ImageBuilder::new();
        image.sparse_file(14, 3000, b"tail");
        let volume = image.open();

        let inode = volume.read_inode(InodeId(14)).unwrap();
        let mut out = Vec::new();
        Ext4FileReader::new(&volume, &inode)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out.len(), 3000);
        assert!(out[..2048].iter().all(|b| *b == 0));
        assert_eq!(&out[2048..2052], b"tail");
        assert!(out[2052..].iter().all(|b| *b == 0));
    }
}
