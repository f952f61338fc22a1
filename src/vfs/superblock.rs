/*
 * Copyright 2025 Luc Lenôtre
 *
 * This file is part of Maestro.
 *
 * Maestro is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Maestro is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Maestro. If not, see <https://www.gnu.org/licenses/>.
 */

//! The superblock, stored in block 0: filesystem geometry and free counters.
//!
//! The on-disk layout is packed little-endian, independent of the host. All
//! integers are read and written field by field at fixed offsets.

use crate::bitmap;
use crate::block::{self, BLOCK_SIZE, Block};
use crate::error::{Result, VfsError};
use crate::inode::INODES_PER_BLOCK;
use std::path::Path;

/// Magic number identifying a valid filesystem image.
pub const MAGIC: u32 = 0x2025_0604;
/// The block holding the superblock.
pub const SB_BLOCK_NUMBER: u32 = 0;
/// Number of block-occupancy bits held by one bitmap block.
pub const BITS_PER_BLOCK: u32 = (BLOCK_SIZE * 8) as u32;
/// Maximum number of bitmap blocks; bounds the total filesystem size.
pub const MAX_BITMAP_BLOCKS: usize = 8;

/// In-memory copy of the on-disk superblock.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Superblock {
    /// Magic number of the filesystem.
    pub magic: u32,
    /// Size of a block in bytes (always [`BLOCK_SIZE`]).
    pub block_size: u32,
    /// Total number of blocks in the image.
    pub total_blocks: u32,
    /// Number of blocks occupied by the superblock (always 1).
    pub superblock_blocks: u32,
    /// Number of blocks occupied by the inode table.
    pub inode_blocks: u32,
    /// Number of blocks occupied by the bitmap.
    pub bitmap_blocks: u32,
    /// Total number of inodes.
    pub inode_count: u32,
    /// Number of unallocated blocks.
    pub free_blocks: u32,
    /// Number of unallocated inodes.
    pub free_inodes: u32,
    /// Per-bitmap-block count of remaining free bits, used to speed up allocation.
    pub bitmap_zeroes: [u16; MAX_BITMAP_BLOCKS],
    /// First block of the inode table.
    pub inode_start: u32,
    /// First block of the bitmap.
    pub bitmap_start: u32,
    /// First data block.
    pub data_start: u32,
}

fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

fn get_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(buf[off..off + 2].try_into().unwrap())
}

impl Superblock {
    /// Decodes the superblock from a raw block, validating the magic number.
    pub fn decode(buf: &Block) -> Result<Self> {
        let magic = get_u32(buf, 0);
        if magic != MAGIC {
            return Err(VfsError::BadMagic);
        }
        let mut bitmap_zeroes = [0; MAX_BITMAP_BLOCKS];
        for (i, z) in bitmap_zeroes.iter_mut().enumerate() {
            *z = get_u16(buf, 36 + i * 2);
        }
        Ok(Self {
            magic,
            block_size: get_u32(buf, 4),
            total_blocks: get_u32(buf, 8),
            superblock_blocks: get_u32(buf, 12),
            inode_blocks: get_u32(buf, 16),
            bitmap_blocks: get_u32(buf, 20),
            inode_count: get_u32(buf, 24),
            free_blocks: get_u32(buf, 28),
            free_inodes: get_u32(buf, 32),
            bitmap_zeroes,
            inode_start: get_u32(buf, 52),
            bitmap_start: get_u32(buf, 56),
            data_start: get_u32(buf, 60),
        })
    }

    /// Encodes the superblock into a raw block. The remainder of the block is zeroed.
    pub fn encode(&self, buf: &mut Block) {
        buf.fill(0);
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.block_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.total_blocks.to_le_bytes());
        buf[12..16].copy_from_slice(&self.superblock_blocks.to_le_bytes());
        buf[16..20].copy_from_slice(&self.inode_blocks.to_le_bytes());
        buf[20..24].copy_from_slice(&self.bitmap_blocks.to_le_bytes());
        buf[24..28].copy_from_slice(&self.inode_count.to_le_bytes());
        buf[28..32].copy_from_slice(&self.free_blocks.to_le_bytes());
        buf[32..36].copy_from_slice(&self.free_inodes.to_le_bytes());
        for (i, z) in self.bitmap_zeroes.iter().enumerate() {
            let off = 36 + i * 2;
            buf[off..off + 2].copy_from_slice(&z.to_le_bytes());
        }
        buf[52..56].copy_from_slice(&self.inode_start.to_le_bytes());
        buf[56..60].copy_from_slice(&self.bitmap_start.to_le_bytes());
        buf[60..64].copy_from_slice(&self.data_start.to_le_bytes());
    }
}

/// Reads and validates the superblock of the image at `path`.
pub fn read_superblock(path: &Path) -> Result<Superblock> {
    let mut buf: Block = [0; BLOCK_SIZE];
    block::read_block(path, SB_BLOCK_NUMBER, &mut buf)?;
    Superblock::decode(&buf)
}

/// Writes `sb` as the superblock of the image at `path`.
///
/// A superblock whose magic number is invalid is never written.
pub fn write_superblock(path: &Path, sb: &Superblock) -> Result<()> {
    if sb.magic != MAGIC {
        return Err(VfsError::BadMagic);
    }
    let mut buf: Block = [0; BLOCK_SIZE];
    sb.encode(&mut buf);
    block::write_block(path, SB_BLOCK_NUMBER, &buf)?;
    Ok(())
}

/// Initializes the superblock of a freshly created image, then reserves every
/// metadata block in the bitmap.
///
/// `total_inodes` must already be a multiple of [`INODES_PER_BLOCK`].
///
/// The metadata blocks are reserved through the allocator itself: each call
/// must hand back exactly the next metadata block number, anything else means
/// the layout computation is wrong.
pub fn init_superblock(path: &Path, total_blocks: u32, total_inodes: u32) -> Result<()> {
    let inode_blocks = total_inodes / INODES_PER_BLOCK;
    let bitmap_blocks = total_blocks.div_ceil(BITS_PER_BLOCK);
    let inode_start = 1;
    let bitmap_start = inode_start + inode_blocks;
    let data_start = bitmap_start + bitmap_blocks;

    let mut bitmap_zeroes = [0; MAX_BITMAP_BLOCKS];
    bitmap_zeroes[0] = (BITS_PER_BLOCK - data_start) as u16;
    for z in bitmap_zeroes[1..bitmap_blocks as usize].iter_mut() {
        *z = BITS_PER_BLOCK as u16;
    }

    let sb = Superblock {
        magic: MAGIC,
        block_size: BLOCK_SIZE as u32,
        total_blocks,
        superblock_blocks: 1,
        inode_blocks,
        bitmap_blocks,
        inode_count: total_inodes,
        free_blocks: total_blocks,
        free_inodes: total_inodes,
        bitmap_zeroes,
        inode_start,
        bitmap_start,
        data_start,
    };
    write_superblock(path, &sb)?;

    // Each allocation marks the bit and decrements `free_blocks` on disk
    for i in 0..data_start {
        let n = bitmap::allocate_block(path)?;
        if n != i {
            return Err(VfsError::Corrupted("metadata blocks allocated out of order"));
        }
    }
    Ok(())
}
