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

//! Whole-image formatting.

use crate::block;
use crate::dir;
use crate::error::Result;
use crate::inode::INODES_PER_BLOCK;
use crate::superblock;
use std::path::Path;

/// Smallest accepted filesystem size in blocks.
pub const MIN_BLOCKS: u32 = 50;
/// The filesystem size limit in blocks, bounded by what the bitmap region can
/// track.
pub const MAX_BLOCKS: u32 = 64 * 1024;
/// Smallest accepted inode count: one full inode-table block.
pub const MIN_INODES: u32 = INODES_PER_BLOCK;

/// Rounds an inode count up so the inode table fills whole blocks.
pub fn round_up_inodes(count: u32) -> u32 {
    count.div_ceil(INODES_PER_BLOCK) * INODES_PER_BLOCK
}

/// Creates the image file at `path` and formats it: superblock, reserved
/// metadata blocks and the root directory.
///
/// `inode_count` is rounded up to a multiple of [`INODES_PER_BLOCK`]. Range
/// validation is left to the caller.
pub fn format_image(path: &Path, total_blocks: u32, inode_count: u32) -> Result<()> {
    block::create_device(path, total_blocks)?;
    superblock::init_superblock(path, total_blocks, round_up_inodes(inode_count))?;
    dir::create_root_dir(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;
    use std::fs;

    #[test]
    fn inode_rounding() {
        assert_eq!(round_up_inodes(16), 16);
        assert_eq!(round_up_inodes(17), 32);
        assert_eq!(round_up_inodes(32), 32);
        assert_eq!(round_up_inodes(100), 112);
    }

    #[test]
    fn format_scenario() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = dir_.path().join("img");
        format_image(&path, 100, 32).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 100 * BLOCK_SIZE as u64);
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(sb.total_blocks, 100);
        assert_eq!(sb.inode_blocks, 2);
        assert_eq!(sb.bitmap_blocks, 1);
        assert_eq!(sb.data_start, 4);
        // 4 metadata blocks and the root directory block are in use
        assert_eq!(sb.free_blocks, 95);
        // the root directory consumed one inode
        assert_eq!(sb.free_inodes, 31);
    }
}
