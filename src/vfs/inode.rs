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

//! The inode table and block addressing.
//!
//! Inodes occupy a contiguous region right after the superblock, 16 per
//! block. Inode 0 is never used since 0 marks a free directory entry; inode 1
//! is the root directory. A file addresses its data through 7 direct pointers
//! and one single-indirect block of 256 pointers.

use crate::bitmap;
use crate::block::{self, BLOCK_SIZE, Block};
use crate::error::{Result, VfsError};
use crate::superblock;
use crate::util::timestamp;
use std::path::Path;

/// The inode of the root directory.
pub const ROOT_INODE: u32 = 1;
/// Size of an on-disk inode in bytes.
pub const INODE_SIZE: usize = 64;
/// Number of inodes per inode-table block.
pub const INODES_PER_BLOCK: u32 = (BLOCK_SIZE / INODE_SIZE) as u32;
/// Number of direct block pointers in an inode.
pub const DIRECT_PTRS: usize = 7;
/// Number of block pointers in the single-indirect block.
pub const INDIRECT_PTRS: usize = BLOCK_SIZE / 4;
/// Largest number of data blocks a file can address.
pub const MAX_FILE_BLOCKS: usize = DIRECT_PTRS + INDIRECT_PTRS;
/// Largest file size in bytes.
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

/// File type bits: regular file.
pub const MODE_FILE: u16 = 0x8000;
/// File type bits: directory.
pub const MODE_DIR: u16 = 0x4000;

/// In-memory copy of an on-disk inode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Inode {
    /// File type (high nibble) and Unix permissions (low 12 bits). Zero means
    /// the inode is free.
    pub mode: u16,
    /// UID of the owner.
    pub uid: u16,
    /// GID of the group.
    pub gid: u16,
    /// Number of data blocks in use, the indirect block not included.
    pub blocks: u16,
    /// File size in bytes.
    pub size: u32,
    /// Direct block pointers; zero marks an unused slot.
    pub direct: [u32; DIRECT_PTRS],
    /// Single-indirect block pointer, or zero.
    pub indirect: u32,
    /// Last access timestamp.
    pub atime: u32,
    /// Last content modification timestamp.
    pub mtime: u32,
    /// Creation timestamp.
    pub ctime: u32,
}

impl Inode {
    /// Decodes an inode from its 64-byte on-disk form.
    pub fn decode(buf: &[u8; INODE_SIZE]) -> Self {
        let u16_at = |off: usize| u16::from_le_bytes(buf[off..off + 2].try_into().unwrap());
        let u32_at = |off: usize| u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        let mut direct = [0; DIRECT_PTRS];
        for (i, d) in direct.iter_mut().enumerate() {
            *d = u32_at(12 + i * 4);
        }
        Self {
            mode: u16_at(0),
            uid: u16_at(2),
            gid: u16_at(4),
            blocks: u16_at(6),
            size: u32_at(8),
            direct,
            indirect: u32_at(40),
            atime: u32_at(44),
            mtime: u32_at(48),
            ctime: u32_at(52),
        }
    }

    /// Encodes the inode into its 64-byte on-disk form. The reserved tail is zeroed.
    pub fn encode(&self, buf: &mut [u8; INODE_SIZE]) {
        buf.fill(0);
        buf[0..2].copy_from_slice(&self.mode.to_le_bytes());
        buf[2..4].copy_from_slice(&self.uid.to_le_bytes());
        buf[4..6].copy_from_slice(&self.gid.to_le_bytes());
        buf[6..8].copy_from_slice(&self.blocks.to_le_bytes());
        buf[8..12].copy_from_slice(&self.size.to_le_bytes());
        for (i, d) in self.direct.iter().enumerate() {
            let off = 12 + i * 4;
            buf[off..off + 4].copy_from_slice(&d.to_le_bytes());
        }
        buf[40..44].copy_from_slice(&self.indirect.to_le_bytes());
        buf[44..48].copy_from_slice(&self.atime.to_le_bytes());
        buf[48..52].copy_from_slice(&self.mtime.to_le_bytes());
        buf[52..56].copy_from_slice(&self.ctime.to_le_bytes());
    }

    /// Tells whether the inode is unallocated.
    pub fn is_free(&self) -> bool {
        self.mode == 0
    }

    /// Tells whether the inode describes a regular file.
    pub fn is_file(&self) -> bool {
        self.mode & MODE_FILE == MODE_FILE
    }

    /// Tells whether the inode describes a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & MODE_DIR == MODE_DIR
    }
}

fn check_index(n: u32, inode_count: u32) -> Result<()> {
    if n < ROOT_INODE || n >= inode_count {
        return Err(VfsError::OutOfRange(n));
    }
    Ok(())
}

/// Reads inode `n` from the table.
pub fn read_inode(path: &Path, n: u32) -> Result<Inode> {
    let sb = superblock::read_superblock(path)?;
    check_index(n, sb.inode_count)?;

    let mut buf: Block = [0; BLOCK_SIZE];
    block::read_block(path, sb.inode_start + n / INODES_PER_BLOCK, &mut buf)?;
    let off = (n % INODES_PER_BLOCK) as usize * INODE_SIZE;
    let slot: &[u8; INODE_SIZE] = buf[off..off + INODE_SIZE].try_into().unwrap();
    Ok(Inode::decode(slot))
}

/// Writes `inode` as inode `n` of the table.
pub fn write_inode(path: &Path, n: u32, inode: &Inode) -> Result<()> {
    let sb = superblock::read_superblock(path)?;
    check_index(n, sb.inode_count)?;

    let block_num = sb.inode_start + n / INODES_PER_BLOCK;
    let mut buf: Block = [0; BLOCK_SIZE];
    block::read_block(path, block_num, &mut buf)?;
    let off = (n % INODES_PER_BLOCK) as usize * INODE_SIZE;
    let slot: &mut [u8; INODE_SIZE] = (&mut buf[off..off + INODE_SIZE]).try_into().unwrap();
    inode.encode(slot);
    block::write_block(path, block_num, &buf)?;
    Ok(())
}

/// Frees inode `n`, writing it back as all zeroes.
///
/// The root inode cannot be freed. Freeing an already-free inode is reported
/// and succeeds.
pub fn free_inode(path: &Path, n: u32) -> Result<()> {
    let mut sb = superblock::read_superblock(path)?;
    if n <= ROOT_INODE || n >= sb.inode_count {
        return Err(VfsError::OutOfRange(n));
    }
    let inode = read_inode(path, n)?;
    if inode.is_free() {
        eprintln!("warning: inode {n} was already free");
        return Ok(());
    }
    write_inode(path, n, &Inode::default())?;
    sb.free_inodes += 1;
    superblock::write_superblock(path, &sb)?;
    Ok(())
}

/// Creates an empty regular file in the first free inode and returns the
/// inode number.
///
/// `perms` holds the Unix permission bits; ownership is taken from the
/// calling process and all timestamps are set to now.
pub fn create_empty_file(path: &Path, perms: u16) -> Result<u32> {
    let mut sb = superblock::read_superblock(path)?;
    if sb.free_inodes == 0 {
        return Err(VfsError::NoSpace);
    }
    for n in ROOT_INODE + 1..sb.inode_count {
        if !read_inode(path, n)?.is_free() {
            continue;
        }
        let now = timestamp();
        let inode = Inode {
            mode: MODE_FILE | perms,
            uid: unsafe { libc::getuid() } as u16,
            gid: unsafe { libc::getgid() } as u16,
            atime: now,
            mtime: now,
            ctime: now,
            ..Default::default()
        };
        write_inode(path, n, &inode)?;
        sb.free_inodes -= 1;
        superblock::write_superblock(path, &sb)?;
        return Ok(n);
    }
    Err(VfsError::NoSpace)
}

/// Returns the physical block number backing logical block `index` of the
/// file, walking the direct pointers and then the indirect block.
///
/// An `index` at or past `inode.blocks` returns 0, the "no such block"
/// sentinel, which is not an error.
pub fn block_at(path: &Path, inode: &Inode, index: u16) -> Result<u32> {
    if index as usize >= inode.blocks as usize {
        return Ok(0);
    }
    if (index as usize) < DIRECT_PTRS {
        return Ok(inode.direct[index as usize]);
    }
    if inode.indirect == 0 {
        return Err(VfsError::Corrupted("indirect block missing"));
    }
    let mut buf: Block = [0; BLOCK_SIZE];
    block::read_block(path, inode.indirect, &mut buf)?;
    let slot = index as usize - DIRECT_PTRS;
    if slot >= INDIRECT_PTRS {
        return Err(VfsError::Corrupted("logical block index past the indirect block"));
    }
    let off = slot * 4;
    Ok(u32::from_le_bytes(buf[off..off + 4].try_into().unwrap()))
}

/// Appends the already-allocated block `new_block` at the end of the file.
///
/// The indirect block is allocated on first use; it does not count towards
/// `inode.blocks`. The caller is responsible for writing the updated inode
/// back to the table.
pub fn append_block(path: &Path, inode: &mut Inode, new_block: u32) -> Result<()> {
    let sb = superblock::read_superblock(path)?;
    if new_block < sb.data_start || new_block >= sb.total_blocks {
        return Err(VfsError::OutOfRange(new_block));
    }

    for slot in inode.direct.iter_mut() {
        if *slot == 0 {
            *slot = new_block;
            inode.blocks += 1;
            return Ok(());
        }
    }

    let mut buf: Block = [0; BLOCK_SIZE];
    if inode.indirect == 0 {
        inode.indirect = bitmap::allocate_block(path)?;
    } else {
        block::read_block(path, inode.indirect, &mut buf)?;
    }
    for slot in 0..INDIRECT_PTRS {
        let off = slot * 4;
        let ptr = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        if ptr == 0 {
            buf[off..off + 4].copy_from_slice(&new_block.to_le_bytes());
            block::write_block(path, inode.indirect, &buf)?;
            inode.blocks += 1;
            return Ok(());
        }
    }
    Err(VfsError::FileTooBig)
}

/// Releases every data block of the file, the indirect block included, and
/// resets the size and block count.
///
/// The caller is responsible for writing the updated inode back to the table.
pub fn trunc_data(path: &Path, inode: &mut Inode) -> Result<()> {
    for slot in inode.direct.iter_mut() {
        if *slot != 0 {
            bitmap::free_block(path, *slot)?;
            *slot = 0;
        }
    }
    if inode.indirect != 0 {
        let mut buf: Block = [0; BLOCK_SIZE];
        block::read_block(path, inode.indirect, &mut buf)?;
        for slot in 0..INDIRECT_PTRS {
            let off = slot * 4;
            let ptr = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
            if ptr != 0 {
                bitmap::free_block(path, ptr)?;
            }
        }
        bitmap::free_block(path, inode.indirect)?;
        inode.indirect = 0;
    }
    inode.size = 0;
    inode.blocks = 0;
    let now = timestamp();
    inode.mtime = now;
    inode.atime = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir;
    use std::path::PathBuf;

    fn scratch(dir_: &tempfile::TempDir, blocks: u32, inodes: u32) -> PathBuf {
        let path = dir_.path().join("img");
        block::create_device(&path, blocks).unwrap();
        superblock::init_superblock(&path, blocks, inodes).unwrap();
        dir::create_root_dir(&path).unwrap();
        path
    }

    #[test]
    fn codec_roundtrip() {
        let inode = Inode {
            mode: MODE_FILE | 0o644,
            uid: 1000,
            gid: 1000,
            blocks: 9,
            size: 8200,
            direct: [5, 6, 7, 8, 9, 10, 11],
            indirect: 12,
            atime: 1,
            mtime: 2,
            ctime: 3,
        };
        let mut buf = [0; INODE_SIZE];
        inode.encode(&mut buf);
        assert_eq!(Inode::decode(&buf), inode);
        // mode is stored little-endian at offset 0
        assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), MODE_FILE | 0o644);
    }

    #[test]
    fn table_roundtrip() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let inode = Inode {
            mode: MODE_FILE | 0o600,
            size: 42,
            ..Default::default()
        };
        write_inode(&path, 17, &inode).unwrap();
        assert_eq!(read_inode(&path, 17).unwrap(), inode);
        // neighbours are untouched
        assert!(read_inode(&path, 16).unwrap().is_free());
        assert!(read_inode(&path, 18).unwrap().is_free());
    }

    #[test]
    fn index_bounds() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        assert!(matches!(read_inode(&path, 0), Err(VfsError::OutOfRange(0))));
        assert!(matches!(
            read_inode(&path, 32),
            Err(VfsError::OutOfRange(32))
        ));
        // the root inode cannot be freed
        assert!(matches!(free_inode(&path, 1), Err(VfsError::OutOfRange(1))));
    }

    #[test]
    fn create_and_free() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let before = superblock::read_superblock(&path).unwrap();

        // allocation scans from inode 2 upward
        let n = create_empty_file(&path, 0o644).unwrap();
        assert_eq!(n, 2);
        let inode = read_inode(&path, n).unwrap();
        assert!(inode.is_file());
        assert_eq!(inode.mode, MODE_FILE | 0o644);
        assert_eq!(inode.size, 0);
        assert_eq!(inode.blocks, 0);
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(sb.free_inodes, before.free_inodes - 1);

        free_inode(&path, n).unwrap();
        assert!(read_inode(&path, n).unwrap().is_free());
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(sb.free_inodes, before.free_inodes);

        // freeing twice changes nothing
        free_inode(&path, n).unwrap();
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(sb.free_inodes, before.free_inodes);
    }

    #[test]
    fn append_crosses_into_indirect() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = create_empty_file(&path, 0o644).unwrap();
        let mut inode = read_inode(&path, n).unwrap();

        for i in 0..8u16 {
            let b = bitmap::allocate_block(&path).unwrap();
            append_block(&path, &mut inode, b).unwrap();
            assert_eq!(inode.blocks, i + 1);
        }
        write_inode(&path, n, &inode).unwrap();

        assert!(inode.direct.iter().all(|d| *d != 0));
        assert_ne!(inode.indirect, 0);
        // logical blocks resolve through both addressing paths
        assert_eq!(block_at(&path, &inode, 0).unwrap(), inode.direct[0]);
        assert_eq!(block_at(&path, &inode, 6).unwrap(), inode.direct[6]);
        let eighth = block_at(&path, &inode, 7).unwrap();
        assert_ne!(eighth, 0);
        assert_ne!(eighth, inode.indirect);
        // past the end: sentinel, not an error
        assert_eq!(block_at(&path, &inode, 8).unwrap(), 0);
    }

    #[test]
    fn append_rejects_foreign_blocks() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = create_empty_file(&path, 0o644).unwrap();
        let mut inode = read_inode(&path, n).unwrap();
        assert!(matches!(
            append_block(&path, &mut inode, 2),
            Err(VfsError::OutOfRange(2))
        ));
        assert!(matches!(
            append_block(&path, &mut inode, 100),
            Err(VfsError::OutOfRange(100))
        ));
    }

    #[test]
    fn trunc_releases_everything() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = create_empty_file(&path, 0o644).unwrap();
        let mut inode = read_inode(&path, n).unwrap();
        let before = superblock::read_superblock(&path).unwrap();

        for _ in 0..9 {
            let b = bitmap::allocate_block(&path).unwrap();
            append_block(&path, &mut inode, b).unwrap();
        }
        inode.size = 9 * BLOCK_SIZE as u32;
        write_inode(&path, n, &inode).unwrap();
        let sb = superblock::read_superblock(&path).unwrap();
        // 9 data blocks plus the indirect block
        assert_eq!(sb.free_blocks, before.free_blocks - 10);

        trunc_data(&path, &mut inode).unwrap();
        write_inode(&path, n, &inode).unwrap();
        assert_eq!(inode.size, 0);
        assert_eq!(inode.blocks, 0);
        assert_eq!(inode.indirect, 0);
        assert!(inode.direct.iter().all(|d| *d == 0));
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(sb.free_blocks, before.free_blocks);
    }
}
