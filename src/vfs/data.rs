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

//! Positional file data I/O.
//!
//! Reads and writes address the file by byte offset, with no cursor and no
//! append shortcut. Writes grow the file on demand, allocating data blocks
//! through the bitmap. A failure in the middle of an allocation run can leave
//! blocks marked allocated but not yet referenced by the inode; no rollback
//! is attempted.

use crate::bitmap;
use crate::block::{self, BLOCK_SIZE, Block};
use crate::error::{Result, VfsError};
use crate::inode::{self, MAX_FILE_SIZE};
use crate::superblock;
use crate::util::timestamp;
use std::cmp::min;
use std::path::Path;

/// Reads from the file held by inode `inode_nbr` into `buf`, starting at byte
/// `offset`, and returns the number of bytes read.
///
/// The read length is clipped to the end of the file. The access timestamp is
/// updated.
pub fn read_data(path: &Path, inode_nbr: u32, buf: &mut [u8], offset: usize) -> Result<usize> {
    let mut inode = inode::read_inode(path, inode_nbr)?;
    if offset >= inode.size as usize {
        return Err(VfsError::OffsetBeyondEof);
    }
    let len = min(buf.len(), inode.size as usize - offset);

    let start_block = offset / BLOCK_SIZE;
    let start_offset = offset % BLOCK_SIZE;
    let mut block_buf: Block = [0; BLOCK_SIZE];
    let mut copied = 0;
    for i in start_block.. {
        if copied >= len {
            break;
        }
        let block_num = inode::block_at(path, &inode, i as u16)?;
        if block_num == 0 {
            return Err(VfsError::Corrupted("file data block missing"));
        }
        block::read_block(path, block_num, &mut block_buf)?;

        let read_offset = if i == start_block { start_offset } else { 0 };
        let to_read = min(len - copied, BLOCK_SIZE - read_offset);
        buf[copied..copied + to_read]
            .copy_from_slice(&block_buf[read_offset..read_offset + to_read]);
        copied += to_read;
    }

    inode.atime = timestamp();
    inode::write_inode(path, inode_nbr, &inode)?;
    Ok(len)
}

/// Writes `buf` into the file held by inode `inode_nbr`, starting at byte
/// `offset`, and returns the number of bytes written.
///
/// Blocks are allocated as needed to cover `offset + buf.len()`; the file
/// size is extended when the write ends past it. Both the modification and
/// access timestamps are updated.
pub fn write_data(path: &Path, inode_nbr: u32, buf: &[u8], offset: usize) -> Result<usize> {
    let mut inode = inode::read_inode(path, inode_nbr)?;
    let len = buf.len();
    if offset + len > MAX_FILE_SIZE {
        return Err(VfsError::FileTooBig);
    }

    let required_blocks = (offset + len).div_ceil(BLOCK_SIZE);
    if required_blocks > inode.blocks as usize {
        let to_allocate = required_blocks - inode.blocks as usize;
        let sb = superblock::read_superblock(path)?;
        if to_allocate > sb.free_blocks as usize {
            return Err(VfsError::NoSpace);
        }
        for _ in 0..to_allocate {
            let new_block = bitmap::allocate_block(path)?;
            inode::append_block(path, &mut inode, new_block)?;
        }
    }

    let start_block = offset / BLOCK_SIZE;
    let start_offset = offset % BLOCK_SIZE;
    let mut block_buf: Block = [0; BLOCK_SIZE];
    let mut copied = 0;
    for i in start_block.. {
        if copied >= len {
            break;
        }
        let block_num = inode::block_at(path, &inode, i as u16)?;
        if block_num == 0 {
            return Err(VfsError::Corrupted("file data block missing"));
        }
        // Read-modify-write: the rest of the block must be preserved
        block::read_block(path, block_num, &mut block_buf)?;
        let write_offset = if i == start_block { start_offset } else { 0 };
        let to_write = min(len - copied, BLOCK_SIZE - write_offset);
        block_buf[write_offset..write_offset + to_write]
            .copy_from_slice(&buf[copied..copied + to_write]);
        block::write_block(path, block_num, &block_buf)?;
        copied += to_write;
    }

    if offset + len > inode.size as usize {
        inode.size = (offset + len) as u32;
    }
    let now = timestamp();
    inode.mtime = now;
    inode.atime = now;
    inode::write_inode(path, inode_nbr, &inode)?;
    Ok(len)
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
    fn data_roundtrip() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = inode::create_empty_file(&path, 0o644).unwrap();

        let payload = b"hello block filesystem";
        assert_eq!(write_data(&path, n, payload, 0).unwrap(), payload.len());
        let mut out = vec![0; payload.len()];
        assert_eq!(read_data(&path, n, &mut out, 0).unwrap(), payload.len());
        assert_eq!(&out, payload);

        let inode = inode::read_inode(&path, n).unwrap();
        assert_eq!(inode.size as usize, payload.len());
        assert_eq!(inode.blocks, 1);
    }

    #[test]
    fn write_spanning_indirect_boundary() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = inode::create_empty_file(&path, 0o644).unwrap();
        let before = superblock::read_superblock(&path).unwrap();

        let payload: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(write_data(&path, n, &payload, 0).unwrap(), payload.len());

        let inode = inode::read_inode(&path, n).unwrap();
        assert_eq!(inode.blocks, 8);
        assert_eq!(inode.size, 8192);
        assert_ne!(inode.indirect, 0);
        // 8 data blocks plus the indirect block itself
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(sb.free_blocks, before.free_blocks - 9);

        let mut out = vec![0; payload.len()];
        read_data(&path, n, &mut out, 0).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn unaligned_overwrite_preserves_neighbours() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = inode::create_empty_file(&path, 0o644).unwrap();

        write_data(&path, n, &[b'a'; 2048], 0).unwrap();
        write_data(&path, n, b"XYZ", 1000).unwrap();

        let mut out = vec![0; 2048];
        read_data(&path, n, &mut out, 0).unwrap();
        assert_eq!(&out[..1000], &[b'a'; 1000][..]);
        assert_eq!(&out[1000..1003], b"XYZ");
        assert_eq!(&out[1003..], &[b'a'; 1045][..]);
        // overwriting did not change the size
        assert_eq!(inode::read_inode(&path, n).unwrap().size, 2048);
    }

    #[test]
    fn read_clips_and_rejects_past_eof() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let n = inode::create_empty_file(&path, 0o644).unwrap();
        write_data(&path, n, b"abcdef", 0).unwrap();

        let mut out = [0; 32];
        assert_eq!(read_data(&path, n, &mut out, 2).unwrap(), 4);
        assert_eq!(&out[..4], b"cdef");
        assert!(matches!(
            read_data(&path, n, &mut out, 6),
            Err(VfsError::OffsetBeyondEof)
        ));
    }

    #[test]
    fn max_file_size_boundary() {
        let dir_ = tempfile::tempdir().unwrap();
        // enough room for the 263 data blocks plus the indirect block
        let path = scratch(&dir_, 300, 32);
        let n = inode::create_empty_file(&path, 0o644).unwrap();

        assert_eq!(write_data(&path, n, b"x", MAX_FILE_SIZE - 1).unwrap(), 1);
        let inode = inode::read_inode(&path, n).unwrap();
        assert_eq!(inode.blocks, 263);
        assert_eq!(inode.size as usize, MAX_FILE_SIZE);

        assert!(matches!(
            write_data(&path, n, b"x", MAX_FILE_SIZE),
            Err(VfsError::FileTooBig)
        ));
    }

    #[test]
    fn write_without_room_fails() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 50, 16);
        let n = inode::create_empty_file(&path, 0o644).unwrap();
        let sb = superblock::read_superblock(&path).unwrap();
        let too_much = (sb.free_blocks as usize + 1) * BLOCK_SIZE;
        assert!(matches!(
            write_data(&path, n, &vec![0; too_much], 0),
            Err(VfsError::NoSpace)
        ));
    }

    #[test]
    fn file_lifecycle_restores_counters() {
        let dir_ = tempfile::tempdir().unwrap();
        let path = scratch(&dir_, 100, 32);
        let before = superblock::read_superblock(&path).unwrap();

        let n = inode::create_empty_file(&path, 0o644).unwrap();
        dir::add_entry(&path, "a", n).unwrap();
        assert_eq!(dir::lookup(&path, "a").unwrap(), n);
        write_data(&path, n, &[7; 8192], 0).unwrap();

        dir::remove_entry(&path, "a").unwrap();
        let mut inode = inode::read_inode(&path, n).unwrap();
        inode::trunc_data(&path, &mut inode).unwrap();
        inode::free_inode(&path, n).unwrap();

        assert_eq!(dir::lookup(&path, "a").unwrap(), 0);
        let after = superblock::read_superblock(&path).unwrap();
        assert_eq!(after.free_blocks, before.free_blocks);
        assert_eq!(after.free_inodes, before.free_inodes);
    }
}
