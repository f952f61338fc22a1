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

//! The root directory.
//!
//! The filesystem has a single, flat directory whose entries live in the data
//! blocks of inode 1 as fixed-size records. An entry whose inode number is 0
//! is free. The directory never grows: it keeps the one data block assigned
//! at format time, which caps it at 32 entries (`.` and `..` included).

use crate::bitmap;
use crate::block::{self, BLOCK_SIZE, Block};
use crate::error::{Result, VfsError};
use crate::inode::{self, Inode, MODE_DIR, ROOT_INODE};
use crate::superblock;
use crate::util::timestamp;
use std::path::Path;

/// Size of an on-disk directory entry in bytes.
pub const DIR_ENTRY_SIZE: usize = 32;
/// Size of the name field of a directory entry; names are NUL-padded, so
/// their length is at most one less.
pub const NAME_LEN: usize = 28;
/// Number of directory entries per block.
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// One on-disk directory entry: an inode number and a NUL-padded name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DirEntry {
    /// The inode the name points at; 0 marks a free entry.
    pub inode: u32,
    /// The file name, NUL-padded to [`NAME_LEN`] bytes.
    pub name: [u8; NAME_LEN],
}

impl DirEntry {
    /// Builds an entry pointing `name` at inode `inode`.
    ///
    /// `name` must be at most `NAME_LEN - 1` bytes.
    pub fn new(name: &str, inode: u32) -> Self {
        let mut buf = [0; NAME_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Self { inode, name: buf }
    }

    /// Decodes an entry from its 32-byte on-disk form.
    pub fn decode(buf: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0; NAME_LEN];
        name.copy_from_slice(&buf[4..]);
        Self {
            inode: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            name,
        }
    }

    /// Encodes the entry into its 32-byte on-disk form.
    pub fn encode(&self, buf: &mut [u8; DIR_ENTRY_SIZE]) {
        buf[0..4].copy_from_slice(&self.inode.to_le_bytes());
        buf[4..].copy_from_slice(&self.name);
    }

    /// The name without its NUL padding.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        &self.name[..end]
    }

    /// Tells whether the entry's name is `name`.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }
}

/// Tells whether `name` is acceptable as a file name: between 1 and 27
/// characters, each of which is an ASCII letter, digit, `.`, `_` or `-`.
pub fn name_is_valid(name: &str) -> bool {
    if name.is_empty() || name.len() >= NAME_LEN {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Creates the root directory on a freshly initialized image: one data block
/// holding the `.` and `..` self-references, owned by inode 1.
pub fn create_root_dir(path: &Path) -> Result<()> {
    let sb = superblock::read_superblock(path)?;
    if sb.free_inodes == 0 || sb.free_blocks == 0 {
        return Err(VfsError::NoSpace);
    }

    let data_block = bitmap::allocate_block(path)?;
    let mut buf: Block = [0; BLOCK_SIZE];
    for (i, name) in [".", ".."].into_iter().enumerate() {
        let slot: &mut [u8; DIR_ENTRY_SIZE] = (&mut buf
            [i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE])
            .try_into()
            .unwrap();
        DirEntry::new(name, ROOT_INODE).encode(slot);
    }
    block::write_block(path, data_block, &buf)?;

    let now = timestamp();
    let mut root = Inode {
        mode: MODE_DIR | 0o755,
        uid: unsafe { libc::getuid() } as u16,
        gid: unsafe { libc::getgid() } as u16,
        blocks: 1,
        size: BLOCK_SIZE as u32,
        atime: now,
        mtime: now,
        ctime: now,
        ..Default::default()
    };
    root.direct[0] = data_block;
    inode::write_inode(path, ROOT_INODE, &root)?;

    // The allocation above rewrote the superblock; reload before updating
    let mut sb = superblock::read_superblock(path)?;
    sb.free_inodes -= 1;
    superblock::write_superblock(path, &sb)?;
    Ok(())
}

fn for_each_entry<T>(
    path: &Path,
    mut f: impl FnMut(u32, usize, &Block, &DirEntry) -> Option<T>,
) -> Result<Option<T>> {
    let root = inode::read_inode(path, ROOT_INODE)?;
    for i in 0..root.blocks {
        let block_num = inode::block_at(path, &root, i)?;
        if block_num == 0 {
            return Err(VfsError::Corrupted("root directory block missing"));
        }
        let mut buf: Block = [0; BLOCK_SIZE];
        block::read_block(path, block_num, &mut buf)?;
        for j in 0..DIR_ENTRIES_PER_BLOCK {
            let slot: &[u8; DIR_ENTRY_SIZE] = buf[j * DIR_ENTRY_SIZE..(j + 1) * DIR_ENTRY_SIZE]
                .try_into()
                .unwrap();
            let entry = DirEntry::decode(slot);
            if let Some(res) = f(block_num, j, &buf, &entry) {
                return Ok(Some(res));
            }
        }
    }
    Ok(None)
}

/// Looks `name` up in the root directory and returns its inode number, or 0
/// when no entry carries that name.
///
/// The name is not validated: a lookup may be asked about any string.
pub fn lookup(path: &Path, name: &str) -> Result<u32> {
    let found = for_each_entry(path, |_, _, _, entry| {
        (entry.inode != 0 && entry.name_matches(name)).then_some(entry.inode)
    })?;
    Ok(found.unwrap_or(0))
}

/// Adds an entry pointing `name` at inode `inode_nbr`, in the first free slot
/// of the root directory.
///
/// The inode number is not validated. Fails with `NoSpace` when every slot is
/// taken, since the directory cannot grow.
pub fn add_entry(path: &Path, name: &str, inode_nbr: u32) -> Result<()> {
    if !name_is_valid(name) {
        return Err(VfsError::InvalidName);
    }
    let written = for_each_entry(path, |block_num, j, buf, entry| {
        (entry.inode == 0).then(|| {
            let mut out = *buf;
            let slot: &mut [u8; DIR_ENTRY_SIZE] = (&mut out
                [j * DIR_ENTRY_SIZE..(j + 1) * DIR_ENTRY_SIZE])
                .try_into()
                .unwrap();
            DirEntry::new(name, inode_nbr).encode(slot);
            block::write_block(path, block_num, &out)
        })
    })?;
    match written {
        Some(res) => {
            res?;
            Ok(())
        }
        None => Err(VfsError::NoSpace),
    }
}

/// Removes the entry carrying `name` from the root directory, zeroing its
/// slot. Succeeds whether or not the name was present.
pub fn remove_entry(path: &Path, name: &str) -> Result<()> {
    let removed = for_each_entry(path, |block_num, j, buf, entry| {
        (entry.inode != 0 && entry.name_matches(name)).then(|| {
            let mut out = *buf;
            out[j * DIR_ENTRY_SIZE..(j + 1) * DIR_ENTRY_SIZE].fill(0);
            block::write_block(path, block_num, &out)
        })
    })?;
    if let Some(res) = removed {
        res?;
    }
    Ok(())
}

/// Returns every live entry of the root directory as `(inode, name)` pairs,
/// in slot order.
pub fn entries(path: &Path) -> Result<Vec<(u32, String)>> {
    let mut out = Vec::new();
    for_each_entry(path, |_, _, _, entry| {
        if entry.inode != 0 {
            out.push((
                entry.inode,
                String::from_utf8_lossy(entry.name_bytes()).into_owned(),
            ));
        }
        None::<()>
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(dir: &tempfile::TempDir, blocks: u32, inodes: u32) -> PathBuf {
        let path = dir.path().join("img");
        block::create_device(&path, blocks).unwrap();
        superblock::init_superblock(&path, blocks, inodes).unwrap();
        create_root_dir(&path).unwrap();
        path
    }

    #[test]
    fn entry_codec_roundtrip() {
        let entry = DirEntry::new("notes.txt", 5);
        let mut buf = [0; DIR_ENTRY_SIZE];
        entry.encode(&mut buf);
        let decoded = DirEntry::decode(&buf);
        assert_eq!(decoded, entry);
        assert_eq!(decoded.name_bytes(), b"notes.txt");
        assert!(decoded.name_matches("notes.txt"));
        assert!(!decoded.name_matches("notes.txt2"));
        assert!(!decoded.name_matches("notes.tx"));
    }

    #[test]
    fn name_validation() {
        assert!(name_is_valid("a"));
        assert!(name_is_valid("file-1.txt"));
        assert!(name_is_valid("A_b.C-9"));
        assert!(name_is_valid(&"x".repeat(27)));
        assert!(!name_is_valid(""));
        assert!(!name_is_valid(&"x".repeat(28)));
        assert!(!name_is_valid("a b"));
        assert!(!name_is_valid("a/b"));
        assert!(!name_is_valid("café"));
    }

    #[test]
    fn root_has_self_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir, 100, 32);

        let root = inode::read_inode(&path, ROOT_INODE).unwrap();
        assert!(root.is_dir());
        assert_eq!(root.mode, MODE_DIR | 0o755);
        assert_eq!(root.blocks, 1);
        assert_eq!(root.size, BLOCK_SIZE as u32);
        // the root's data block is the first data block of the image
        let sb = superblock::read_superblock(&path).unwrap();
        assert_eq!(root.direct[0], sb.data_start);

        assert_eq!(lookup(&path, ".").unwrap(), ROOT_INODE);
        assert_eq!(lookup(&path, "..").unwrap(), ROOT_INODE);
        assert_eq!(
            entries(&path).unwrap(),
            vec![(1, ".".to_owned()), (1, "..".to_owned())]
        );
    }

    #[test]
    fn add_lookup_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir, 100, 32);

        assert_eq!(lookup(&path, "a").unwrap(), 0);
        add_entry(&path, "a", 2).unwrap();
        assert_eq!(lookup(&path, "a").unwrap(), 2);

        remove_entry(&path, "a").unwrap();
        assert_eq!(lookup(&path, "a").unwrap(), 0);
        // removing an absent name is not an error
        remove_entry(&path, "a").unwrap();

        // the freed slot is reused
        add_entry(&path, "b", 3).unwrap();
        let names: Vec<_> = entries(&path).unwrap();
        assert_eq!(names[2], (3, "b".to_owned()));
    }

    #[test]
    fn add_rejects_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir, 100, 32);
        assert!(matches!(
            add_entry(&path, "a b", 2),
            Err(VfsError::InvalidName)
        ));
        assert!(matches!(
            add_entry(&path, "", 2),
            Err(VfsError::InvalidName)
        ));
    }

    #[test]
    fn directory_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch(&dir, 100, 32);
        // `.` and `..` occupy two of the 32 slots
        for i in 0..30 {
            add_entry(&path, &format!("f{i}"), 2).unwrap();
        }
        assert!(matches!(
            add_entry(&path, "one-too-many", 2),
            Err(VfsError::NoSpace)
        ));
    }
}
