//! Lowest-level access to the image: fixed-size block reads and writes.
//!
//! Every operation opens the image, acts and closes it again, so no descriptor
//! or cache survives between calls. Callers are expected to handle errors; no
//! message is printed here.

use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// The size of a block in bytes.
pub const BLOCK_SIZE: usize = 1024;

/// A raw block buffer.
pub type Block = [u8; BLOCK_SIZE];

/// Creates the image file at `path`, zero-filled to `total_blocks` blocks.
///
/// Fails if a file already exists at `path`.
pub fn create_device(path: &Path, total_blocks: u32) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o644)
        .open(path)?;
    let zero: Block = [0; BLOCK_SIZE];
    for _ in 0..total_blocks {
        file.write_all(&zero)?;
    }
    Ok(())
}

/// Reads block `n` of the image into `buf`.
pub fn read_block(path: &Path, n: u32, buf: &mut Block) -> io::Result<()> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))?;
    file.read_exact(buf)
}

/// Writes `buf` as block `n` of the image.
pub fn write_block(path: &Path, n: u32, buf: &Block) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))?;
    file.write_all(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn device_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img");
        create_device(&path, 10).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 10 * BLOCK_SIZE as u64);
        // a second create on the same path must fail
        create_device(&path, 10).unwrap_err();
    }

    #[test]
    fn block_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img");
        create_device(&path, 4).unwrap();

        let mut buf: Block = [0; BLOCK_SIZE];
        buf[0] = 0xab;
        buf[BLOCK_SIZE - 1] = 0xcd;
        write_block(&path, 2, &buf).unwrap();

        let mut out: Block = [0; BLOCK_SIZE];
        read_block(&path, 2, &mut out).unwrap();
        assert_eq!(buf, out);

        // neighbours stay zeroed
        read_block(&path, 1, &mut out).unwrap();
        assert!(out.iter().all(|b| *b == 0));

        // reading past the end of the image is an error
        read_block(&path, 4, &mut out).unwrap_err();
    }
}
