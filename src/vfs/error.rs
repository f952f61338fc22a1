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

//! Error type shared by all filesystem operations.

use std::io;
use thiserror::Error;

/// An error occurring while operating on a filesystem image.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A block read or write against the image failed.
    #[error("image I/O error: {0}")]
    Io(#[from] io::Error),
    /// The superblock does not carry the expected magic number.
    #[error("not a valid filesystem image")]
    BadMagic,
    /// No free block or no free inode is left.
    #[error("no space left on image")]
    NoSpace,
    /// The file name violates the character or length rules.
    #[error("invalid file name")]
    InvalidName,
    /// A directory entry with this name already exists.
    #[error("file already exists")]
    AlreadyExists,
    /// No directory entry with this name exists.
    #[error("file not found")]
    NotFound,
    /// The entry exists but is not a regular file.
    #[error("not a regular file")]
    NotRegularFile,
    /// A block or inode number outside its legal domain.
    #[error("number out of range ({0})")]
    OutOfRange(u32),
    /// A read starting at or past the end of the file.
    #[error("offset beyond end of file")]
    OffsetBeyondEof,
    /// A write extending the file past the addressing limit.
    #[error("maximum file size exceeded")]
    FileTooBig,
    /// The on-disk state contradicts itself.
    #[error("filesystem inconsistency: {0}")]
    Corrupted(&'static str),
}

/// Result alias for filesystem operations.
pub type Result<T> = std::result::Result<T, VfsError>;
