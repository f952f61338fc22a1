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

//! The `cat` tool concatenates files of an image to the standard output.

use std::cmp::min;
use std::env::ArgsOs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fmt, io};
use vfs::block::{self, BLOCK_SIZE};
use vfs::error::{Result, VfsError};
use vfs::{dir, error, inode, superblock};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The path to the image.
    image: Option<PathBuf>,
    /// The names of the files to print.
    names: Vec<String>,
}

fn parse_args(args: ArgsOs) -> Args {
    let mut res: Args = Default::default();
    for arg in args {
        if res.image.is_none() {
            res.image = Some(PathBuf::from(arg));
        } else {
            res.names.push(arg.to_string_lossy().into_owned());
        }
    }
    res
}

/// An error occurring while streaming a file to stdout.
enum CatError {
    Vfs(VfsError),
    Stdout(io::Error),
}

impl From<VfsError> for CatError {
    fn from(e: VfsError) -> Self {
        Self::Vfs(e)
    }
}

impl fmt::Display for CatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vfs(e) => write!(f, "{e}"),
            Self::Stdout(e) => write!(f, "cannot write to stdout: {e}"),
        }
    }
}

fn lookup_file(image: &Path, name: &str) -> Result<inode::Inode> {
    let inode_nbr = dir::lookup(image, name)?;
    if inode_nbr == 0 {
        return Err(VfsError::NotFound);
    }
    let in_ = inode::read_inode(image, inode_nbr)?;
    if !in_.is_file() {
        return Err(VfsError::NotRegularFile);
    }
    Ok(in_)
}

fn cat_file(image: &Path, name: &str) -> std::result::Result<(), CatError> {
    let in_ = lookup_file(image, name)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut remaining = in_.size as usize;
    for i in 0..in_.blocks {
        if remaining == 0 {
            break;
        }
        let block_num = inode::block_at(image, &in_, i)?;
        if block_num == 0 {
            return Err(VfsError::Corrupted("file data block missing").into());
        }
        let mut buf = [0; BLOCK_SIZE];
        block::read_block(image, block_num, &mut buf).map_err(VfsError::Io)?;
        let to_print = min(remaining, BLOCK_SIZE);
        out.write_all(&buf[..to_print]).map_err(CatError::Stdout)?;
        remaining -= to_print;
    }
    Ok(())
}

pub fn main(args: ArgsOs) {
    let args = parse_args(args);
    let Some(image) = args.image else {
        error("cat", "specify path to an image");
    };
    if args.names.is_empty() {
        error("cat", "specify at least one file name");
    }
    if let Err(e) = superblock::read_superblock(&image) {
        error("cat", format_args!("{}: {e}", image.display()));
    }

    for name in &args.names {
        if let Err(e) = cat_file(&image, name) {
            eprintln!("cat: '{name}': {e}");
        }
    }
}
