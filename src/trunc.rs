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

//! The `trunc` tool truncates files of an image to zero bytes, releasing all
//! of their data blocks.

use std::env::ArgsOs;
use std::path::{Path, PathBuf};
use vfs::error::{Result, VfsError};
use vfs::{dir, error, inode, superblock};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The path to the image.
    image: Option<PathBuf>,
    /// The names of the files to truncate.
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

fn trunc_file(image: &Path, name: &str) -> Result<()> {
    let inode_nbr = dir::lookup(image, name)?;
    if inode_nbr == 0 {
        return Err(VfsError::NotFound);
    }
    let mut in_ = inode::read_inode(image, inode_nbr)?;
    if !in_.is_file() {
        return Err(VfsError::NotRegularFile);
    }
    inode::trunc_data(image, &mut in_)?;
    inode::write_inode(image, inode_nbr, &in_)
}

pub fn main(args: ArgsOs) {
    let args = parse_args(args);
    let Some(image) = args.image else {
        error("trunc", "specify path to an image");
    };
    if args.names.is_empty() {
        error("trunc", "specify at least one file name");
    }
    if let Err(e) = superblock::read_superblock(&image) {
        error("trunc", format_args!("{}: {e}", image.display()));
    }

    for name in &args.names {
        match trunc_file(&image, name) {
            Ok(()) => println!("truncated '{name}'"),
            Err(e) => eprintln!("trunc: cannot truncate '{name}': {e}"),
        }
    }
}
