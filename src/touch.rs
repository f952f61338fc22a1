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

//! The `touch` tool creates empty files in the root directory of an image.

use std::env::ArgsOs;
use std::path::{Path, PathBuf};
use vfs::error::{Result, VfsError};
use vfs::{dir, error, inode, superblock};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The path to the image.
    image: Option<PathBuf>,
    /// The names of the files to create.
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

fn create_file(image: &Path, name: &str) -> Result<u32> {
    if !dir::name_is_valid(name) {
        return Err(VfsError::InvalidName);
    }
    if dir::lookup(image, name)? != 0 {
        return Err(VfsError::AlreadyExists);
    }
    let inode_nbr = inode::create_empty_file(image, 0o644)?;
    if let Err(e) = dir::add_entry(image, name, inode_nbr) {
        // take the fresh inode back
        inode::free_inode(image, inode_nbr)?;
        return Err(e);
    }
    Ok(inode_nbr)
}

pub fn main(args: ArgsOs) {
    let args = parse_args(args);
    let Some(image) = args.image else {
        error("touch", "specify path to an image");
    };
    if args.names.is_empty() {
        error("touch", "specify at least one file name");
    }
    if let Err(e) = superblock::read_superblock(&image) {
        error("touch", format_args!("{}: {e}", image.display()));
    }

    for name in &args.names {
        match create_file(&image, name) {
            Ok(inode_nbr) => println!("created '{name}' (inode {inode_nbr})"),
            Err(e) => eprintln!("touch: cannot create '{name}': {e}"),
        }
    }
}
