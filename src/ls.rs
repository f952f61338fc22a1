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

//! The `ls` tool lists the root directory of an image.
//!
//! `lsort` is implemented in the same module; it has the same output, with
//! entries sorted by name instead of slot order.

use std::env::ArgsOs;
use std::path::PathBuf;
use vfs::list::format_entry;
use vfs::{dir, error, inode};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The path to the image.
    image: Option<PathBuf>,
}

fn parse_args(args: ArgsOs) -> Args {
    let mut res: Args = Default::default();
    for arg in args {
        if res.image.is_none() {
            res.image = Some(PathBuf::from(arg));
        }
    }
    res
}

/// `sorted` tells whether the program is run as `lsort`.
pub fn main(sorted: bool, args: ArgsOs) {
    let bin = if sorted { "lsort" } else { "ls" };
    let args = parse_args(args);
    let Some(image) = args.image else {
        error(bin, "specify path to an image");
    };

    let mut entries = dir::entries(&image).unwrap_or_else(|e| {
        error(bin, format_args!("{}: {e}", image.display()));
    });
    if sorted {
        entries.sort_by(|(_, a), (_, b)| a.cmp(b));
    }
    for (inode_nbr, name) in entries {
        match inode::read_inode(&image, inode_nbr) {
            Ok(in_) => println!("{}", format_entry(inode_nbr, &in_, &name)),
            Err(e) => eprintln!("{bin}: cannot read inode {inode_nbr}: {e}"),
        }
    }
}
