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

//! The `cp` tool copies a file from the host into the root directory of an
//! image.

use std::env::ArgsOs;
use std::fs::File;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use vfs::block::BLOCK_SIZE;
use vfs::{data, dir, error, inode, superblock};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The path to the image.
    image: Option<PathBuf>,
    /// The path to the host file to copy.
    source: Option<PathBuf>,
    /// The name of the destination file inside the image.
    dest: Option<String>,
}

fn parse_args(args: ArgsOs) -> Args {
    let mut res: Args = Default::default();
    for arg in args {
        if res.image.is_none() {
            res.image = Some(PathBuf::from(arg));
        } else if res.source.is_none() {
            res.source = Some(PathBuf::from(arg));
        } else if res.dest.is_none() {
            res.dest = Some(arg.to_string_lossy().into_owned());
        }
    }
    res
}

pub fn main(args: ArgsOs) {
    let args = parse_args(args);
    let (Some(image), Some(source), Some(dest)) = (args.image, args.source, args.dest) else {
        error("cp", "usage: cp <image> <host_path> <name>");
    };

    if let Err(e) = superblock::read_superblock(&image) {
        error("cp", format_args!("{}: {e}", image.display()));
    }
    if !dir::name_is_valid(&dest) {
        error("cp", format_args!("invalid file name '{dest}'"));
    }
    match dir::lookup(&image, &dest) {
        Ok(0) => {}
        Ok(_) => error("cp", format_args!("'{dest}' already exists")),
        Err(e) => error("cp", format_args!("{}: {e}", image.display())),
    }

    let mut src = File::open(&source).unwrap_or_else(|e| {
        error("cp", format_args!("cannot open {}: {e}", source.display()));
    });
    // the copy keeps the host file's permission bits
    let perms = src
        .metadata()
        .unwrap_or_else(|e| {
            error("cp", format_args!("cannot stat {}: {e}", source.display()));
        })
        .permissions()
        .mode() as u16
        & 0o777;

    let inode_nbr = inode::create_empty_file(&image, perms).unwrap_or_else(|e| {
        error("cp", format_args!("cannot create '{dest}': {e}"));
    });
    if let Err(e) = dir::add_entry(&image, &dest, inode_nbr) {
        error("cp", format_args!("cannot add '{dest}': {e}"));
    }

    let mut buf = [0; BLOCK_SIZE];
    let mut offset = 0;
    loop {
        let nread = src.read(&mut buf).unwrap_or_else(|e| {
            error("cp", format_args!("cannot read {}: {e}", source.display()));
        });
        if nread == 0 {
            break;
        }
        match data::write_data(&image, inode_nbr, &buf[..nread], offset) {
            Ok(n) if n == nread => {}
            Ok(_) => error("cp", format_args!("short write to '{dest}'")),
            Err(e) => error("cp", format_args!("cannot write to '{dest}': {e}")),
        }
        offset += nread;
    }
}
