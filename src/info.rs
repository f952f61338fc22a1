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

//! The `info` tool prints the superblock and a visualization of the block
//! bitmap of an image.

use std::cmp::min;
use std::env::ArgsOs;
use std::path::PathBuf;
use vfs::bitmap::render_bitmap;
use vfs::block::{self, BLOCK_SIZE};
use vfs::error;
use vfs::inode::INODE_SIZE;
use vfs::superblock::{self, BITS_PER_BLOCK, Superblock};

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

fn print_superblock(sb: &Superblock) {
    println!("Superblock:");
    println!("  Magic: 0x{:08X}", sb.magic);
    println!("  Block size: {} bytes", sb.block_size);
    println!("  Total blocks: {}", sb.total_blocks);
    println!("  Superblock blocks: {}", sb.superblock_blocks);
    println!("  Inode blocks: {}", sb.inode_blocks);
    println!("  Bitmap blocks: {}", sb.bitmap_blocks);
    println!("  Free blocks: {}", sb.free_blocks);
    println!("  Inode size: {INODE_SIZE} bytes");
    println!("  Inode count: {}", sb.inode_count);
    println!("  Free inodes: {}", sb.free_inodes);
    println!("  Superblock start block: 0");
    println!("  Inode start block: {}", sb.inode_start);
    println!("  Bitmap start block: {}", sb.bitmap_start);
    println!("  Data start block: {}", sb.data_start);
}

pub fn main(args: ArgsOs) {
    let args = parse_args(args);
    let Some(image) = args.image else {
        error("info", "specify path to an image");
    };

    let sb = superblock::read_superblock(&image).unwrap_or_else(|e| {
        error("info", format_args!("{}: {e}", image.display()));
    });
    print_superblock(&sb);

    println!();
    println!("Block bitmap:");
    let mut remaining = sb.total_blocks;
    for i in 0..sb.bitmap_blocks {
        let mut buf = [0; BLOCK_SIZE];
        if let Err(e) = block::read_block(&image, sb.bitmap_start + i, &mut buf) {
            error(
                "info",
                format_args!("cannot read bitmap block {i}: {e}"),
            );
        }
        print!("{}", render_bitmap(&buf, min(remaining, BITS_PER_BLOCK)));
        remaining -= min(remaining, BITS_PER_BLOCK);
    }
}
