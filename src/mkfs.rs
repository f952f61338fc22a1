//! The `mkfs` tool creates a filesystem inside a new image file.

use std::env::ArgsOs;
use std::path::PathBuf;
use std::process::exit;
use vfs::error;
use vfs::format::{self, MAX_BLOCKS, MIN_BLOCKS, MIN_INODES};

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// If true, print command line help.
    help: bool,
    /// The path to the image file to create.
    image: Option<PathBuf>,
    /// The total number of blocks of the filesystem.
    total_blocks: Option<u32>,
    /// The number of inodes of the filesystem.
    inode_count: Option<u32>,
}

fn parse_args(args: ArgsOs) -> Args {
    let mut res: Args = Default::default();
    for arg in args {
        match arg.to_str() {
            Some("-h" | "--help") => res.help = true,
            _ if res.image.is_none() => res.image = Some(PathBuf::from(arg)),
            Some(s) if res.total_blocks.is_none() => res.total_blocks = s.parse().ok(),
            Some(s) if res.inode_count.is_none() => res.inode_count = s.parse().ok(),
            _ => {}
        }
    }
    res
}

/// Prints command help.
fn print_help() {
    println!();
    println!("Usage:");
    println!(" mkfs <image> <total_blocks> <inode_count>");
    println!();
    println!("Creates a filesystem inside a new image file.");
    println!();
    println!(
        " total_blocks must be in [{MIN_BLOCKS}, {MAX_BLOCKS}) and inode_count at least \
         {MIN_INODES} and lower than total_blocks."
    );
}

pub fn main(args: ArgsOs) {
    let args = parse_args(args);
    if args.help {
        print_help();
        exit(0);
    }
    let Some(image) = args.image else {
        error("mkfs", "specify path to an image");
    };
    let Some(total_blocks) = args.total_blocks else {
        error("mkfs", "specify the total number of blocks");
    };
    let Some(inode_count) = args.inode_count else {
        error("mkfs", "specify the number of inodes");
    };
    if !(MIN_BLOCKS..MAX_BLOCKS).contains(&total_blocks) {
        error(
            "mkfs",
            format_args!("total_blocks must be in [{MIN_BLOCKS}, {MAX_BLOCKS})"),
        );
    }
    if inode_count < MIN_INODES || inode_count >= total_blocks {
        error(
            "mkfs",
            format_args!(
                "inode_count must be at least {MIN_INODES} and lower than total_blocks"
            ),
        );
    }

    if let Err(e) = format::format_image(&image, total_blocks, inode_count) {
        error(
            "mkfs",
            format_args!("cannot create filesystem on {}: {e}", image.display()),
        );
    }
    println!(
        "filesystem created on '{}' ({total_blocks} blocks, {} inodes)",
        image.display(),
        format::round_up_inodes(inode_count)
    );
}
