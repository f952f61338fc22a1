//! Main of all filesystem image commands.
//!
//! The command to run is selected from the binary name, so the tools are
//! usually installed as symlinks to this binary. Invoked under its own name,
//! the first argument selects the command instead.

mod cat;
mod cp;
mod info;
mod ls;
mod mkfs;
mod rm;
mod touch;
mod trunc;

fn main() {
    let (bin, mut args) = vfs::args();
    let bin = if bin == "vfsutils" {
        args.next()
            .and_then(|s| s.into_string().ok())
            .unwrap_or_else(|| {
                vfs::error("vfsutils", "missing command name");
            })
    } else {
        bin
    };
    let cmd = bin.strip_prefix("vfs-").unwrap_or(&bin);
    match cmd {
        "mkfs" => mkfs::main(args),
        "info" => info::main(args),
        "ls" => ls::main(false, args),
        "lsort" => ls::main(true, args),
        "touch" => touch::main(args),
        "rm" => rm::main(args),
        "cp" => cp::main(args),
        "cat" => cat::main(args),
        "trunc" => trunc::main(args),
        _ => vfs::error("vfsutils", "invalid binary name"),
    }
}
