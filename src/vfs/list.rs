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

//! Formatting helpers for the directory listing commands.
//!
//! Every formatter returns an owned `String` so several of them can appear in
//! the same `format!` call.

use crate::inode::{Inode, MODE_DIR, MODE_FILE};
use std::ffi::CStr;
use std::mem::MaybeUninit;

/// Returns the Unix-style type character of `mode`: `d` for directories, `-`
/// for regular files.
pub fn type_char(mode: u16) -> char {
    if mode & MODE_DIR == MODE_DIR {
        'd'
    } else if mode & MODE_FILE == MODE_FILE {
        '-'
    } else {
        '?'
    }
}

/// Renders the low 9 permission bits of `mode` in `rwxr-xr-x` style.
pub fn permissions(mode: u16) -> String {
    b"rwxrwxrwx"
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if mode & (1 << (8 - i)) != 0 {
                *c as char
            } else {
                '-'
            }
        })
        .collect()
}

/// Returns the name of the user with ID `uid`, or the numeric ID when it is
/// not known to the host.
pub fn user_name(uid: u16) -> String {
    let mut pwd: libc::passwd = unsafe { MaybeUninit::zeroed().assume_init() };
    let mut buf = [0 as libc::c_char; 1024];
    let mut result = std::ptr::null_mut();
    let ret = unsafe {
        libc::getpwuid_r(
            uid as libc::uid_t,
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if ret == 0 && !result.is_null() {
        unsafe { CStr::from_ptr(pwd.pw_name) }
            .to_string_lossy()
            .into_owned()
    } else {
        uid.to_string()
    }
}

/// Returns the name of the group with ID `gid`, or the numeric ID when it is
/// not known to the host.
pub fn group_name(gid: u16) -> String {
    let mut grp: libc::group = unsafe { MaybeUninit::zeroed().assume_init() };
    let mut buf = [0 as libc::c_char; 1024];
    let mut result = std::ptr::null_mut();
    let ret = unsafe {
        libc::getgrgid_r(
            gid as libc::gid_t,
            &mut grp,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if ret == 0 && !result.is_null() {
        unsafe { CStr::from_ptr(grp.gr_name) }
            .to_string_lossy()
            .into_owned()
    } else {
        gid.to_string()
    }
}

/// Renders the Unix timestamp `ts` as `YYYY-mm-dd HH:MM:SS` in local time.
pub fn format_timestamp(ts: u32) -> String {
    let t = ts as libc::time_t;
    let mut tm: libc::tm = unsafe { MaybeUninit::zeroed().assume_init() };
    unsafe {
        libc::localtime_r(&t, &mut tm);
    }
    let mut buf = [0u8; 32];
    let len = unsafe {
        libc::strftime(
            buf.as_mut_ptr().cast(),
            buf.len(),
            c"%Y-%m-%d %H:%M:%S".as_ptr(),
            &tm,
        )
    };
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

/// Renders one listing line for the file `name` held by inode `inode_nbr`.
pub fn format_entry(inode_nbr: u32, inode: &Inode, name: &str) -> String {
    format!(
        "{:4} {}{} {:<10} {:<10} {:3} {:8} {} {} {} {}",
        inode_nbr,
        type_char(inode.mode),
        permissions(inode.mode),
        user_name(inode.uid),
        group_name(inode.gid),
        inode.blocks,
        inode.size,
        format_timestamp(inode.ctime),
        format_timestamp(inode.mtime),
        format_timestamp(inode.atime),
        name,
    )
}
