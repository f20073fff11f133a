//! Partition device names.
//!
//! The kernel appends the partition number directly to a disk name (`sda` →
//! `sda1`) unless the disk name itself ends in a digit, in which case a `p`
//! separator is inserted (`nvme0n1` → `nvme0n1p1`, `nbd0` → `nbd0p1`).

use std::path::{Path, PathBuf};

/// Default device directory.
pub const DEV_DIR: &str = "/dev";

/// Split a partition name into its disk name and partition ordinal.
///
/// Names without trailing digits are returned whole with ordinal 0.
pub fn split_device_name(name: &str) -> (String, u32) {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[stem.len()..];

    let Ok(ordinal) = digits.parse::<u32>() else {
        return (name.to_string(), 0);
    };

    let base = match stem.strip_suffix('p') {
        Some(disk) if disk.ends_with(|c: char| c.is_ascii_digit()) => disk,
        _ => stem,
    };
    (base.to_string(), ordinal)
}

/// Build the partition name for `ordinal` on disk `base`.
pub fn merge_device_name(base: &str, ordinal: u32) -> String {
    if needs_p_separator(base) {
        format!("{base}p{ordinal}")
    } else {
        format!("{base}{ordinal}")
    }
}

fn needs_p_separator(base: &str) -> bool {
    base.starts_with("nvme")
        || base.starts_with("nbd")
        || base.ends_with(|c: char| c.is_ascii_digit())
}

/// Absolute device node path for `name`.
pub fn full_device_path(dev_dir: &Path, name: &str) -> PathBuf {
    dev_dir.join(name)
}
