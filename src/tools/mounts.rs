//! Unmounting everything that lives on a disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::device::split_device_name;
use crate::error::Result;
use crate::process::{Cmd, Host};

pub const PROC_MOUNTS: &str = "/proc/mounts";

/// One line of `/proc/mounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub target: PathBuf,
}

/// Parse `/proc/mounts`, decoding the octal escapes used for whitespace.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let target = fields.next()?;
            Some(MountEntry {
                source: unescape(source),
                target: PathBuf::from(unescape(target)),
            })
        })
        .collect()
}

fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let value = digits.iter().fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Mount points backed by `disk` or one of its partitions, in mount order.
pub fn mounts_on_disk(entries: &[MountEntry], dev_dir: &Path, disk: &str) -> Vec<PathBuf> {
    entries
        .iter()
        .filter(|entry| {
            let Some(name) = Path::new(&entry.source)
                .strip_prefix(dev_dir)
                .ok()
                .and_then(|p| p.to_str())
            else {
                return false;
            };
            name == disk || split_device_name(name).0 == disk
        })
        .map(|entry| entry.target.clone())
        .collect()
}

/// Unmount every filesystem on `disk`, most recently mounted first.
pub fn unmount_disk(host: &dyn Host, dev_dir: &Path, disk: &str) -> Result<usize> {
    let content = host.read_file(Path::new(PROC_MOUNTS))?;
    let targets = mounts_on_disk(&parse_mounts(&content), dev_dir, disk);

    for target in targets.iter().rev() {
        info!(disk, target = %target.display(), "unmounting");
        Cmd::new("umount").arg_path(target).run(host)?;
    }
    Ok(targets.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
/dev/sda3 / ext4 rw,relatime 0 0
/dev/sda2 /boot/efi vfat rw,relatime 0 0
/dev/sdaa1 /srv xfs rw,relatime 0 0
/dev/nbd0p3 /mnt/image\\040root ext4 ro,relatime 0 0
/dev/nvme0n1p1 /data ext4 rw,relatime 0 0
";

    #[test]
    fn test_decodes_escaped_targets() {
        let entries = parse_mounts(MOUNTS);
        assert_eq!(entries[4].target, PathBuf::from("/mnt/image root"));
    }

    #[test]
    fn test_selects_only_partitions_of_disk() {
        let entries = parse_mounts(MOUNTS);
        let dev = Path::new("/dev");

        assert_eq!(
            mounts_on_disk(&entries, dev, "sda"),
            vec![PathBuf::from("/"), PathBuf::from("/boot/efi")]
        );
        assert_eq!(
            mounts_on_disk(&entries, dev, "nbd0"),
            vec![PathBuf::from("/mnt/image root")]
        );
        assert_eq!(
            mounts_on_disk(&entries, dev, "nvme0n1"),
            vec![PathBuf::from("/data")]
        );
        assert!(mounts_on_disk(&entries, dev, "sdb").is_empty());
    }
}
