//! Filesystem creation, swap formatting and post-copy check/resize.

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use crate::error::Result;
use crate::process::{Cmd, Host};

/// Filesystem created on data and trailing partitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilesystemType {
    #[default]
    Ext4,
    Xfs,
    /// Accepted so a bad value does not abort a run; formatting is skipped.
    Unsupported(String),
}

impl FilesystemType {
    /// Tool that creates this filesystem.
    pub fn mkfs_program(&self) -> Option<&'static str> {
        match self {
            FilesystemType::Ext4 => Some("mkfs.ext4"),
            FilesystemType::Xfs => Some("mkfs.xfs"),
            FilesystemType::Unsupported(_) => None,
        }
    }
}

impl From<&str> for FilesystemType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "ext4" => FilesystemType::Ext4,
            "xfs" => FilesystemType::Xfs,
            other => FilesystemType::Unsupported(other.to_string()),
        }
    }
}

impl FromStr for FilesystemType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilesystemType::Ext4 => f.write_str("ext4"),
            FilesystemType::Xfs => f.write_str("xfs"),
            FilesystemType::Unsupported(other) => f.write_str(other),
        }
    }
}

/// Create `fs` on `device`, overwriting whatever is there.
pub fn make_filesystem(host: &dyn Host, fs: &FilesystemType, device: &Path) -> Result<()> {
    let cmd = match fs {
        FilesystemType::Ext4 => Cmd::new("mkfs.ext4").arg("-F"),
        FilesystemType::Xfs => Cmd::new("mkfs.xfs").args(["-f", "-n", "ftype=1"]),
        FilesystemType::Unsupported(name) => {
            warn!(filesystem = %name, device = %device.display(), "unsupported filesystem, not formatting");
            return Ok(());
        }
    };
    cmd.arg_path(device).run(host)?;
    Ok(())
}

pub fn make_swap(host: &dyn Host, device: &Path) -> Result<()> {
    Cmd::new("mkswap").arg_path(device).run(host)?;
    Ok(())
}

/// Force a consistency check, then grow the filesystem to fill its device.
///
/// e2fsck exits 1 or 2 after correcting errors; only 4 and above fail.
pub fn check_and_resize(host: &dyn Host, device: &Path) -> Result<()> {
    Cmd::new("e2fsck")
        .args(["-y", "-f"])
        .arg_path(device)
        .ok_codes([0, 1, 2])
        .run(host)?;
    Cmd::new("resize2fs").arg_path(device).run(host)?;
    Ok(())
}
