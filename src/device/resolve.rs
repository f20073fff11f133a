//! Pick the root partition on the matched disk.

use std::fmt;
use std::path::Path;

use tracing::info;

use super::inventory::{list_disks, BlockDevice};
use super::matcher::{expected_root_disk_size, find_disk_by_size};
use super::name::{merge_device_name, split_device_name};
use crate::error::{ProvisionError, Result};
use crate::process::Host;
use crate::size::Bytes;
use crate::template::RaidSpec;

/// Label the image gives its root partition.
pub const ROOT_LABEL: &str = "root";

/// Partitions at or below this size are never taken for root by the fallback.
pub const MIN_ROOT_PARTITION: Bytes = Bytes(5 * Bytes::GIB);

/// Root disk and partition slot, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    /// Disk name, e.g. `sda` or `nvme0n1`.
    pub disk: String,
    /// Partition number of the root partition on `disk`.
    pub ordinal: u32,
}

impl ResolvedRoot {
    pub fn partition_name(&self) -> String {
        merge_device_name(&self.disk, self.ordinal)
    }

    /// Name of the partition `offset` slots after root.
    pub fn partition_after(&self, offset: u32) -> String {
        merge_device_name(&self.disk, self.ordinal + offset)
    }
}

impl fmt::Display for ResolvedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (partition {} on {})", self.partition_name(), self.ordinal, self.disk)
    }
}

/// The root partition of `disk`: labelled `root`, else the first partition
/// larger than 5 GiB that is not swap.
pub fn resolve_root_partition(disk: &BlockDevice) -> Result<&BlockDevice> {
    if disk.children.is_empty() {
        return Err(ProvisionError::NoRootDiskDetected(disk.name.clone()));
    }

    if let Some(part) = disk.children.iter().find(|p| p.label() == Some(ROOT_LABEL)) {
        return Ok(part);
    }

    disk.children
        .iter()
        .find(|p| p.size > MIN_ROOT_PARTITION && p.fstype() != Some("swap"))
        .ok_or_else(|| ProvisionError::NoRootDiskDetected(disk.name.clone()))
}

/// Match the root disk in `disks` and resolve its root partition slot.
pub fn resolve_root(disks: &[BlockDevice], raid: &RaidSpec) -> Result<ResolvedRoot> {
    let expected = expected_root_disk_size(raid)?;
    let disk = find_disk_by_size(disks, expected)?;
    let partition = resolve_root_partition(disk)?;
    let (base, ordinal) = split_device_name(&partition.name);
    Ok(ResolvedRoot { disk: base, ordinal })
}

/// Query the host and resolve the root partition slot.
pub fn resolve_root_device(host: &dyn Host, raid: &RaidSpec) -> Result<ResolvedRoot> {
    let disks = list_disks(host, None)?;
    let root = resolve_root(&disks, raid)?;
    info!(root = %root, "resolved root partition");
    Ok(root)
}

/// Resolve the root partition slot on one disk, from a fresh scoped query.
pub fn resolve_root_on_disk(host: &dyn Host, disk: &Path) -> Result<ResolvedRoot> {
    let disks = list_disks(host, Some(disk))?;
    let disk = disks
        .first()
        .ok_or(ProvisionError::NoDisksFound)?;
    let partition = resolve_root_partition(disk)?;
    let (base, ordinal) = split_device_name(&partition.name);
    let root = ResolvedRoot { disk: base, ordinal };
    info!(root = %root, "resolved root partition");
    Ok(root)
}

/// Query the host for the disk the root RAID group lives on.
pub fn locate_root_disk(host: &dyn Host, raid: &RaidSpec) -> Result<BlockDevice> {
    let disks = list_disks(host, None)?;
    let expected = expected_root_disk_size(raid)?;
    find_disk_by_size(&disks, expected).cloned()
}
