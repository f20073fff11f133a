//! Block-device discovery and root disk disambiguation.
//!
//! - `inventory` - parse `lsblk` into disks and partitions
//! - `matcher` - find the disk whose size fits the RAID template
//! - `resolve` - pick the root partition on that disk
//! - `name` - partition device naming (`sda1`, `nvme0n1p1`)

pub mod inventory;
pub mod matcher;
pub mod name;
pub mod resolve;

pub use inventory::{list_disks, parse_lsblk, BlockDevice};
pub use matcher::{expected_root_disk_size, find_disk_by_size, raid_multiplier, size_matches};
pub use name::{full_device_path, merge_device_name, split_device_name, DEV_DIR};
pub use resolve::{
    locate_root_disk, resolve_root, resolve_root_device, resolve_root_on_disk, resolve_root_partition,
    ResolvedRoot,
};
