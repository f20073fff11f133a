//! Root and data disk provisioning.
//!
//! Root disk pipeline, strictly sequential:
//! 1. Locate the root disk by the RAID template's expected size
//! 2. Clean: unmount, delete the partition table, detach the staging device
//! 3. Stage: write the OS image over the raw disk
//! 4. Fix the partition table for the real disk geometry
//! 5. Resolve the root partition slot from the staged table
//! 6. Apply the planned layout (root only, or swap + root)
//! 7. Check and resize the filesystem (failures are warnings)
//!
//! Data disks are every other disk, relabelled and formatted whole.

mod data;
pub mod layout;
pub mod pipeline;
mod root;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::device::{full_device_path, merge_device_name, ResolvedRoot, DEV_DIR};
use crate::error::Result;
use crate::process::Host;
use crate::template::Template;
use crate::tools::{FilesystemType, NbdSettings};

pub use layout::{
    partition_end, plan_layout, Extent, LayoutKind, LayoutOp, LayoutPlan, Role, END_GUARD,
};

/// Default staged image file.
pub const DEFAULT_IMAGE: &str = "osi.qcow2";
/// Default container format of the staged image.
pub const DEFAULT_IMAGE_FORMAT: &str = "qcow2";

/// Which disks a run initializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiskType {
    #[default]
    Root,
    Data,
    Both,
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiskType::Root => "root",
            DiskType::Data => "data",
            DiskType::Both => "both",
        })
    }
}

/// Run-wide settings besides the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Filesystem for trailing and data partitions.
    pub filesystem: FilesystemType,
    pub image: PathBuf,
    pub image_format: String,
    pub dev_dir: PathBuf,
    pub nbd: NbdSettings,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            filesystem: FilesystemType::default(),
            image: PathBuf::from(DEFAULT_IMAGE),
            image_format: DEFAULT_IMAGE_FORMAT.to_string(),
            dev_dir: PathBuf::from(DEV_DIR),
            nbd: NbdSettings::default(),
        }
    }
}

impl ProvisionOptions {
    pub fn device_path(&self, name: &str) -> PathBuf {
        full_device_path(&self.dev_dir, name)
    }

    pub fn partition_path(&self, disk: &str, ordinal: u32) -> PathBuf {
        self.device_path(&merge_device_name(disk, ordinal))
    }
}

/// The provisioning engine for one host and one template.
pub struct Provisioner<'a> {
    host: &'a dyn Host,
    template: &'a Template,
    options: &'a ProvisionOptions,
}

impl<'a> Provisioner<'a> {
    pub fn new(host: &'a dyn Host, template: &'a Template, options: &'a ProvisionOptions) -> Self {
        Self {
            host,
            template,
            options,
        }
    }

    fn disk_path(&self, root: &ResolvedRoot) -> PathBuf {
        self.options.device_path(&root.disk)
    }

    fn image(&self) -> &Path {
        &self.options.image
    }

    /// Initialize the disks selected by `disk_type`.
    pub fn run_init(&self, disk_type: DiskType) -> Result<()> {
        match disk_type {
            DiskType::Root => self.init_root_disk().map(|_| ()),
            DiskType::Data => self.init_data_disk(),
            DiskType::Both => {
                let root = self.init_root_disk()?;
                self.init_data_disks_excluding(&root.disk)
            }
        }
    }
}
