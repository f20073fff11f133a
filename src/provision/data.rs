//! Data disk initialization.

use std::path::{Path, PathBuf};

use tracing::info;

use super::Provisioner;
use crate::device::{list_disks, locate_root_disk};
use crate::error::{Result, StepContext};
use crate::tools::nbd::NBD_DEVICE;
use crate::tools::{delete_partitions, make_filesystem, partprobe, write_gpt_label};

impl Provisioner<'_> {
    /// Format every disk except the root disk.
    pub fn init_data_disk(&self) -> Result<()> {
        self.template.validate()?;
        let root = locate_root_disk(self.host, self.template.root_raid()?)
            .step("locate root disk")?;
        self.init_data_disks_excluding(&root.name)
    }

    /// Format every disk other than `root_disk` and the staging device.
    pub fn init_data_disks_excluding(&self, root_disk: &str) -> Result<()> {
        info!("init data disk begin");
        for device in self.data_disks(root_disk)? {
            info!(device = %device.display(), "format data disk");
            self.format_data_disk(&device)
                .with_step(|| format!("format data disk {}", device.display()))?;
        }
        info!("init data disk end");
        Ok(())
    }

    /// Device paths of the data disks, from a fresh inventory.
    pub fn data_disks(&self, root_disk: &str) -> Result<Vec<PathBuf>> {
        let disks = list_disks(self.host, None).step("list data disks")?;
        Ok(disks
            .iter()
            .filter(|d| d.name != root_disk && !d.name.starts_with(nbd_prefix()))
            .map(|d| self.options.device_path(&d.name))
            .collect())
    }

    fn format_data_disk(&self, device: &Path) -> Result<()> {
        delete_partitions(self.host, device)?;
        write_gpt_label(self.host, device)?;
        partprobe(self.host, device)?;
        make_filesystem(self.host, &self.options.filesystem, device)
    }
}

fn nbd_prefix() -> &'static str {
    NBD_DEVICE.trim_end_matches(|c: char| c.is_ascii_digit())
}
