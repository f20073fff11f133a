//! Partition-table wipe and relabel, plus kernel re-probe.

use std::path::Path;

use crate::error::Result;
use crate::process::{Cmd, Host};

/// Delete every partition on `disk`. A disk without a table is not an error.
pub fn delete_partitions(host: &dyn Host, disk: &Path) -> Result<()> {
    Cmd::new("sfdisk")
        .arg("--delete")
        .arg_path(disk)
        .allow_fail()
        .run(host)?;
    Ok(())
}

/// Write an empty GPT label to `disk`.
pub fn write_gpt_label(host: &dyn Host, disk: &Path) -> Result<()> {
    Cmd::new("sfdisk")
        .arg_path(disk)
        .stdin("label: gpt\n")
        .run(host)?;
    Ok(())
}

/// Ask the kernel to re-read the partition table of `device`.
pub fn partprobe(host: &dyn Host, device: &Path) -> Result<()> {
    Cmd::new("partprobe").arg_path(device).run(host)?;
    Ok(())
}

/// Wait for udev to finish processing events so labels are visible.
pub fn udev_settle(host: &dyn Host) -> Result<()> {
    Cmd::new("udevadm").arg("settle").allow_fail().run(host)?;
    Ok(())
}
