//! Network block device attachment of the staged OS image.
//!
//! The kernel module is loaded with a single device slot. An attachment owns
//! that slot until it is released; dropping it without release disconnects
//! best-effort so an early failure never leaks the slot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::sfdisk::partprobe;
use crate::device::full_device_path;
use crate::error::{ProvisionError, Result};
use crate::process::{Cmd, Host};

/// Device slot used for staging.
pub const NBD_DEVICE: &str = "nbd0";

/// Where the kernel publishes block device sizes.
pub const SYS_BLOCK: &str = "/sys/block";

/// Settle polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbdSettings {
    pub device: String,
    pub dev_dir: PathBuf,
    pub sys_block: PathBuf,
    /// Upper bound on waiting for the device to report a size.
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for NbdSettings {
    fn default() -> Self {
        Self {
            device: NBD_DEVICE.to_string(),
            dev_dir: PathBuf::from(crate::device::DEV_DIR),
            sys_block: PathBuf::from(SYS_BLOCK),
            settle_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl NbdSettings {
    pub fn device_path(&self) -> PathBuf {
        full_device_path(&self.dev_dir, &self.device)
    }

    fn size_file(&self) -> PathBuf {
        self.sys_block.join(&self.device).join("size")
    }
}

/// Load the nbd module bounded to one device slot.
pub fn load_module(host: &dyn Host) -> Result<()> {
    Cmd::new("modprobe").args(["nbd", "nbds_max=1"]).run(host)?;
    Ok(())
}

/// Detach whatever is attached to `device`; "not attached" is not an error.
pub fn disconnect_stale(host: &dyn Host, device: &Path) -> Result<()> {
    Cmd::new("qemu-nbd")
        .arg("--disconnect")
        .arg_path(device)
        .allow_fail()
        .run(host)?;
    Ok(())
}

/// An image attached to the staging device.
pub struct NbdAttachment<'h> {
    host: &'h dyn Host,
    device: PathBuf,
    released: bool,
}

impl<'h> NbdAttachment<'h> {
    /// Attach `image` and wait until the kernel exposes its partitions.
    pub fn acquire(
        host: &'h dyn Host,
        image: &Path,
        format: &str,
        settings: &NbdSettings,
    ) -> Result<Self> {
        Self::attach(host, image, format, settings, false)
    }

    /// Attach `image` for inspection only; writes through the device fail.
    pub fn acquire_read_only(
        host: &'h dyn Host,
        image: &Path,
        format: &str,
        settings: &NbdSettings,
    ) -> Result<Self> {
        Self::attach(host, image, format, settings, true)
    }

    fn attach(
        host: &'h dyn Host,
        image: &Path,
        format: &str,
        settings: &NbdSettings,
        read_only: bool,
    ) -> Result<Self> {
        let device = settings.device_path();

        load_module(host)?;
        disconnect_stale(host, &device)?;

        let mut connect = Cmd::new("qemu-nbd").arg("--connect").arg_path(&device);
        if read_only {
            connect = connect.arg("--read-only");
        }
        connect
            .arg("--format")
            .arg(format)
            .arg_path(image)
            .run(host)?;

        let attachment = Self {
            host,
            device,
            released: false,
        };
        attachment.wait_ready(settings)?;
        partprobe(host, &attachment.device)?;

        info!(device = %attachment.device.display(), image = %image.display(), "image attached");
        Ok(attachment)
    }

    pub fn device_path(&self) -> &Path {
        &self.device
    }

    /// Poll the sysfs size until it is non-zero.
    fn wait_ready(&self, settings: &NbdSettings) -> Result<()> {
        let size_file = settings.size_file();
        let interval = settings.poll_interval.max(Duration::from_millis(1));
        let attempts = (settings.settle_timeout.as_millis() / interval.as_millis()) as u64 + 1;

        for attempt in 0..attempts {
            let sectors = self
                .host
                .read_file(&size_file)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(0);
            if sectors > 0 {
                debug!(device = %self.device.display(), sectors, attempt, "device ready");
                return Ok(());
            }
            if attempt + 1 < attempts {
                self.host.sleep(interval);
            }
        }

        Err(ProvisionError::DeviceNotReady {
            device: self.device.clone(),
            timeout: settings.settle_timeout,
        })
    }

    /// Disconnect the image, reporting failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        Cmd::new("qemu-nbd")
            .arg("--disconnect")
            .arg_path(&self.device)
            .run(self.host)?;
        info!(device = %self.device.display(), "image detached");
        Ok(())
    }
}

impl Drop for NbdAttachment<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(device = %self.device.display(), "releasing staging device after failure");
        if let Err(e) = disconnect_stale(self.host, &self.device) {
            warn!(device = %self.device.display(), error = %e, "failed to detach staging device");
        }
    }
}
