//! Root disk initialization.

use std::path::Path;

use tracing::{info, warn};

use super::layout::{partition_end, plan_layout, Extent, LayoutOp, LayoutPlan};
use super::pipeline::{copy_root_image, stage_image};
use super::Provisioner;
use crate::device::{locate_root_disk, resolve_root_on_disk, ResolvedRoot};
use crate::error::{Result, StepContext};
use crate::timing::Timer;
use crate::tools::mounts::unmount_disk;
use crate::tools::nbd::{disconnect_stale, NbdAttachment};
use crate::tools::{
    check_and_resize, delete_partitions, make_filesystem, make_swap, partprobe, udev_settle,
    PartEnd, Parted,
};

impl Provisioner<'_> {
    /// Plan the root disk layout without touching the disk.
    ///
    /// The root slot is read from the image's own partition table, attached
    /// read-only, which is the table `init_root_disk` resolves against after
    /// staging.
    pub fn plan(&self) -> Result<(ResolvedRoot, LayoutPlan)> {
        self.template.validate()?;
        let target = locate_root_disk(self.host, self.template.root_raid()?)
            .step("locate root disk")?;
        let ordinal = self
            .image_root_ordinal()
            .step("read image partition table")?;

        let root = ResolvedRoot {
            disk: target.name,
            ordinal,
        };
        let plan = plan_layout(
            self.template.root_size()?,
            self.template.swap_size()?,
            root.ordinal,
        );
        Ok((root, plan))
    }

    fn image_root_ordinal(&self) -> Result<u32> {
        let attachment = NbdAttachment::acquire_read_only(
            self.host,
            self.image(),
            &self.options.image_format,
            &self.options.nbd,
        )?;
        udev_settle(self.host)?;
        let root = resolve_root_on_disk(self.host, attachment.device_path());
        attachment.release()?;
        root.map(|root| root.ordinal)
    }

    /// Provision the root disk end to end.
    ///
    /// The root partition slot is resolved from the freshly staged image,
    /// so a re-run lands on the same slot whatever the previous run left.
    pub fn init_root_disk(&self) -> Result<ResolvedRoot> {
        info!("init root disk begin");
        self.template.validate()?;
        let root_size = self.template.root_size()?;
        let swap_size = self.template.swap_size()?;

        let target = locate_root_disk(self.host, self.template.root_raid()?)
            .step("locate root disk")?;
        let disk = self.options.device_path(&target.name);
        info!(disk = %disk.display(), size = %target.size, "root disk");

        let timer = Timer::start("clean root disk");
        self.clean_root_disk(&target.name, &disk)
            .step("clean root disk")?;
        timer.finish();

        let timer = Timer::start("write image to disk");
        stage_image(self.host, self.image(), &self.options.image_format, &disk)
            .step("write image to disk")?;
        timer.finish();

        self.fix_partition_table(&disk)
            .step("fix partition table")?;

        let root = resolve_root_on_disk(self.host, &disk)
            .step("get root device name and number")?;
        let plan = plan_layout(root_size, swap_size, root.ordinal);

        let timer = Timer::start("apply partition layout");
        info!(root = %root, layout = %plan.kind, "applying partition layout");
        self.apply_layout(&root, &plan)
            .with_step(|| format!("apply {} layout", plan.kind))?;
        timer.finish();

        self.finalize(&disk);

        info!("init root disk end");
        Ok(root)
    }

    /// Rewrite the staged table for the real disk geometry and wait for the
    /// kernel and udev to pick up the image's partitions.
    fn fix_partition_table(&self, disk: &Path) -> Result<()> {
        Parted::new(self.host, disk).fix()?;
        partprobe(self.host, disk)?;
        udev_settle(self.host)
    }

    /// Unmount the root disk and staging device, drop the partition table
    /// and detach any stale staging attachment.
    fn clean_root_disk(&self, name: &str, disk: &Path) -> Result<()> {
        let dev_dir = &self.options.dev_dir;

        unmount_disk(self.host, dev_dir, name).step("unmount root disk")?;
        delete_partitions(self.host, disk)?;

        if let Err(e) = unmount_disk(self.host, dev_dir, &self.options.nbd.device) {
            warn!(error = %e, "failed to unmount staging device, continuing");
        }
        disconnect_stale(self.host, &self.options.nbd.device_path())?;
        Ok(())
    }

    fn apply_layout(&self, root: &ResolvedRoot, plan: &LayoutPlan) -> Result<()> {
        let parted = Parted::new(self.host, &self.disk_path(root));

        for op in &plan.ops {
            info!(op = %op, "layout");
            self.apply_op(root, &parted, op)
                .with_step(|| op.to_string())?;
        }
        Ok(())
    }

    fn apply_op(&self, root: &ResolvedRoot, parted: &Parted<'_>, op: &LayoutOp) -> Result<()> {
        let partition = |ordinal: u32| self.options.partition_path(&root.disk, ordinal);

        match *op {
            LayoutOp::ResizeRoot { ordinal, extent } => {
                let end = match extent {
                    Extent::Sized(size) => {
                        PartEnd::At(partition_end(parted.partition_start(ordinal)?, size)?)
                    }
                    Extent::Rest => PartEnd::Full,
                };
                parted.resize(ordinal, end)
            }
            LayoutOp::RemovePartition { ordinal } => parted.remove(ordinal),
            LayoutOp::CreatePartition { extent, .. } => {
                let start = parted.free_start()?;
                let end = match extent {
                    Extent::Sized(size) => PartEnd::At(partition_end(start, size)?),
                    Extent::Rest => PartEnd::Full,
                };
                parted.make_partition(start, end)
            }
            LayoutOp::FormatSwap { ordinal } => make_swap(self.host, &partition(ordinal)),
            LayoutOp::FormatData { ordinal } => {
                make_filesystem(self.host, &self.options.filesystem, &partition(ordinal))
            }
            LayoutOp::CopyImage { ordinal } => copy_root_image(
                self.host,
                self.image(),
                &self.options.image_format,
                &self.options.nbd,
                &partition(ordinal),
            ),
        }
    }

    /// Check and grow the root filesystem. Failures are logged, never fatal:
    /// the root filesystem is usable without the final resize.
    fn finalize(&self, disk: &Path) {
        let timer = Timer::start("check and resize filesystem");
        if let Err(e) = check_and_resize(self.host, disk) {
            warn!(disk = %disk.display(), error = %e, "failed to resize and check file system");
        }
        timer.finish();
    }
}
