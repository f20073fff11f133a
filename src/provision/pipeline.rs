//! Image staging onto the raw disk and root copy through the staging device.

use std::path::Path;

use tracing::info;

use crate::error::{ProvisionError, Result};
use crate::process::{Cmd, Host};
use crate::tools::{write_image_to_disk, NbdAttachment, NbdSettings};

fn stage_failed(stage: &'static str) -> impl FnOnce(ProvisionError) -> ProvisionError {
    move |source| ProvisionError::CopyPipeline {
        stage,
        source: Box::new(source),
    }
}

/// Write `image` as raw bytes over the whole of `disk`.
pub fn stage_image(host: &dyn Host, image: &Path, format: &str, disk: &Path) -> Result<()> {
    info!(image = %image.display(), disk = %disk.display(), "writing image to disk");
    write_image_to_disk(host, image, format, disk).map_err(stage_failed("write image"))
}

/// Copy the whole attached image onto `target`.
///
/// The staging device is released on every path, including a failed copy.
pub fn copy_root_image(
    host: &dyn Host,
    image: &Path,
    format: &str,
    nbd: &NbdSettings,
    target: &Path,
) -> Result<()> {
    let attachment =
        NbdAttachment::acquire(host, image, format, nbd).map_err(stage_failed("attach image"))?;

    info!(
        source = %attachment.device_path().display(),
        target = %target.display(),
        "copying image root"
    );
    let copied = Cmd::new("cat")
        .arg_path(attachment.device_path())
        .stdout_to(target)
        .run(host);
    let released = attachment.release();

    copied.map_err(stage_failed("copy"))?;
    released.map_err(stage_failed("detach image"))
}
