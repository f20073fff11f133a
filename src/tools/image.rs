//! Raw image staging with `qemu-img`.

use std::path::Path;

use crate::error::Result;
use crate::process::{Cmd, Host};

/// Block size handed to `qemu-img dd`.
const DD_BLOCK_SIZE: &str = "16M";

/// Convert `image` (container `format`) to raw bytes written over `disk`.
pub fn write_image_to_disk(host: &dyn Host, image: &Path, format: &str, disk: &Path) -> Result<()> {
    Cmd::new("qemu-img")
        .args(["dd", "-f", format, "-O", "raw"])
        .arg(format!("bs={DD_BLOCK_SIZE}"))
        .arg(format!("if={}", image.display()))
        .arg(format!("of={}", disk.display()))
        .run(host)?;
    Ok(())
}
