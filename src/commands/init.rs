//! Init command - provisions disks.

use anyhow::{Context, Result};
use tracing::info;

use diskinit::config::Config;
use diskinit::process::SystemHost;
use diskinit::provision::{DiskType, Provisioner};
use diskinit::template::Template;
use diskinit::timing::Timer;

/// Execute the init command.
pub fn cmd_init(config: &Config, disk_type: DiskType) -> Result<()> {
    let template = Template::load(&config.template)
        .with_context(|| format!("Failed to load template {}", config.template.display()))?;
    template
        .validate()
        .context("Template is not usable; nothing was touched")?;

    let options = config.to_options();
    let host = SystemHost;
    let provisioner = Provisioner::new(&host, &template, &options);

    info!(disk_type = %disk_type, image = %config.image.display(), "init begin");
    let timer = Timer::start("init");
    provisioner
        .run_init(disk_type)
        .with_context(|| format!("Failed to initialize {disk_type} disk"))?;
    timer.finish();

    println!("Disk initialization ({disk_type}) complete.");
    Ok(())
}
