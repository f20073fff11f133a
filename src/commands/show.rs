//! Show command - displays information without touching any disk.

use anyhow::{Context, Result};

use diskinit::config::Config;
use diskinit::device::{list_disks, resolve_root_device, BlockDevice};
use diskinit::process::SystemHost;
use diskinit::provision::Provisioner;
use diskinit::template::Template;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show the block device inventory
    Disks,
    /// Show the root disk and its root partition in the current table
    Root,
    /// Show the partition operations `init` would perform
    Plan,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    let host = SystemHost;
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Disks => {
            let disks = list_disks(&host, None).context("Failed to list disks")?;
            for disk in &disks {
                print!("{}", render_disk(disk));
            }
        }
        ShowTarget::Root => {
            let template = load_template(config)?;
            let raid = template.root_raid()?;
            let root = resolve_root_device(&host, raid).context("Failed to resolve root device")?;
            println!("Root disk:      {}", config.dev_dir.join(&root.disk).display());
            println!("Root partition: {}", config.dev_dir.join(root.partition_name()).display());
            println!("Ordinal:        {}", root.ordinal);
        }
        ShowTarget::Plan => {
            let template = load_template(config)?;
            let options = config.to_options();
            let provisioner = Provisioner::new(&host, &template, &options);
            let (root, plan) = provisioner.plan().context("Failed to plan layout")?;
            println!("Image:  {}", config.image.display());
            println!("Root:   {root}");
            println!("Layout: {}", plan.kind);
            for (i, op) in plan.ops.iter().enumerate() {
                println!("  {}. {op}", i + 1);
            }
        }
    }
    Ok(())
}

fn load_template(config: &Config) -> Result<Template> {
    Template::load(&config.template)
        .with_context(|| format!("Failed to load template {}", config.template.display()))
}

/// One line per disk, indented lines for its partitions.
pub fn render_disk(disk: &BlockDevice) -> String {
    let mut out = format!(
        "{:<12} {:>16} {}\n",
        disk.name,
        disk.size.to_string(),
        if disk.rotational { "hdd" } else { "ssd" }
    );
    for part in &disk.children {
        out.push_str(&format!(
            "  {:<10} {:>16} {:<6} {:<10} {}\n",
            part.name,
            part.size.to_string(),
            part.fstype().unwrap_or("-"),
            part.label().unwrap_or("-"),
            part.mountpoint.as_deref().unwrap_or("")
        ));
    }
    out
}
