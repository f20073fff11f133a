//! diskinit - root and data disk provisioning for OS installation.
//!
//! Locates the root disk by RAID geometry, writes the OS image onto it,
//! reshapes its partitions to the operator template, and formats every
//! other disk as a data volume.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use diskinit::config::Config;
use diskinit::provision::DiskType;
use diskinit::tools::FilesystemType;

#[derive(Parser)]
#[command(name = "diskinit")]
#[command(about = "Root and data disk provisioning")]
#[command(
    after_help = "QUICK START:\n  diskinit preflight         Check tools, image and template\n  diskinit show plan         Preview the root disk layout\n  diskinit init --type both  Provision root and data disks"
)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug logging (every external command line)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Template file (default: DISKINIT_TEMPLATE or /etc/diskinit/template.json)
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize disks (destructive)
    Init {
        /// Which disks to initialize
        #[arg(short = 't', long = "type", value_enum, default_value_t = InitType::Root)]
        disk_type: InitType,

        /// Filesystem for trailing and data partitions (ext4, xfs)
        #[arg(long)]
        file_system: Option<String>,

        /// OS image written onto the root disk
        #[arg(long)]
        image: Option<PathBuf>,

        /// Container format of the image
        #[arg(long)]
        image_format: Option<String>,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Run preflight checks (tools, image, template)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InitType {
    Root,
    Data,
    Both,
}

impl From<InitType> for DiskType {
    fn from(value: InitType) -> Self {
        match value {
            InitType::Root => DiskType::Root,
            InitType::Data => DiskType::Data,
            InitType::Both => DiskType::Both,
        }
    }
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show disks and their partitions
    Disks,
    /// Show the root disk and its root partition in the current table
    Root,
    /// Show the layout `init` would apply
    Plan,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    // Config::load logs its warnings, so logging comes first
    let log_file = cli.log_file.or_else(diskinit::config::log_file_from_env);
    let _log_guard = diskinit::logging::init(log_file.as_deref(), cli.verbose)?;

    let mut config = Config::load();
    config.log_file = log_file;
    if let Some(path) = cli.template {
        config.template = path;
    }

    match cli.command {
        Commands::Init {
            disk_type,
            file_system,
            image,
            image_format,
        } => {
            if let Some(fs) = file_system {
                config.filesystem = FilesystemType::from(fs.as_str());
            }
            if let Some(image) = image {
                config.image = image;
            }
            if let Some(format) = image_format {
                config.image_format = format;
            }
            commands::cmd_init(&config, disk_type.into())?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Disks => commands::show::ShowTarget::Disks,
                ShowTarget::Root => commands::show::ShowTarget::Root,
                ShowTarget::Plan => commands::show::ShowTarget::Plan,
            };
            commands::cmd_show(show_target, &config)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }
    }

    Ok(())
}
