//! Configuration management for diskinit.
//!
//! Reads configuration from the process environment. `main` loads a `.env`
//! file into the environment first, so real environment variables win over
//! the file. Command-line flags override both.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::device::DEV_DIR;
use crate::provision::{ProvisionOptions, DEFAULT_IMAGE, DEFAULT_IMAGE_FORMAT};
use crate::tools::{FilesystemType, NbdSettings};

/// Default location of the operator template.
pub const DEFAULT_TEMPLATE: &str = "/etc/diskinit/template.json";

/// Default upper bound on waiting for the staging device, in seconds.
pub const DEFAULT_NBD_TIMEOUT_SECS: u64 = 30;

pub const ENV_TEMPLATE: &str = "DISKINIT_TEMPLATE";
pub const ENV_IMAGE: &str = "DISKINIT_IMAGE";
pub const ENV_IMAGE_FORMAT: &str = "DISKINIT_IMAGE_FORMAT";
pub const ENV_FS: &str = "DISKINIT_FS";
pub const ENV_DEV_DIR: &str = "DISKINIT_DEV_DIR";
pub const ENV_NBD_TIMEOUT_SECS: &str = "DISKINIT_NBD_TIMEOUT_SECS";
pub const ENV_LOG_FILE: &str = "DISKINIT_LOG_FILE";

/// Log file named by the environment. Read on its own so logging can start
/// before the rest of the configuration is parsed.
pub fn log_file_from_env() -> Option<PathBuf> {
    log_file_from_lookup(|key| env::var(key).ok())
}

fn log_file_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    lookup(ENV_LOG_FILE)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// diskinit configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Operator template file.
    pub template: PathBuf,
    /// OS image written onto the root disk.
    pub image: PathBuf,
    /// Container format of `image` (qcow2, raw, ...).
    pub image_format: String,
    /// Filesystem for trailing and data partitions.
    pub filesystem: FilesystemType,
    pub dev_dir: PathBuf,
    pub nbd_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template: PathBuf::from(DEFAULT_TEMPLATE),
            image: PathBuf::from(DEFAULT_IMAGE),
            image_format: DEFAULT_IMAGE_FORMAT.to_string(),
            filesystem: FilesystemType::default(),
            dev_dir: PathBuf::from(DEV_DIR),
            nbd_timeout: Duration::from_secs(DEFAULT_NBD_TIMEOUT_SECS),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let nbd_timeout = match get(ENV_NBD_TIMEOUT_SECS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(key = ENV_NBD_TIMEOUT_SECS, value = %raw, "not a number, using default");
                    defaults.nbd_timeout
                }
            },
            None => defaults.nbd_timeout,
        };

        Self {
            template: get(ENV_TEMPLATE).map(PathBuf::from).unwrap_or(defaults.template),
            image: get(ENV_IMAGE).map(PathBuf::from).unwrap_or(defaults.image),
            image_format: get(ENV_IMAGE_FORMAT).unwrap_or(defaults.image_format),
            filesystem: get(ENV_FS)
                .map(|fs| FilesystemType::from(fs.as_str()))
                .unwrap_or(defaults.filesystem),
            dev_dir: get(ENV_DEV_DIR).map(PathBuf::from).unwrap_or(defaults.dev_dir),
            nbd_timeout,
            log_file: log_file_from_lookup(&lookup),
        }
    }

    /// Engine options for this configuration.
    pub fn to_options(&self) -> ProvisionOptions {
        ProvisionOptions {
            filesystem: self.filesystem.clone(),
            image: self.image.clone(),
            image_format: self.image_format.clone(),
            dev_dir: self.dev_dir.clone(),
            nbd: NbdSettings {
                dev_dir: self.dev_dir.clone(),
                settle_timeout: self.nbd_timeout,
                ..NbdSettings::default()
            },
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  {ENV_TEMPLATE}: {}", self.template.display());
        println!("  {ENV_IMAGE}: {}", self.image.display());
        println!("  {ENV_IMAGE_FORMAT}: {}", self.image_format);
        println!("  {ENV_FS}: {}", self.filesystem);
        println!("  {ENV_DEV_DIR}: {}", self.dev_dir.display());
        println!("  {ENV_NBD_TIMEOUT_SECS}: {}", self.nbd_timeout.as_secs());
        match &self.log_file {
            Some(path) => println!("  {ENV_LOG_FILE}: {}", path.display()),
            None => println!("  {ENV_LOG_FILE}: (stderr only)"),
        }
        if self.image.exists() {
            println!("  Image: FOUND");
        } else {
            println!("  Image: NOT FOUND");
        }
    }
}
