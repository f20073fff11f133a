//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `init` - Provision the root disk, data disks, or both
//! - `preflight` - Run preflight checks
//! - `show` - Display configuration, disks, the resolved root or the plan

mod init;
mod preflight;
pub mod show;

pub use init::cmd_init;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
