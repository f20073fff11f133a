//! diskinit library exports.
//!
//! The binary is a thin CLI over these modules; integration tests drive the
//! engine through [`process::Host`] with a scripted host.

pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod preflight;
pub mod process;
pub mod provision;
pub mod size;
pub mod template;
pub mod timing;
pub mod tools;

pub use error::{ProvisionError, Result};
