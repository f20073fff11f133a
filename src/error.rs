//! Error taxonomy for the provisioning engine.
//!
//! Library code returns [`Result`]; the binary converts into `anyhow` at the
//! command boundary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while discovering, partitioning or populating disks.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The block-device query failed or its output could not be parsed.
    #[error("block device inventory failed: {0}")]
    Inventory(String),

    #[error("no disk devices found")]
    NoDisksFound,

    #[error("no disk detected among: {0:?}")]
    NoDiskDetected(Vec<String>),

    #[error("no root disk detected on {0}")]
    NoRootDiskDetected(String),

    /// The external tool could not be started at all.
    #[error("failed to execute '{program}'. Is it installed?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran and exited non-zero.
    #[error("exec [{command}] failed (exit code {code}), output: {output}")]
    Command {
        command: String,
        code: i32,
        output: String,
    },

    #[error("image copy pipeline failed at {stage}")]
    CopyPipeline {
        stage: &'static str,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("device {} not ready after {timeout:?}", device.display())]
    DeviceNotReady { device: PathBuf, timeout: Duration },

    #[error("invalid size '{0}'")]
    InvalidSize(String),

    #[error("invalid template: {0}")]
    Template(String),

    #[error("unexpected partition editor output: {0}")]
    PartitionTable(String),

    /// Context wrapper naming the provisioning step that failed.
    #[error("failed to {step}")]
    Step {
        step: String,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionError {
    /// Walk through [`ProvisionError::Step`] and [`ProvisionError::CopyPipeline`]
    /// wrappers to the error that actually happened.
    pub fn root_cause(&self) -> &ProvisionError {
        match self {
            ProvisionError::Step { source, .. } | ProvisionError::CopyPipeline { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Attach step context to a fallible operation.
pub trait StepContext<T> {
    fn step(self, step: impl Into<String>) -> Result<T>;

    fn with_step<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> StepContext<T> for Result<T> {
    fn step(self, step: impl Into<String>) -> Result<T> {
        self.map_err(|source| ProvisionError::Step {
            step: step.into(),
            source: Box::new(source),
        })
    }

    fn with_step<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ProvisionError::Step {
            step: f().into(),
            source: Box::new(source),
        })
    }
}
