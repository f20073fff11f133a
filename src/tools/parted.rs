//! Typed `parted` invocations and free-space report parsing.
//!
//! Destructive sub-commands run with `---pretend-input-tty` and a canned
//! answer on stdin, since parted otherwise refuses to touch a table it
//! considers inconsistent or a partition that is in use.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::process::{Cmd, Host};
use crate::size::MiB;

/// End boundary of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartEnd {
    At(MiB),
    /// End of the disk.
    Full,
}

impl fmt::Display for PartEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartEnd::At(mib) => write!(f, "{mib}"),
            PartEnd::Full => f.write_str("100%"),
        }
    }
}

/// One row of `parted unit MiB print free`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRow {
    /// `None` for free-space rows.
    pub number: Option<u32>,
    pub start: MiB,
    pub end: MiB,
    pub free: bool,
}

/// Partition table as reported by parted, in MiB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    pub rows: Vec<PartitionRow>,
}

impl PartitionTable {
    /// Parse the table section of `parted unit MiB print [free]`.
    pub fn parse(output: &str) -> Result<Self> {
        let mut rows = Vec::new();
        let mut in_table = false;

        for line in output.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("Number") {
                in_table = true;
                continue;
            }
            if !in_table || trimmed.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            let (number, bounds) = match tokens.first().and_then(|t| t.parse::<u32>().ok()) {
                Some(n) => (Some(n), &tokens[1..]),
                None => (None, &tokens[..]),
            };
            if bounds.len() < 2 {
                return Err(ProvisionError::PartitionTable(trimmed.to_string()));
            }

            let start = parse_mib(bounds[0])
                .ok_or_else(|| ProvisionError::PartitionTable(trimmed.to_string()))?;
            let end = parse_mib(bounds[1])
                .ok_or_else(|| ProvisionError::PartitionTable(trimmed.to_string()))?;

            rows.push(PartitionRow {
                number,
                start,
                end,
                free: trimmed.ends_with("Free Space"),
            });
        }

        Ok(Self { rows })
    }

    pub fn partition(&self, number: u32) -> Option<&PartitionRow> {
        self.rows.iter().find(|r| r.number == Some(number))
    }

    /// Start of the last free-space region on the disk.
    pub fn last_free_start(&self) -> Option<MiB> {
        self.rows.iter().rev().find(|r| r.free).map(|r| r.start)
    }
}

/// Parse "1026MiB" / "0.02MiB", rounding up to whole MiB.
fn parse_mib(token: &str) -> Option<MiB> {
    let value: f64 = token.strip_suffix("MiB")?.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some(MiB(value.ceil() as u64))
}

/// Partition editor bound to one disk.
pub struct Parted<'h> {
    host: &'h dyn Host,
    disk: PathBuf,
}

impl<'h> Parted<'h> {
    pub fn new(host: &'h dyn Host, disk: &Path) -> Self {
        Self {
            host,
            disk: disk.to_path_buf(),
        }
    }

    fn script(&self) -> Cmd {
        Cmd::new("parted").arg("-s").arg_path(&self.disk)
    }

    fn answering(&self, answer: &str) -> Cmd {
        Cmd::new("parted")
            .arg("---pretend-input-tty")
            .arg_path(&self.disk)
            .stdin(format!("{answer}\n"))
    }

    /// Read the table including free-space rows.
    pub fn print_free(&self) -> Result<PartitionTable> {
        let result = self
            .script()
            .args(["unit", "MiB", "print", "free"])
            .run(self.host)?;
        PartitionTable::parse(&result.stdout)
    }

    /// Start of the last free region, failing if the disk has none.
    pub fn free_start(&self) -> Result<MiB> {
        self.print_free()?.last_free_start().ok_or_else(|| {
            ProvisionError::PartitionTable(format!("no free space on {}", self.disk.display()))
        })
    }

    /// Start offset of partition `number`.
    pub fn partition_start(&self, number: u32) -> Result<MiB> {
        self.print_free()?
            .partition(number)
            .map(|row| row.start)
            .ok_or_else(|| {
                ProvisionError::PartitionTable(format!(
                    "partition {number} not found on {}",
                    self.disk.display()
                ))
            })
    }

    /// Let parted relocate the backup GPT to the real end of the disk.
    pub fn fix(&self) -> Result<()> {
        self.answering("Fix").arg("print").run(self.host)?;
        Ok(())
    }

    pub fn resize(&self, number: u32, end: PartEnd) -> Result<()> {
        self.answering("Yes")
            .args(["--", "resizepart"])
            .arg(number.to_string())
            .arg(end.to_string())
            .run(self.host)?;
        Ok(())
    }

    pub fn remove(&self, number: u32) -> Result<()> {
        self.answering("Ignore")
            .arg("rm")
            .arg(number.to_string())
            .run(self.host)?;
        Ok(())
    }

    pub fn make_partition(&self, start: MiB, end: PartEnd) -> Result<()> {
        self.answering("Ignore")
            .args(["--", "mkpart", "primary"])
            .arg(start.to_string())
            .arg(end.to_string())
            .run(self.host)?;
        Ok(())
    }
}
