//! Human-readable size strings ("1.2T", "960G", "rest").
//!
//! Two unit systems live here and must not be mixed:
//! - [`Bytes`] uses decimal units and is what disk capacities are matched in.
//! - [`MiB`] uses binary units and is what partition boundaries are computed in.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProvisionError, Result};

/// Sentinel meaning "consume all remaining free space".
pub const REST: &str = "rest";

/// A byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bytes(pub u64);

impl Bytes {
    pub const GIB: u64 = 1024 * 1024 * 1024;
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// A size in mebibytes, the unit of every partition-editor offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MiB(pub u64);

impl MiB {
    /// `None` when the sum does not fit.
    pub fn checked_add(self, rhs: MiB) -> Option<MiB> {
        self.0.checked_add(rhs.0).map(MiB)
    }
}

impl fmt::Display for MiB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MiB", self.0)
    }
}

/// Unit suffix of a size string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    M,
    G,
    T,
    P,
}

impl Unit {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'M' => Some(Unit::M),
            'G' => Some(Unit::G),
            'T' => Some(Unit::T),
            'P' => Some(Unit::P),
            _ => None,
        }
    }

    /// Multiplier into MiB (binary).
    fn mib_factor(self) -> f64 {
        match self {
            Unit::M => 1.0,
            Unit::G => 1024.0,
            Unit::T => 1024.0 * 1024.0,
            Unit::P => 1024.0 * 1024.0 * 1024.0,
        }
    }

    /// Multiplier into bytes (decimal).
    fn byte_factor(self) -> f64 {
        match self {
            Unit::M => 1e6,
            Unit::G => 1e9,
            Unit::T => 1e12,
            Unit::P => 1e15,
        }
    }
}

/// A fixed size: a non-negative number followed by a unit letter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    value: f64,
    unit: Unit,
}

impl Size {
    /// Size in binary mebibytes, truncated.
    pub fn to_mib(self) -> MiB {
        MiB((self.value * self.unit.mib_factor()) as u64)
    }

    /// Size in decimal bytes, rounded to the nearest byte.
    pub fn to_bytes(self) -> Bytes {
        Bytes((self.value * self.unit.byte_factor()).round() as u64)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            Unit::M => 'M',
            Unit::G => 'G',
            Unit::T => 'T',
            Unit::P => 'P',
        };
        write!(f, "{}{unit}", self.value)
    }
}

impl FromStr for Size {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || ProvisionError::InvalidSize(s.to_string());

        let unit = s.chars().last().and_then(Unit::from_char).ok_or_else(invalid)?;
        let number = &s[..s.len() - 1];
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;

        Ok(Size { value, unit })
    }
}

/// A template size entry: fixed, or the [`REST`] sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    Fixed(Size),
    Rest,
}

impl SizeSpec {
    pub fn is_rest(&self) -> bool {
        matches!(self, SizeSpec::Rest)
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Fixed(size) => write!(f, "{size}"),
            SizeSpec::Rest => f.write_str(REST),
        }
    }
}

impl FromStr for SizeSpec {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim() == REST {
            Ok(SizeSpec::Rest)
        } else {
            s.parse().map(SizeSpec::Fixed)
        }
    }
}

/// Parse `size` into binary mebibytes.
pub fn to_mib(size: &str) -> Result<MiB> {
    size.parse::<Size>().map(Size::to_mib)
}

/// Parse `size` into decimal bytes.
pub fn to_bytes(size: &str) -> Result<Bytes> {
    size.parse::<Size>().map(Size::to_bytes)
}
