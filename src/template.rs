//! Operator template: system-disk layout and RAID geometry.
//!
//! ```json
//! {
//!   "sysDisk": { "/": "100G", "SWAP": "16G" },
//!   "dataDisk": ["/data"],
//!   "raids": [{ "raidLevel": "R1", "raidCount": 1, "raidMembers": 2, "diskSize": "1.2T" }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::size::{Size, SizeSpec};

/// `sysDisk` key of the root filesystem.
pub const ROOT_MOUNT: &str = "/";
/// `sysDisk` key of the swap partition.
pub const SWAP_KEY: &str = "SWAP";

/// Operator input for one provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub sys_disk: BTreeMap<String, String>,
    /// Informational; data disks are selected by excluding the root disk.
    #[serde(default)]
    pub data_disk: Vec<String>,
    #[serde(default)]
    pub raids: Vec<RaidSpec>,
}

/// One RAID group. Only the first group is consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidSpec {
    #[serde(default)]
    pub raid_level: RaidLevel,
    #[serde(default)]
    pub raid_count: i64,
    #[serde(default)]
    pub raid_members: i64,
    pub disk_size: String,
}

/// RAID level as written in the template. Unknown strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RaidLevel {
    #[default]
    NoRaid,
    R0,
    R1,
    R3,
    R5,
    R6,
    R10,
    Other(String),
}

impl From<String> for RaidLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "noRaid" => RaidLevel::NoRaid,
            "R0" => RaidLevel::R0,
            "R1" => RaidLevel::R1,
            "R3" => RaidLevel::R3,
            "R5" => RaidLevel::R5,
            "R6" => RaidLevel::R6,
            "R10" => RaidLevel::R10,
            _ => RaidLevel::Other(value),
        }
    }
}

impl From<&str> for RaidLevel {
    fn from(value: &str) -> Self {
        RaidLevel::from(value.to_string())
    }
}

impl From<RaidLevel> for String {
    fn from(level: RaidLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for RaidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RaidLevel::NoRaid => "noRaid",
            RaidLevel::R0 => "R0",
            RaidLevel::R1 => "R1",
            RaidLevel::R3 => "R3",
            RaidLevel::R5 => "R5",
            RaidLevel::R6 => "R6",
            RaidLevel::R10 => "R10",
            RaidLevel::Other(other) => other,
        };
        f.write_str(name)
    }
}

impl Template {
    /// Load a JSON template from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProvisionError::Template(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ProvisionError::Template(e.to_string()))
    }

    /// The RAID group the root disk is matched against.
    pub fn root_raid(&self) -> Result<&RaidSpec> {
        self.raids
            .first()
            .ok_or_else(|| ProvisionError::Template("no RAID descriptor".to_string()))
    }

    /// Configured root size.
    pub fn root_size(&self) -> Result<SizeSpec> {
        let raw = self.sys_disk.get(ROOT_MOUNT).ok_or_else(|| {
            ProvisionError::Template(format!("sysDisk has no '{ROOT_MOUNT}' entry"))
        })?;
        raw.parse()
    }

    /// Configured swap size; `None` when absent or empty.
    pub fn swap_size(&self) -> Result<Option<Size>> {
        match self.sys_disk.get(SWAP_KEY).map(|s| s.trim()) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                ProvisionError::Template(format!("{SWAP_KEY} size must be fixed, got '{raw}'"))
            }),
        }
    }

    /// Check everything the engine relies on before anything is touched.
    pub fn validate(&self) -> Result<()> {
        let raid = self.root_raid()?;
        raid.validate()?;
        self.root_size()?;
        self.swap_size()?;
        Ok(())
    }
}

impl RaidSpec {
    pub fn validate(&self) -> Result<()> {
        self.disk_size.parse::<Size>().map_err(|_| {
            ProvisionError::Template(format!("invalid raid diskSize '{}'", self.disk_size))
        })?;

        let min_members = match self.raid_level {
            RaidLevel::NoRaid | RaidLevel::R1 | RaidLevel::Other(_) => 0,
            RaidLevel::R0 | RaidLevel::R3 | RaidLevel::R5 | RaidLevel::R10 => 2,
            RaidLevel::R6 => 3,
        };
        if self.raid_members < min_members {
            return Err(ProvisionError::Template(format!(
                "raid level {} needs at least {} members, got {}",
                self.raid_level, min_members, self.raid_members
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "sysDisk": {"/": "100G", "SWAP": "16G"},
        "dataDisk": ["/data"],
        "raids": [{"raidLevel": "R1", "raidCount": 1, "raidMembers": 2, "diskSize": "1.2T"}]
    }"#;

    #[test]
    fn test_parses_camel_case_json() {
        let template = Template::from_json(SAMPLE).unwrap();
        assert_eq!(template.sys_disk["/"], "100G");
        assert_eq!(template.data_disk, vec!["/data".to_string()]);
        assert_eq!(template.raids[0].raid_level, RaidLevel::R1);
        assert_eq!(template.raids[0].raid_members, 2);
        template.validate().unwrap();
    }

    #[test]
    fn test_unknown_raid_level_is_preserved() {
        let level = RaidLevel::from("R50");
        assert_eq!(level, RaidLevel::Other("R50".to_string()));
        assert_eq!(level.to_string(), "R50");
    }

    #[test]
    fn test_swap_absent_or_empty_is_none() {
        let mut template = Template::from_json(SAMPLE).unwrap();
        assert!(template.swap_size().unwrap().is_some());

        template.sys_disk.insert(SWAP_KEY.to_string(), String::new());
        assert!(template.swap_size().unwrap().is_none());

        template.sys_disk.remove(SWAP_KEY);
        assert!(template.swap_size().unwrap().is_none());
    }

    #[test]
    fn test_swap_rest_is_rejected() {
        let mut template = Template::from_json(SAMPLE).unwrap();
        template.sys_disk.insert(SWAP_KEY.to_string(), "rest".to_string());
        assert!(matches!(template.validate(), Err(ProvisionError::Template(_))));
    }

    #[test]
    fn test_validate_requires_raid_and_root() {
        let mut template = Template::from_json(SAMPLE).unwrap();
        template.raids.clear();
        assert!(template.validate().is_err());

        let mut template = Template::from_json(SAMPLE).unwrap();
        template.sys_disk.remove(ROOT_MOUNT);
        assert!(template.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_members() {
        let raid = RaidSpec {
            raid_level: RaidLevel::R6,
            raid_count: 1,
            raid_members: 2,
            disk_size: "960G".to_string(),
        };
        assert!(raid.validate().is_err());

        let raid = RaidSpec {
            raid_members: 3,
            ..raid
        };
        raid.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        fs::write(&path, SAMPLE).unwrap();

        let template = Template::load(&path).unwrap();
        assert_eq!(template.root_size().unwrap(), "100G".parse::<SizeSpec>().unwrap());
    }

    #[test]
    fn test_load_missing_file_is_template_error() {
        let err = Template::load(Path::new("/nonexistent/template.json")).unwrap_err();
        assert!(matches!(err, ProvisionError::Template(_)));
    }
}
