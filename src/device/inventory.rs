//! Block-device inventory built from `lsblk` JSON output.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::{ProvisionError, Result};
use crate::process::{Cmd, Host};
use crate::size::Bytes;

/// Columns requested from `lsblk`.
const LSBLK_COLUMNS: &str = "NAME,LABEL,SIZE,FSTYPE,UUID,TYPE,MOUNTPOINT,ROTA";

/// A disk or partition as reported by `lsblk`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "de_size")]
    pub size: Bytes,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    /// `disk`, `part`, `loop`, `raid1`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(rename = "rota", default, deserialize_with = "de_flag")]
    pub rotational: bool,
    #[serde(default)]
    pub children: Vec<BlockDevice>,
}

impl BlockDevice {
    pub fn is_disk(&self) -> bool {
        self.kind == "disk"
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn fstype(&self) -> Option<&str> {
        self.fstype.as_deref()
    }
}

#[derive(Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<BlockDevice>,
}

/// Older util-linux prints numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

fn de_size<'de, D>(deserializer: D) -> std::result::Result<Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(Bytes(0)),
        Some(NumberOrString::Number(n)) => Ok(Bytes(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Bytes)
            .map_err(|_| serde::de::Error::custom(format!("invalid size '{s}'"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Text(String),
}

fn de_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<FlagRepr> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None => false,
        Some(FlagRepr::Bool(b)) => b,
        Some(FlagRepr::Text(s)) => s.trim() == "1",
    })
}

/// Parse `lsblk -J -b` output into top-level disks with a non-zero size.
pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>> {
    let output: LsblkOutput = serde_json::from_str(json)
        .map_err(|e| ProvisionError::Inventory(format!("failed to parse lsblk JSON output: {e}")))?;

    let disks: Vec<BlockDevice> = output
        .blockdevices
        .into_iter()
        .filter(|device| device.is_disk() && device.size.0 > 0)
        .collect();

    if disks.is_empty() {
        return Err(ProvisionError::NoDisksFound);
    }
    Ok(disks)
}

/// Query the host for disks, optionally scoped to one device path.
pub fn list_disks(host: &dyn Host, device: Option<&Path>) -> Result<Vec<BlockDevice>> {
    let mut cmd = Cmd::new("lsblk").args(["-J", "-b", "-o", LSBLK_COLUMNS]);
    if let Some(device) = device {
        cmd = cmd.arg_path(device);
    }

    let result = cmd.run(host).map_err(|e| match e {
        ProvisionError::Command { .. } | ProvisionError::Spawn { .. } => {
            ProvisionError::Inventory(e.to_string())
        }
        other => other,
    })?;

    parse_lsblk(&result.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSBLK: &str = r#"{
       "blockdevices": [
          {"name":"loop0", "label":null, "size":67108864, "fstype":"squashfs", "uuid":null, "type":"loop", "mountpoint":"/snap/core", "rota":false},
          {"name":"sda", "label":null, "size":1199101181952, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":true,
             "children": [
                {"name":"sda1", "label":"boot", "size":1073741824, "fstype":"vfat", "uuid":"A1B2-C3D4", "type":"part", "mountpoint":"/boot/efi", "rota":true},
                {"name":"sda2", "label":"root", "size":536870912000, "fstype":"ext4", "uuid":"0f3c", "type":"part", "mountpoint":"/", "rota":true}
             ]
          },
          {"name":"sdb", "label":null, "size":0, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false},
          {"name":"nvme0n1", "label":null, "size":960197124096, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false}
       ]
    }"#;

    #[test]
    fn test_keeps_only_nonzero_disks() {
        let disks = parse_lsblk(LSBLK).unwrap();
        let names: Vec<&str> = disks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["sda", "nvme0n1"]);
    }

    #[test]
    fn test_parses_children_and_fields() {
        let disks = parse_lsblk(LSBLK).unwrap();
        let sda = &disks[0];
        assert!(sda.rotational);
        assert_eq!(sda.size, Bytes(1_199_101_181_952));
        assert_eq!(sda.children.len(), 2);
        assert_eq!(sda.children[1].label(), Some("root"));
        assert_eq!(sda.children[1].fstype(), Some("ext4"));
        assert_eq!(sda.children[0].mountpoint.as_deref(), Some("/boot/efi"));
        assert!(disks[1].children.is_empty());
    }

    #[test]
    fn test_accepts_string_encoded_numbers() {
        let json = r#"{"blockdevices":[
            {"name":"vda","size":"42949672960","type":"disk","rota":"1"}
        ]}"#;
        let disks = parse_lsblk(json).unwrap();
        assert_eq!(disks[0].size, Bytes(42_949_672_960));
        assert!(disks[0].rotational);
        assert_eq!(disks[0].label, None);
    }

    #[test]
    fn test_empty_inventory_is_no_disks_found() {
        let json = r#"{"blockdevices":[{"name":"sr0","size":0,"type":"rom"}]}"#;
        assert!(matches!(parse_lsblk(json), Err(ProvisionError::NoDisksFound)));
    }

    #[test]
    fn test_garbage_is_inventory_error() {
        assert!(matches!(
            parse_lsblk("lsblk: unknown column"),
            Err(ProvisionError::Inventory(_))
        ));
    }
}
