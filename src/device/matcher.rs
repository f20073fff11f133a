//! Locate the root disk by the capacity its RAID group should present.

use tracing::{debug, warn};

use super::inventory::BlockDevice;
use crate::error::{ProvisionError, Result};
use crate::size::Bytes;
use crate::template::{RaidLevel, RaidSpec};

/// Relative tolerance when comparing disk capacities.
pub const SIZE_TOLERANCE: f64 = 0.05;

/// Number of member disks whose capacity the virtual disk exposes.
pub fn raid_multiplier(level: &RaidLevel, members: i64) -> i64 {
    match level {
        RaidLevel::NoRaid | RaidLevel::R1 => 1,
        RaidLevel::R0 => members,
        RaidLevel::R3 | RaidLevel::R5 => members - 1,
        RaidLevel::R6 => members - 2,
        RaidLevel::R10 => members / 2,
        RaidLevel::Other(_) => 1,
    }
}

/// Raw capacity the root disk should report for `raid`.
///
/// A degenerate multiplier (members too small for the level) yields zero,
/// which matches nothing.
pub fn expected_root_disk_size(raid: &RaidSpec) -> Result<Bytes> {
    let per_member = crate::size::to_bytes(&raid.disk_size)?;
    let multiplier = raid_multiplier(&raid.raid_level, raid.raid_members).max(0) as u64;
    Ok(Bytes(per_member.0.saturating_mul(multiplier)))
}

/// `|expected - actual| / expected < 5%`. The denominator is the expected size.
pub fn size_matches(expected: Bytes, actual: Bytes) -> bool {
    if expected.0 == 0 {
        return false;
    }
    let difference = expected.0.abs_diff(actual.0) as f64;
    difference / (expected.0 as f64) < SIZE_TOLERANCE
}

/// First disk whose size matches `expected`.
///
/// Falls back to the first disk with a non-zero size when nothing matches, so
/// single-disk and size-ambiguous hosts still provision.
pub fn find_disk_by_size(disks: &[BlockDevice], expected: Bytes) -> Result<&BlockDevice> {
    if let Some(disk) = disks.iter().find(|d| size_matches(expected, d.size)) {
        debug!(disk = %disk.name, size = %disk.size, %expected, "matched root disk by size");
        return Ok(disk);
    }

    match disks.iter().find(|d| d.size.0 > 0) {
        Some(disk) => {
            warn!(
                disk = %disk.name,
                size = %disk.size,
                %expected,
                "no disk matches the expected size, falling back to first disk"
            );
            Ok(disk)
        }
        None => Err(ProvisionError::NoDiskDetected(
            disks.iter().map(|d| d.name.clone()).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(name: &str, size: u64) -> BlockDevice {
        BlockDevice {
            name: name.to_string(),
            label: None,
            size: Bytes(size),
            fstype: None,
            uuid: None,
            kind: "disk".to_string(),
            mountpoint: None,
            rotational: false,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(raid_multiplier(&RaidLevel::R0, 4), 4);
        assert_eq!(raid_multiplier(&RaidLevel::R5, 4), 3);
        assert_eq!(raid_multiplier(&RaidLevel::R3, 3), 2);
        assert_eq!(raid_multiplier(&RaidLevel::R6, 6), 4);
        assert_eq!(raid_multiplier(&RaidLevel::R10, 4), 2);
        assert_eq!(raid_multiplier(&RaidLevel::R10, 5), 2);
        assert_eq!(raid_multiplier(&RaidLevel::R1, 2), 1);
        assert_eq!(raid_multiplier(&RaidLevel::NoRaid, 0), 1);
        assert_eq!(raid_multiplier(&RaidLevel::from("JBOD"), 8), 1);
    }

    #[test]
    fn test_tolerance_band() {
        assert!(size_matches(Bytes(1000), Bytes(1049)));
        assert!(size_matches(Bytes(1000), Bytes(951)));
        assert!(!size_matches(Bytes(1000), Bytes(1051)));
        assert!(!size_matches(Bytes(0), Bytes(0)));
    }

    #[test]
    fn test_expected_size_for_raid5() {
        let raid = RaidSpec {
            raid_level: RaidLevel::R5,
            raid_count: 1,
            raid_members: 4,
            disk_size: "960G".to_string(),
        };
        assert_eq!(
            expected_root_disk_size(&raid).unwrap(),
            Bytes(2_880_000_000_000)
        );
    }

    #[test]
    fn test_degenerate_raid_expects_nothing() {
        let raid = RaidSpec {
            raid_level: RaidLevel::R6,
            raid_count: 1,
            raid_members: 1,
            disk_size: "1T".to_string(),
        };
        assert_eq!(expected_root_disk_size(&raid).unwrap(), Bytes(0));
    }

    #[test]
    fn test_picks_matching_disk_in_order() {
        let disks = [
            disk("sda", 480_000_000_000),
            disk("sdb", 1_199_000_000_000),
            disk("sdc", 1_200_000_000_000),
        ];
        let found = find_disk_by_size(&disks, Bytes(1_200_000_000_000)).unwrap();
        assert_eq!(found.name, "sdb");
    }

    #[test]
    fn test_falls_back_to_first_nonzero_disk() {
        let disks = [disk("sda", 0), disk("sdb", 480_000_000_000)];
        let found = find_disk_by_size(&disks, Bytes(4_000_000_000_000)).unwrap();
        assert_eq!(found.name, "sdb");
    }

    #[test]
    fn test_no_nonzero_disk_is_error() {
        let disks = [disk("sda", 0)];
        assert!(matches!(
            find_disk_by_size(&disks, Bytes(1)),
            Err(ProvisionError::NoDiskDetected(_))
        ));
    }
}
