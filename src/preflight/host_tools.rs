//! Host tool availability checks.

use crate::process;
use crate::tools::FilesystemType;

use super::types::CheckResult;

/// (tool, package, purpose) for everything a root + data run invokes.
const REQUIRED_TOOLS: &[(&str, &str, &str)] = &[
    ("lsblk", "util-linux", "Required for disk discovery"),
    ("umount", "util-linux", "Required to release mounted partitions"),
    ("sfdisk", "util-linux", "Required to wipe and relabel partition tables"),
    ("parted", "parted", "Required to edit the root disk layout"),
    ("partprobe", "parted", "Required to re-read partition tables"),
    ("qemu-img", "qemu-img", "Required to write the OS image"),
    ("qemu-nbd", "qemu-img", "Required to attach the OS image"),
    ("modprobe", "kmod", "Required to load the nbd module"),
    ("mkswap", "util-linux", "Required for swap layouts"),
    ("e2fsck", "e2fsprogs", "Required to check the root filesystem"),
    ("resize2fs", "e2fsprogs", "Required to grow the root filesystem"),
    ("cat", "coreutils", "Required to copy the root image"),
];

const OPTIONAL_TOOLS: &[(&str, &str, &str)] = &[
    ("udevadm", "systemd-udev", "Used to wait for partition labels after staging"),
];

/// Check host tools are installed.
pub fn check_host_tools(filesystem: &FilesystemType) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = REQUIRED_TOOLS
        .iter()
        .map(|(tool, package, purpose)| check_tool_exists(tool, package, purpose, true))
        .collect();

    results.extend(
        OPTIONAL_TOOLS
            .iter()
            .map(|(tool, package, purpose)| check_tool_exists(tool, package, purpose, false)),
    );

    results.push(match filesystem.mkfs_program() {
        Some(tool) => check_tool_exists(
            tool,
            mkfs_package(filesystem),
            "Required to format trailing and data partitions",
            true,
        ),
        None => CheckResult::warn(
            "filesystem",
            &format!("'{filesystem}' is not supported; data partitions will not be formatted"),
        ),
    });

    results
}

fn mkfs_package(filesystem: &FilesystemType) -> &'static str {
    match filesystem {
        FilesystemType::Xfs => "xfsprogs",
        _ => "e2fsprogs",
    }
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        None => {
            let msg = format!("Not found. Install '{package}' package. {purpose}");
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
