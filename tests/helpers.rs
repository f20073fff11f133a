//! Shared test utilities for diskinit tests.
//!
//! [`FakeHost`] stands in for the machine: it answers commands from a script,
//! serves file reads from memory and records everything it was asked to do.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use diskinit::process::{Cmd, CommandResult, Host};
use diskinit::provision::ProvisionOptions;
use diskinit::template::Template;

/// Scripted responses for every command line containing `pattern`.
struct Rule {
    pattern: String,
    responses: VecDeque<CommandResult>,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub line: String,
    pub stdin: Option<String>,
}

/// A scripted [`Host`].
///
/// Rules are matched in registration order. Each rule hands out its responses
/// in sequence and keeps repeating the last one. Unmatched commands succeed
/// with empty output.
#[derive(Default)]
pub struct FakeHost {
    rules: RefCell<Vec<Rule>>,
    files: RefCell<HashMap<PathBuf, String>>,
    invocations: RefCell<Vec<Invocation>>,
    sleeps: Cell<u32>,
}

impl FakeHost {
    /// A host with no mounts and a ready staging device.
    pub fn new() -> Self {
        let host = Self::default();
        host.set_file("/proc/mounts", "");
        host.set_file("/sys/block/nbd0/size", "20971520\n");
        host
    }

    pub fn on(&self, pattern: &str, responses: Vec<CommandResult>) -> &Self {
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            responses: responses.into(),
        });
        self
    }

    pub fn on_ok(&self, pattern: &str, stdout: &str) -> &Self {
        self.on(pattern, vec![CommandResult::ok(stdout)])
    }

    pub fn on_fail(&self, pattern: &str, code: i32, stderr: &str) -> &Self {
        self.on(pattern, vec![CommandResult::failed(code, stderr)])
    }

    pub fn set_file(&self, path: impl Into<PathBuf>, content: &str) {
        self.files
            .borrow_mut()
            .insert(path.into(), content.to_string());
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Every command line, in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|i| i.line.clone())
            .collect()
    }

    /// Command lines containing `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|line| line.contains(needle))
            .collect()
    }

    pub fn ran(&self, needle: &str) -> bool {
        !self.matching(needle).is_empty()
    }

    /// Index of the first command line containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands().iter().position(|line| line.contains(needle))
    }

    /// Index of the last command line containing `needle`.
    pub fn last_position(&self, needle: &str) -> Option<usize> {
        self.commands().iter().rposition(|line| line.contains(needle))
    }

    /// stdin fed to the first command line containing `needle`.
    pub fn stdin_of(&self, needle: &str) -> Option<String> {
        self.invocations
            .borrow()
            .iter()
            .find(|i| i.line.contains(needle))
            .and_then(|i| i.stdin.clone())
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }

    /// Forget recorded invocations, keeping the script.
    pub fn clear_log(&self) {
        self.invocations.borrow_mut().clear();
    }
}

impl Host for FakeHost {
    fn run(&self, cmd: &Cmd) -> io::Result<CommandResult> {
        let line = cmd.to_string();
        self.invocations.borrow_mut().push(Invocation {
            line: line.clone(),
            stdin: cmd.stdin_payload().map(str::to_string),
        });

        let mut rules = self.rules.borrow_mut();
        let Some(rule) = rules.iter_mut().find(|r| line.contains(&r.pattern)) else {
            return Ok(CommandResult::ok(""));
        };
        let response = if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        };
        Ok(response.unwrap_or_default())
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn sleep(&self, _duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
    }
}

// =============================================================================
// Templates
// =============================================================================

pub const TEMPLATE_ROOT_FIXED: &str = r#"{
    "sysDisk": {"/": "100G"},
    "dataDisk": ["/data"],
    "raids": [{"raidLevel": "R1", "raidCount": 1, "raidMembers": 2, "diskSize": "1.2T"}]
}"#;

pub const TEMPLATE_ROOT_REST: &str = r#"{
    "sysDisk": {"/": "rest"},
    "raids": [{"raidLevel": "R1", "raidCount": 1, "raidMembers": 2, "diskSize": "1.2T"}]
}"#;

pub const TEMPLATE_SWAP_FIXED: &str = r#"{
    "sysDisk": {"/": "100G", "SWAP": "16G"},
    "dataDisk": ["/data"],
    "raids": [{"raidLevel": "R1", "raidCount": 1, "raidMembers": 2, "diskSize": "1.2T"}]
}"#;

pub const TEMPLATE_SWAP_REST: &str = r#"{
    "sysDisk": {"/": "rest", "SWAP": "16G"},
    "raids": [{"raidLevel": "R1", "raidCount": 1, "raidMembers": 2, "diskSize": "1.2T"}]
}"#;

pub fn template(json: &str) -> Template {
    Template::from_json(json).expect("test template should parse")
}

pub fn options() -> ProvisionOptions {
    ProvisionOptions {
        image: PathBuf::from("/srv/osi.qcow2"),
        ..ProvisionOptions::default()
    }
}

// =============================================================================
// lsblk fixtures
// =============================================================================

/// Pattern matching only the unscoped inventory query.
pub const LSBLK_ALL: &str = "MOUNTPOINT,ROTA";
/// Pattern matching the inventory query scoped to the root disk.
pub const LSBLK_SDA: &str = "MOUNTPOINT,ROTA /dev/sda";

/// Pattern matching the inventory query scoped to the staging device.
pub const LSBLK_NBD0: &str = "MOUNTPOINT,ROTA /dev/nbd0";

/// Blank 1.2 TB root disk, a 960 GB data disk, an idle nbd slot and a DVD.
pub const LSBLK_FRESH: &str = r#"{
   "blockdevices": [
      {"name":"sda", "label":null, "size":1200000000000, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false},
      {"name":"sdb", "label":null, "size":960000000000, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":true,
         "children": [
            {"name":"sdb1", "label":"old", "size":960000000000, "fstype":"xfs", "uuid":"7d9f", "type":"part", "mountpoint":null, "rota":true}
         ]
      },
      {"name":"nbd0", "label":null, "size":0, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false},
      {"name":"sr0", "label":"INSTALL", "size":1073741824, "fstype":"iso9660", "uuid":null, "type":"rom", "mountpoint":"/run/install", "rota":true}
   ]
}"#;

/// The same host after a swap-branch run: no `root` label on the new root
/// partition, which sits one slot further out than the image's.
pub const LSBLK_AFTER_SWAP_RUN: &str = r#"{
   "blockdevices": [
      {"name":"sda", "label":null, "size":1200000000000, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false,
         "children": [
            {"name":"sda1", "label":null, "size":1048576, "fstype":null, "uuid":null, "type":"part", "mountpoint":null, "rota":false},
            {"name":"sda2", "label":"EFI", "size":1073741824, "fstype":"vfat", "uuid":"A1B2-C3D4", "type":"part", "mountpoint":null, "rota":false},
            {"name":"sda3", "label":null, "size":17180917760, "fstype":"swap", "uuid":"5e1f", "type":"part", "mountpoint":null, "rota":false},
            {"name":"sda4", "label":null, "size":107375230976, "fstype":null, "uuid":null, "type":"part", "mountpoint":null, "rota":false},
            {"name":"sda5", "label":null, "size":1072000000000, "fstype":"ext4", "uuid":"9c0e", "type":"part", "mountpoint":"/data", "rota":false}
         ]
      },
      {"name":"sdb", "label":null, "size":960000000000, "fstype":"ext4", "uuid":"11aa", "type":"disk", "mountpoint":null, "rota":true}
   ]
}"#;

/// The root disk right after the image is staged: the image's own layout.
pub const LSBLK_SDA_STAGED: &str = r#"{
   "blockdevices": [
      {"name":"sda", "label":null, "size":1200000000000, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false,
         "children": [
            {"name":"sda1", "label":null, "size":1048576, "fstype":null, "uuid":null, "type":"part", "mountpoint":null, "rota":false},
            {"name":"sda2", "label":"EFI", "size":1073741824, "fstype":"vfat", "uuid":"A1B2-C3D4", "type":"part", "mountpoint":null, "rota":false},
            {"name":"sda3", "label":"root", "size":41875931136, "fstype":"ext4", "uuid":"0f3c", "type":"part", "mountpoint":null, "rota":false}
         ]
      }
   ]
}"#;

/// The OS image attached to the staging device: the same layout as
/// [`LSBLK_SDA_STAGED`], under the staging device's names.
pub const LSBLK_NBD0_IMAGE: &str = r#"{
   "blockdevices": [
      {"name":"nbd0", "label":null, "size":42949672960, "fstype":null, "uuid":null, "type":"disk", "mountpoint":null, "rota":false,
         "children": [
            {"name":"nbd0p1", "label":null, "size":1048576, "fstype":null, "uuid":null, "type":"part", "mountpoint":null, "rota":false},
            {"name":"nbd0p2", "label":"EFI", "size":1073741824, "fstype":"vfat", "uuid":"A1B2-C3D4", "type":"part", "mountpoint":null, "rota":false},
            {"name":"nbd0p3", "label":"root", "size":41875931136, "fstype":"ext4", "uuid":"0f3c", "type":"part", "mountpoint":null, "rota":false}
         ]
      }
   ]
}"#;

// =============================================================================
// parted fixtures
// =============================================================================

pub const PRINT_FREE: &str = "unit MiB print free";

const PARTED_HEADER: &str = "\
Model: DELL PERC H730P Mini (scsi)
Disk /dev/sda: 1144409MiB
Sector size (logical/physical): 512B/512B
Partition Table: gpt
Disk Flags:

Number  Start     End         Size        File system     Name  Flags
        0.02MiB   1.00MiB     0.98MiB     Free Space
 1      1.00MiB   2.00MiB     1.00MiB                           bios_grub
 2      2.00MiB   1026MiB     1024MiB     fat32                 boot, esp
";

/// Image layout after the table fix: root at slot 3, free tail.
pub fn parted_staged() -> String {
    format!(
        "{PARTED_HEADER} 3      1026MiB   40962MiB    39936MiB    ext4            root
        40962MiB  1144409MiB  1103447MiB  Free Space
"
    )
}

/// Root-only branch after resizing slot 3 to 100G.
pub fn parted_root_resized() -> String {
    format!(
        "{PARTED_HEADER} 3      1026MiB   103427MiB   102401MiB   ext4            root
        103427MiB 1144409MiB  1040982MiB  Free Space
"
    )
}

/// Swap branch after removing slot 3.
pub fn parted_root_removed() -> String {
    format!("{PARTED_HEADER}        1026MiB   1144409MiB  1143383MiB  Free Space\n")
}

/// Swap branch after creating the 16G swap partition.
pub fn parted_swap_created() -> String {
    format!(
        "{PARTED_HEADER} 3      1026MiB   17411MiB    16385MiB    linux-swap(v1)  primary
        17411MiB  1144409MiB  1127998MiB  Free Space
"
    )
}

/// Swap branch after creating the 100G root partition.
pub fn parted_root_created() -> String {
    format!(
        "{PARTED_HEADER} 3      1026MiB   17411MiB    16385MiB    linux-swap(v1)  primary
 4      17411MiB  119812MiB   102401MiB                   primary
        119812MiB 1144409MiB  1024597MiB  Free Space
"
    )
}

pub fn ok(stdout: &str) -> CommandResult {
    CommandResult::ok(stdout)
}

/// A host scripted for one root disk run: `lsblk` answers from `inventory`
/// (one per run), the staged disk always shows the image layout and
/// `print free` answers from `tables` in order.
pub fn scripted_host(inventory: &[&str], tables: Vec<String>) -> FakeHost {
    let host = FakeHost::new();
    host.on_ok(LSBLK_SDA, LSBLK_SDA_STAGED);
    host.on_ok(LSBLK_NBD0, LSBLK_NBD0_IMAGE);
    host.on(LSBLK_ALL, inventory.iter().map(|json| ok(json)).collect());
    host.on(PRINT_FREE, tables.iter().map(|t| ok(t)).collect());
    host
}
