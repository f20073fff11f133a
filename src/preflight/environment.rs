//! Image, template and kernel checks.

use std::path::Path;

use crate::config::Config;
use crate::template::Template;

use super::types::CheckResult;

/// Kernel module directory; a loaded nbd module shows up here.
const SYS_MODULE_NBD: &str = "/sys/module/nbd";

pub fn check_environment(config: &Config) -> Vec<CheckResult> {
    vec![
        check_image(&config.image),
        check_template(&config.template),
        check_nbd_module(Path::new(SYS_MODULE_NBD)),
    ]
}

pub(crate) fn check_image(image: &Path) -> CheckResult {
    match std::fs::metadata(image) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => CheckResult::pass_with(
            "image",
            &format!("{} ({} bytes)", image.display(), meta.len()),
        ),
        Ok(meta) if meta.is_file() => {
            CheckResult::fail("image", &format!("{} is empty", image.display()))
        }
        Ok(_) => CheckResult::fail("image", &format!("{} is not a file", image.display())),
        Err(e) => CheckResult::fail("image", &format!("{}: {e}", image.display())),
    }
}

/// Load and validate the template, reporting the root RAID group.
pub(crate) fn check_template(path: &Path) -> CheckResult {
    let template = match Template::load(path) {
        Ok(t) => t,
        Err(e) => return CheckResult::fail("template", &e.to_string()),
    };
    if let Err(e) = template.validate() {
        return CheckResult::fail("template", &e.to_string());
    }

    match (template.root_raid(), template.root_size()) {
        (Ok(raid), Ok(root)) => CheckResult::pass_with(
            "template",
            &format!(
                "root {} on {} x {} ({})",
                root, raid.raid_members, raid.disk_size, raid.raid_level
            ),
        ),
        _ => CheckResult::pass("template"),
    }
}

fn check_nbd_module(sys_module: &Path) -> CheckResult {
    if sys_module.exists() {
        CheckResult::pass_with("nbd module", "loaded")
    } else {
        CheckResult::skip("nbd module", "not loaded yet; loaded on first attach")
    }
}
