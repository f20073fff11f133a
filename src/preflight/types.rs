//! Preflight check results and report.

use std::fmt;

/// Result of a single preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Provisioning will fail.
    Fail,
    /// Usable, but some configuration will not work.
    Warn,
    /// Not applicable on this host.
    Skip,
}

impl CheckStatus {
    fn icon(self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Warn => "⚠",
            CheckStatus::Skip => "○",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Skip => "SKIP",
        })
    }
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details: details.map(str::to_string),
        }
    }

    pub fn pass(name: &str) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details))
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details))
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details))
    }

    pub fn skip(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Skip, Some(details))
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.status.icon(), self.status, self.name)?;
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}

/// Results of all preflight checks.
#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        self.fail_count() == 0
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");
        for check in &self.checks {
            println!("  {check}");
        }

        println!();
        println!(
            "Summary: {}/{} passed",
            self.count(CheckStatus::Pass),
            self.checks.len()
        );
        let failed = self.fail_count();
        if failed > 0 {
            println!("         {failed} FAILED - provisioning will not succeed");
        }
        let warned = self.warn_count();
        if warned > 0 {
            println!("         {warned} warnings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_fail_the_report() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::pass("lsblk"),
                CheckResult::warn("mkfs.xfs", "Not found"),
                CheckResult::skip("template", "no template"),
            ],
        };
        assert!(report.all_passed());
        assert_eq!(report.warn_count(), 1);
        assert_eq!(report.count(CheckStatus::Skip), 1);
    }

    #[test]
    fn test_any_failure_fails_the_report() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::pass_with("parted", "/usr/sbin/parted"),
                CheckResult::fail("qemu-nbd", "Not found"),
            ],
        };
        assert!(!report.all_passed());
        assert_eq!(report.fail_count(), 1);
    }

    #[test]
    fn test_check_line_format() {
        assert_eq!(
            CheckResult::fail("qemu-nbd", "Not found").to_string(),
            "✗ [FAIL] qemu-nbd: Not found"
        );
        assert_eq!(CheckResult::pass("lsblk").to_string(), "✓ [PASS] lsblk");
    }
}
