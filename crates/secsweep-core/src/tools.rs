use crate::config::RunConfig;
use serde::{Deserialize, Serialize};

/// Package managers that can drive the baseline dependency audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    pub const ALL: &'static [PackageManager] =
        &[PackageManager::Npm, PackageManager::Yarn, PackageManager::Pnpm];

    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }

    /// Lockfile whose presence selects this manager for a project.
    pub fn lockfile(&self) -> &'static str {
        match self {
            PackageManager::Npm => "package-lock.json",
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Pnpm => "pnpm-lock.yaml",
        }
    }

    fn audit_command(&self, fix: bool) -> Vec<String> {
        let mut cmd: Vec<String> = match self {
            PackageManager::Npm => vec!["npm".into(), "audit".into()],
            PackageManager::Yarn => vec!["yarn".into(), "audit".into()],
            PackageManager::Pnpm => vec!["pnpm".into(), "audit".into()],
        };
        // yarn classic has no `audit fix`; the flag only applies where it exists
        if fix && !matches!(self, PackageManager::Yarn) {
            cmd.push("fix".into());
        }
        cmd
    }
}

/// Effective status of a finished test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
        }
    }
}

/// Classification of a raw subprocess exit: effective status, effective exit
/// code, and an optional caveat worth surfacing in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: TestStatus,
    pub exit_code: i32,
    pub note: Option<String>,
}

impl Outcome {
    fn passed(exit_code: i32) -> Self {
        Outcome { status: TestStatus::Passed, exit_code, note: None }
    }

    fn passed_with(exit_code: i32, note: impl Into<String>) -> Self {
        Outcome {
            status: TestStatus::Passed,
            exit_code,
            note: Some(note.into()),
        }
    }

    fn failed(exit_code: i32) -> Self {
        Outcome { status: TestStatus::Failed, exit_code, note: None }
    }
}

/// The closed set of scanners the runner knows how to drive.
///
/// Each variant implements the same capability pair: build the invocation
/// for a run configuration, and classify a finished subprocess into an
/// effective [`Outcome`]. Tool-specific quirks stay inside this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tool {
    /// Baseline dependency audit through the project's package manager.
    DependencyAudit,
    /// Lint-based security aggregator.
    Eslint,
    /// Open vulnerability database scanner.
    OsvScanner,
    /// Secret scanner for committed credentials.
    Gitleaks,
    /// Infrastructure-as-code misconfiguration scanner.
    Checkov,
    /// Commercial vulnerability scanner. See [`Tool::classify`] for its
    /// special failure policy.
    Snyk,
    /// License compliance listing.
    LicenseCheck,
}

impl Tool {
    /// Definition order for a run. The baseline audit always comes first.
    pub const ALL: &'static [Tool] = &[
        Tool::DependencyAudit,
        Tool::Eslint,
        Tool::OsvScanner,
        Tool::Gitleaks,
        Tool::Checkov,
        Tool::Snyk,
        Tool::LicenseCheck,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Tool::DependencyAudit => "npm-audit",
            Tool::Eslint => "eslint",
            Tool::OsvScanner => "osv",
            Tool::Gitleaks => "gitleaks",
            Tool::Checkov => "checkov",
            Tool::Snyk => "snyk",
            Tool::LicenseCheck => "license-check",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::DependencyAudit => "Dependency Audit",
            Tool::Eslint => "ESLint Security",
            Tool::OsvScanner => "OSV Database Scan",
            Tool::Gitleaks => "Secret Scan",
            Tool::Checkov => "IaC Scan",
            Tool::Snyk => "Snyk Test",
            Tool::LicenseCheck => "License Check",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::DependencyAudit => "Audit declared dependencies against known advisories",
            Tool::Eslint => "Static analysis with security-focused lint rules",
            Tool::OsvScanner => "Match lockfiles against the OSV vulnerability database",
            Tool::Gitleaks => "Detect credentials and tokens committed to source",
            Tool::Checkov => "Check infrastructure-as-code for misconfigurations",
            Tool::Snyk => "Scan dependencies with the Snyk vulnerability service",
            Tool::LicenseCheck => "List dependency licenses for compliance review",
        }
    }

    /// Executable probed during discovery. `None` means the tool rides on
    /// the resolved package manager instead of its own binary.
    pub fn probe_binary(&self) -> Option<&'static str> {
        match self {
            Tool::DependencyAudit => None,
            Tool::Eslint => Some("eslint"),
            Tool::OsvScanner => Some("osv-scanner"),
            Tool::Gitleaks => Some("gitleaks"),
            Tool::Checkov => Some("checkov"),
            Tool::Snyk => Some("snyk"),
            Tool::LicenseCheck => Some("license-checker"),
        }
    }

    /// Secondary checks are skipped in quick mode: they complement the core
    /// vulnerability scans rather than being vulnerability scans themselves.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Tool::Gitleaks | Tool::LicenseCheck)
    }

    /// Whether the tool accepts an auto-remediation flag in fix mode.
    pub fn supports_fix(&self) -> bool {
        matches!(self, Tool::DependencyAudit | Tool::Eslint)
    }

    /// One-line installation guidance shown by `--install` for missing tools.
    pub fn install_hint(&self) -> &'static str {
        match self {
            Tool::DependencyAudit => "install Node.js (bundles npm): https://nodejs.org",
            Tool::Eslint => "npm install -g eslint eslint-plugin-security",
            Tool::OsvScanner => "go install github.com/google/osv-scanner/cmd/osv-scanner@latest",
            Tool::Gitleaks => "brew install gitleaks (or download from github.com/gitleaks/gitleaks/releases)",
            Tool::Checkov => "pip install checkov",
            Tool::Snyk => "npm install -g snyk && snyk auth",
            Tool::LicenseCheck => "npm install -g license-checker",
        }
    }

    /// Build the argv for this tool under the given configuration.
    pub fn command(&self, config: &RunConfig, package_manager: PackageManager) -> Vec<String> {
        match self {
            Tool::DependencyAudit => package_manager.audit_command(config.fix),
            Tool::Eslint => {
                let mut cmd: Vec<String> = vec![
                    "eslint".into(),
                    ".".into(),
                    "--ext".into(),
                    ".js,.jsx,.ts,.tsx".into(),
                    "--no-error-on-unmatched-pattern".into(),
                ];
                if config.fix {
                    cmd.push("--fix".into());
                }
                cmd
            }
            Tool::OsvScanner => {
                vec!["osv-scanner".into(), "--recursive".into(), ".".into()]
            }
            Tool::Gitleaks => vec![
                "gitleaks".into(),
                "detect".into(),
                "--no-banner".into(),
                "--redact".into(),
                "--source".into(),
                ".".into(),
            ],
            Tool::Checkov => vec![
                "checkov".into(),
                "--directory".into(),
                ".".into(),
                "--quiet".into(),
                "--compact".into(),
            ],
            Tool::Snyk => vec!["snyk".into(), "test".into(), "--all-projects".into()],
            Tool::LicenseCheck => vec!["license-checker".into(), "--summary".into()],
        }
    }

    /// Classify a finished subprocess into its effective outcome.
    ///
    /// Every tool except Snyk maps exit 0 to pass and anything else to fail.
    ///
    /// Known special case: the Snyk test is never allowed to fail the run.
    /// Its exit codes conflate real findings with rate limiting and project
    /// detection issues, so benign outputs override the code to 0 and every
    /// other non-zero exit becomes a warning-level pass with a recorded
    /// caveat. Do not "fix" this to propagate failures.
    pub fn classify(&self, exit_code: i32, output: &str) -> Outcome {
        if exit_code == 0 {
            return Outcome::passed(0);
        }
        match self {
            Tool::Snyk => classify_snyk(exit_code, output),
            _ => Outcome::failed(exit_code),
        }
    }
}

fn classify_snyk(exit_code: i32, output: &str) -> Outcome {
    let lower = output.to_lowercase();
    if lower.contains("no vulnerable paths") {
        return Outcome::passed(0);
    }
    if lower.contains("monthly limit") || lower.contains("test limit reached") {
        return Outcome::passed_with(0, "snyk monthly scan limit reached; treated as pass");
    }
    if lower.contains("could not detect supported target files")
        || lower.contains("no supported files")
        || lower.contains("no supported projects")
    {
        return Outcome::passed_with(0, "snyk found no supported project files; treated as pass");
    }
    Outcome::passed_with(
        exit_code,
        format!("snyk exited with code {exit_code}; recorded as warning, not failure"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_fix(fix: bool) -> RunConfig {
        RunConfig { fix, ..RunConfig::default() }
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = Tool::ALL.iter().map(|t| t.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Tool::ALL.len());
    }

    #[test]
    fn test_exit_zero_always_passes() {
        for tool in Tool::ALL {
            let outcome = tool.classify(0, "");
            assert_eq!(outcome.status, TestStatus::Passed);
            assert_eq!(outcome.exit_code, 0);
        }
    }

    #[test]
    fn test_nonzero_fails_for_regular_tools() {
        let outcome = Tool::Gitleaks.classify(1, "leaks found");
        assert_eq!(outcome.status, TestStatus::Failed);
        assert_eq!(outcome.exit_code, 1);
    }

    #[test]
    fn test_snyk_no_vulnerable_paths_overrides_to_pass() {
        let outcome = Tool::Snyk.classify(1, "Tested 120 dependencies. No vulnerable paths found.");
        assert_eq!(outcome.status, TestStatus::Passed);
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn test_snyk_quota_overrides_to_pass_with_note() {
        let outcome = Tool::Snyk.classify(2, "Error: monthly limit of private tests reached");
        assert_eq!(outcome.status, TestStatus::Passed);
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.note.is_some());
    }

    #[test]
    fn test_snyk_no_supported_files_overrides_to_pass() {
        let outcome = Tool::Snyk.classify(3, "Could not detect supported target files");
        assert_eq!(outcome.status, TestStatus::Passed);
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn test_snyk_unknown_failure_is_warning_level_pass() {
        let outcome = Tool::Snyk.classify(2, "some unexpected error");
        assert_eq!(outcome.status, TestStatus::Passed);
        assert_eq!(outcome.exit_code, 2);
        assert!(outcome.note.unwrap().contains("warning"));
    }

    #[test]
    fn test_fix_mode_appends_remediation_flags() {
        let config = config_with_fix(true);
        let audit = Tool::DependencyAudit.command(&config, PackageManager::Npm);
        assert_eq!(audit, vec!["npm", "audit", "fix"]);

        let eslint = Tool::Eslint.command(&config, PackageManager::Npm);
        assert_eq!(eslint.last().map(String::as_str), Some("--fix"));
    }

    #[test]
    fn test_yarn_audit_has_no_fix_subcommand() {
        let config = config_with_fix(true);
        let audit = Tool::DependencyAudit.command(&config, PackageManager::Yarn);
        assert_eq!(audit, vec!["yarn", "audit"]);
    }

    #[test]
    fn test_quick_mode_exclusions() {
        let secondary: Vec<_> = Tool::ALL.iter().filter(|t| t.is_secondary()).collect();
        assert_eq!(secondary, vec![&Tool::Gitleaks, &Tool::LicenseCheck]);
    }
}
