use crate::error::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional per-project configuration file, looked up in the project root.
pub const CONFIG_FILE: &str = "secsweep.toml";

/// Truthy value disables the tool-discovery cache, same as `--skip-cache`.
pub const NO_CACHE_ENV: &str = "SECSWEEP_NO_CACHE";

/// Authentication token forwarded to the Snyk subprocess.
pub const SNYK_TOKEN_ENV: &str = "SNYK_TOKEN";

pub const DEFAULT_OUTPUT_DIR: &str = "security-reports";
pub const DEFAULT_MAX_PARALLEL: usize = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Immutable configuration for one run, assembled once from CLI arguments,
/// the optional config file, and the environment, then passed to every
/// component. Nothing in the core reads flags from anywhere else.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Project directory the scanners run against.
    pub project_root: PathBuf,
    /// Directory receiving reports and per-test logs.
    pub output_dir: PathBuf,
    /// Core vulnerability scans only; secondary checks are skipped.
    pub quick: bool,
    /// Append auto-remediation flags where a tool supports one.
    pub fix: bool,
    /// Print installation guidance for missing tools before running.
    pub install: bool,
    /// Non-interactive mode: no color, JSON report always written.
    pub ci: bool,
    pub verbose: bool,
    /// Leave the Snyk test out even when the tool is installed.
    pub skip_snyk: bool,
    /// Bypass the tool-discovery cache.
    pub skip_cache: bool,
    /// Sequential mode only: stop launching tests after the first failure.
    pub fail_fast: bool,
    /// Write the JSON report in addition to the text report.
    pub json: bool,
    /// Bounded-parallel execution; sequential when false.
    pub parallel: bool,
    pub max_parallel: usize,
    /// Per-test wall-clock limit; the child is killed on expiry.
    pub timeout: Duration,
    pub snyk_token: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            project_root: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            quick: false,
            fix: false,
            install: false,
            ci: false,
            verbose: false,
            skip_snyk: false,
            skip_cache: false,
            fail_fast: false,
            json: false,
            parallel: true,
            max_parallel: DEFAULT_MAX_PARALLEL,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            snyk_token: None,
        }
    }
}

/// Defaults read from `secsweep.toml`. Every field is optional and CLI
/// flags take precedence over whatever is set here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub max_parallel: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub skip_snyk: Option<bool>,
    pub quick: Option<bool>,
}

impl FileConfig {
    /// Load `secsweep.toml` from the project root. A missing file yields the
    /// empty default; a malformed one is a usage error.
    pub fn load(project_root: &Path) -> Result<FileConfig, Error> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| Error::ConfigFile {
            path,
            message: e.to_string(),
        })
    }
}

/// Interpret a flag-style environment value ("1", "true", "yes", "on").
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether a flag-style environment variable is set and truthy.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| is_truthy(&v)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert!(config.parallel);
        assert_eq!(config.max_parallel, 4);
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.output_dir, PathBuf::from("security-reports"));
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_is_truthy() {
        for v in ["1", "true", "TRUE", "yes", " on "] {
            assert!(is_truthy(v), "expected '{v}' to be truthy");
        }
        for v in ["0", "false", "no", "off", "", "maybe"] {
            assert!(!is_truthy(v), "expected '{v}' to be falsy");
        }
    }

    #[test]
    fn test_file_config_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FileConfig::load(tmp.path()).unwrap();
        assert!(config.output_dir.is_none());
        assert!(config.max_parallel.is_none());
    }

    #[test]
    fn test_file_config_parses_known_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "output-dir = \"reports\"\nmax-parallel = 8\ntimeout-secs = 120\nskip-snyk = true\n",
        )
        .unwrap();

        let config = FileConfig::load(tmp.path()).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("reports")));
        assert_eq!(config.max_parallel, Some(8));
        assert_eq!(config.timeout_secs, Some(120));
        assert_eq!(config.skip_snyk, Some(true));
        assert!(config.quick.is_none());
    }

    #[test]
    fn test_file_config_rejects_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "outptu-dir = \"typo\"\n").unwrap();

        let err = FileConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigFile { .. }));
    }
}
