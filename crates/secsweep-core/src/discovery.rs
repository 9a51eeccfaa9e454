use crate::config::RunConfig;
use crate::tools::{PackageManager, Tool};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Which scanners (and which package manager) this host can actually run.
///
/// Discovery is a pure query over the search path: a missing optional tool
/// just drops its test from the run. Only a missing package manager is a
/// fatal precondition, enforced later by the plan builder.
#[derive(Debug, Clone)]
pub struct ToolInventory {
    pub package_manager: Option<(PackageManager, PathBuf)>,
    pub available: BTreeMap<Tool, PathBuf>,
    pub missing: Vec<Tool>,
}

impl ToolInventory {
    pub fn is_available(&self, tool: Tool) -> bool {
        self.available.contains_key(&tool)
    }
}

/// Probe the current `PATH` for every known tool.
pub fn discover(config: &RunConfig) -> ToolInventory {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    discover_with_path(config, &path_var)
}

/// Probe against an explicit search-path string. Exposed so callers (and
/// tests) can control resolution without mutating process environment.
pub fn discover_with_path(config: &RunConfig, path_var: &OsStr) -> ToolInventory {
    let cache = if config.skip_cache {
        None
    } else {
        DiscoveryCache::load()
    };
    let mut fresh = DiscoveryCache::empty();

    let mut probe = |name: &str| -> Option<PathBuf> {
        if let Some(hit) = cache.as_ref().and_then(|c| c.lookup(name)) {
            fresh.record(name, &hit);
            return Some(hit);
        }
        let found = find_executable_in(name, path_var);
        if let Some(path) = &found {
            fresh.record(name, path);
        }
        found
    };

    let package_manager = detect_package_manager(&config.project_root, &mut probe);

    let mut available = BTreeMap::new();
    let mut missing = Vec::new();
    for &tool in Tool::ALL {
        let resolved = match tool.probe_binary() {
            Some(binary) => probe(binary),
            None => package_manager.as_ref().map(|(_, path)| path.clone()),
        };
        match resolved {
            Some(path) => {
                debug!("found {} at {}", tool.id(), path.display());
                available.insert(tool, path);
            }
            None => {
                debug!("{} not found on PATH", tool.id());
                missing.push(tool);
            }
        }
    }

    if !config.skip_cache {
        fresh.save();
    }

    ToolInventory {
        package_manager,
        available,
        missing,
    }
}

/// Resolve the package manager driving the baseline audit. A lockfile in the
/// project root pins the choice; otherwise the first manager on PATH wins.
fn detect_package_manager(
    project_root: &Path,
    probe: &mut impl FnMut(&str) -> Option<PathBuf>,
) -> Option<(PackageManager, PathBuf)> {
    for &pm in PackageManager::ALL {
        if project_root.join(pm.lockfile()).is_file() {
            if let Some(path) = probe(pm.binary()) {
                return Some((pm, path));
            }
        }
    }
    for &pm in PackageManager::ALL {
        if let Some(path) = probe(pm.binary()) {
            return Some((pm, path));
        }
    }
    None
}

/// Walk a `PATH`-style variable looking for an executable with this name.
pub fn find_executable_in(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in candidate_names(name) {
            let path = dir.join(&candidate);
            if is_executable(&path) {
                return Some(path);
            }
        }
    }
    None
}

#[cfg(windows)]
fn candidate_names(name: &str) -> Vec<String> {
    vec![
        format!("{name}.exe"),
        format!("{name}.cmd"),
        format!("{name}.bat"),
        name.to_string(),
    ]
}

#[cfg(not(windows))]
fn candidate_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

const CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Best-effort cache of resolved tool paths. Lives in the system temp dir
/// (never the output directory) and every failure mode degrades to a fresh
/// probe, so correctness never depends on it.
#[derive(Debug, Serialize, Deserialize)]
struct DiscoveryCache {
    created_unix: u64,
    paths: BTreeMap<String, PathBuf>,
}

impl DiscoveryCache {
    fn cache_path() -> PathBuf {
        std::env::temp_dir().join("secsweep-tools.json")
    }

    fn now_unix() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn empty() -> Self {
        DiscoveryCache {
            created_unix: Self::now_unix(),
            paths: BTreeMap::new(),
        }
    }

    fn load() -> Option<Self> {
        let content = std::fs::read_to_string(Self::cache_path()).ok()?;
        let cache: DiscoveryCache = serde_json::from_str(&content).ok()?;
        if Self::now_unix().saturating_sub(cache.created_unix) > CACHE_TTL_SECS {
            debug!("discovery cache is stale, reprobing");
            return None;
        }
        Some(cache)
    }

    /// A cached path only counts while it still points at an executable.
    fn lookup(&self, name: &str) -> Option<PathBuf> {
        let path = self.paths.get(name)?;
        is_executable(path).then(|| path.clone())
    }

    fn record(&mut self, name: &str, path: &Path) {
        self.paths.insert(name.to_string(), path.to_path_buf());
    }

    fn save(&self) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(Self::cache_path(), json) {
                debug!("could not write discovery cache: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[cfg(unix)]
    fn make_fake_bin(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn test_config(root: &Path) -> RunConfig {
        RunConfig {
            project_root: root.to_path_buf(),
            skip_cache: true,
            ..RunConfig::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_in_finds_executable_file() {
        let tmp = tempfile::tempdir().unwrap();
        let expected = make_fake_bin(tmp.path(), "gitleaks");

        let path_var = OsString::from(tmp.path());
        assert_eq!(find_executable_in("gitleaks", &path_var), Some(expected));
        assert_eq!(find_executable_in("checkov", &path_var), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_in_skips_non_executable() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("snyk"), "not a binary").unwrap();

        let path_var = OsString::from(tmp.path());
        assert_eq!(find_executable_in("snyk", &path_var), None);
    }

    #[test]
    fn test_find_executable_in_empty_path() {
        assert_eq!(find_executable_in("npm", &OsString::new()), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_classifies_available_and_missing() {
        let bins = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        make_fake_bin(bins.path(), "npm");
        make_fake_bin(bins.path(), "gitleaks");

        let config = test_config(project.path());
        let inventory = discover_with_path(&config, &OsString::from(bins.path()));

        assert!(inventory.package_manager.is_some());
        assert!(inventory.is_available(Tool::DependencyAudit));
        assert!(inventory.is_available(Tool::Gitleaks));
        assert!(!inventory.is_available(Tool::Snyk));
        assert!(inventory.missing.contains(&Tool::Snyk));
        assert!(inventory.missing.contains(&Tool::Checkov));
    }

    #[cfg(unix)]
    #[test]
    fn test_lockfile_pins_package_manager() {
        let bins = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        make_fake_bin(bins.path(), "npm");
        make_fake_bin(bins.path(), "yarn");
        std::fs::write(project.path().join("yarn.lock"), "").unwrap();

        let config = test_config(project.path());
        let inventory = discover_with_path(&config, &OsString::from(bins.path()));

        let (pm, _) = inventory.package_manager.unwrap();
        assert_eq!(pm, PackageManager::Yarn);
    }

    #[test]
    fn test_discover_without_any_tools() {
        let project = tempfile::tempdir().unwrap();
        let config = test_config(project.path());
        let inventory = discover_with_path(&config, &OsString::new());

        assert!(inventory.package_manager.is_none());
        assert!(inventory.available.is_empty());
        assert_eq!(inventory.missing.len(), Tool::ALL.len());
    }
}
