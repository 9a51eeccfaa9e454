use crate::config::RunConfig;
use crate::discovery::ToolInventory;
use crate::error::Error;
use crate::tools::Tool;
use log::debug;

/// One scheduled scan: which tool, how to invoke it, how to present it.
///
/// Built fresh for every invocation; ids are unique within a run by
/// construction (one definition per tool variant).
#[derive(Debug, Clone)]
pub struct TestDefinition {
    pub id: String,
    pub name: String,
    /// argv vector, spawned directly without an intermediate shell.
    pub command: Vec<String>,
    pub description: String,
    pub tool: Tool,
}

/// Turn the discovered inventory and the run configuration into the ordered
/// test list.
///
/// The baseline dependency audit is always present once a package manager
/// resolved; optional tools contribute one definition each unless missing,
/// skipped (`--skip-snyk`), or secondary in quick mode.
pub fn build_plan(
    inventory: &ToolInventory,
    config: &RunConfig,
) -> Result<Vec<TestDefinition>, Error> {
    let (package_manager, _) = inventory
        .package_manager
        .as_ref()
        .ok_or(Error::NoPackageManager)?;

    let mut plan = Vec::new();
    for &tool in Tool::ALL {
        if !inventory.is_available(tool) {
            continue;
        }
        if tool == Tool::Snyk && config.skip_snyk {
            debug!("snyk is available but skipped by configuration");
            continue;
        }
        if config.quick && tool.is_secondary() {
            debug!("{} skipped in quick mode", tool.id());
            continue;
        }
        if config.fix && tool.supports_fix() {
            debug!("{} will run with auto-remediation", tool.id());
        }
        let mut command = tool.command(config, *package_manager);
        // Invoke the exact executable discovery resolved, not whatever PATH
        // happens to say at spawn time.
        if let Some(path) = inventory.available.get(&tool) {
            command[0] = path.display().to_string();
        }
        plan.push(TestDefinition {
            id: tool.id().to_string(),
            name: tool.label().to_string(),
            command,
            description: tool.description().to_string(),
            tool,
        });
    }

    if plan.is_empty() {
        return Err(Error::EmptyPlan);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::PackageManager;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn inventory_with(tools: &[Tool]) -> ToolInventory {
        let mut available = BTreeMap::new();
        for &tool in tools {
            let binary = tool.probe_binary().unwrap_or("npm");
            available.insert(tool, PathBuf::from(format!("/usr/bin/{binary}")));
        }
        let missing = Tool::ALL
            .iter()
            .copied()
            .filter(|t| !available.contains_key(t))
            .collect();
        ToolInventory {
            package_manager: Some((PackageManager::Npm, PathBuf::from("/usr/bin/npm"))),
            available,
            missing,
        }
    }

    fn full_inventory() -> ToolInventory {
        inventory_with(Tool::ALL)
    }

    #[test]
    fn test_baseline_audit_is_always_first() {
        let plan = build_plan(&full_inventory(), &RunConfig::default()).unwrap();
        assert_eq!(plan[0].id, "npm-audit");
        assert_eq!(plan[0].command[0], "/usr/bin/npm");
        assert_eq!(plan[0].command[1], "audit");
    }

    #[test]
    fn test_plan_ids_are_unique() {
        let plan = build_plan(&full_inventory(), &RunConfig::default()).unwrap();
        let mut ids: Vec<_> = plan.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), plan.len());
    }

    #[test]
    fn test_missing_tools_are_excluded() {
        let inventory = inventory_with(&[Tool::DependencyAudit, Tool::Gitleaks]);
        let plan = build_plan(&inventory, &RunConfig::default()).unwrap();
        let ids: Vec<_> = plan.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["npm-audit", "gitleaks"]);
    }

    #[test]
    fn test_skip_snyk_removes_test_even_when_available() {
        let config = RunConfig { skip_snyk: true, ..RunConfig::default() };
        let plan = build_plan(&full_inventory(), &config).unwrap();
        assert!(plan.iter().all(|d| d.tool != Tool::Snyk));
    }

    #[test]
    fn test_quick_mode_drops_secondary_checks() {
        let config = RunConfig { quick: true, ..RunConfig::default() };
        let plan = build_plan(&full_inventory(), &config).unwrap();
        let ids: Vec<_> = plan.iter().map(|d| d.id.as_str()).collect();
        assert!(!ids.contains(&"gitleaks"));
        assert!(!ids.contains(&"license-check"));
        assert!(ids.contains(&"npm-audit"));
        assert!(ids.contains(&"snyk"));
    }

    #[test]
    fn test_no_package_manager_is_fatal() {
        let mut inventory = full_inventory();
        inventory.package_manager = None;
        let err = build_plan(&inventory, &RunConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NoPackageManager));
    }

    #[test]
    fn test_empty_plan_is_fatal() {
        let mut inventory = inventory_with(&[]);
        inventory.package_manager =
            Some((PackageManager::Npm, PathBuf::from("/usr/bin/npm")));
        let err = build_plan(&inventory, &RunConfig::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyPlan));
    }

    #[test]
    fn test_fix_mode_flows_into_commands() {
        let config = RunConfig { fix: true, ..RunConfig::default() };
        let plan = build_plan(&full_inventory(), &config).unwrap();
        let audit = plan.iter().find(|d| d.tool == Tool::DependencyAudit).unwrap();
        assert_eq!(audit.command[1..], ["audit", "fix"]);
        let eslint = plan.iter().find(|d| d.tool == Tool::Eslint).unwrap();
        assert!(eslint.command.contains(&"--fix".to_string()));
    }
}
