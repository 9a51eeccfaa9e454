use crate::config::RunConfig;
use crate::discovery::{self, ToolInventory};
use crate::error::Error;
use crate::plan::{self, TestDefinition};
use crate::report::{self, RunSummary, WrittenReports};
use crate::runner::{self, TestResult};
use log::{info, warn};

/// Everything one invocation produced: what was found, what ran, how it
/// went, and where the reports landed.
#[derive(Debug)]
pub struct RunOutcome {
    pub inventory: ToolInventory,
    pub plan: Vec<TestDefinition>,
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
    /// `None` when report writing failed; the run itself still counts.
    pub reports: Option<WrittenReports>,
}

impl RunOutcome {
    /// Process exit code: 0 only when every effective result passed.
    pub fn exit_code(&self) -> i32 {
        if self.summary.all_passed() {
            0
        } else {
            1
        }
    }
}

/// Drive a full run: discover, build the plan, execute, report.
///
/// Fatal preconditions (no package manager, nothing to run) abort before
/// any test starts and before any file is written. Individual test failures
/// never abort; they surface only through the summary and exit code.
pub async fn run(config: &RunConfig) -> Result<RunOutcome, Error> {
    run_with_inventory(config, discovery::discover(config)).await
}

/// Same as [`run`], with discovery already done. Lets callers and tests
/// control tool resolution explicitly.
pub async fn run_with_inventory(
    config: &RunConfig,
    inventory: ToolInventory,
) -> Result<RunOutcome, Error> {
    for tool in &inventory.missing {
        info!("{} not installed; its test will be skipped", tool.id());
    }

    let plan = plan::build_plan(&inventory, config)?;
    info!("planned {} tests", plan.len());

    let results = runner::execute_plan(&plan, config).await?;
    let summary = RunSummary::from_results(&results);

    // Report writing is best-effort: the exit code must reflect scan
    // outcomes, not filesystem trouble.
    let reports =
        match report::write_reports(&config.output_dir, &summary, &results, config.json) {
            Ok(written) => Some(written),
            Err(e) => {
                warn!("could not write report files: {e}");
                None
            }
        };

    Ok(RunOutcome {
        inventory,
        plan,
        results,
        summary,
        reports,
    })
}
