use crate::config::{RunConfig, SNYK_TOKEN_ENV};
use crate::error::Error;
use crate::plan::TestDefinition;
use crate::redact;
use crate::tools::{TestStatus, Tool};
use log::{info, warn};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Conventional exit code recorded when a test is killed on timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Recorded when a discovered tool fails to launch anyway.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Outcome of running one [`TestDefinition`]. Immutable once created.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    /// Effective status after tool-specific classification.
    pub status: TestStatus,
    /// Effective exit code (the Snyk policy may override the raw one).
    pub exit_code: i32,
    pub duration_seconds: f64,
    /// Captured combined stdout/stderr of the subprocess.
    pub log_file: PathBuf,
    /// Caveat surfaced by classification or timeout handling.
    pub note: Option<String>,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Run every test in the plan and collect results in definition order.
///
/// Sequential and bounded-parallel execution must produce the same result
/// content for the same plan; only wall-clock timing differs. Fail-fast is
/// a sequential-only behavior: the parallel scheduler never cancels or
/// suppresses work.
pub async fn execute_plan(
    plan: &[TestDefinition],
    config: &RunConfig,
) -> Result<Vec<TestResult>, Error> {
    std::fs::create_dir_all(&config.output_dir).map_err(|e| Error::OutputDir {
        path: config.output_dir.clone(),
        source: e,
    })?;

    if config.parallel && plan.len() > 1 {
        run_parallel(plan, config).await
    } else {
        run_sequential(plan, config).await
    }
}

async fn run_sequential(
    plan: &[TestDefinition],
    config: &RunConfig,
) -> Result<Vec<TestResult>, Error> {
    let mut results = Vec::with_capacity(plan.len());
    for definition in plan {
        let result = run_single(definition, config).await;
        let failed = !result.passed();
        results.push(result);
        if failed && config.fail_fast {
            info!("fail-fast: remaining tests skipped");
            break;
        }
    }
    Ok(results)
}

/// Semaphore-bounded worker pool: all tests are spawned up front, at most
/// `max_parallel` subprocesses run at once, and results are joined back in
/// definition order.
async fn run_parallel(
    plan: &[TestDefinition],
    config: &RunConfig,
) -> Result<Vec<TestResult>, Error> {
    let semaphore = Arc::new(Semaphore::new(config.max_parallel.max(1)));

    let handles: Vec<JoinHandle<TestResult>> = plan
        .iter()
        .cloned()
        .map(|definition| {
            let semaphore = Arc::clone(&semaphore);
            let config = config.clone();
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                run_single(&definition, &config).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (handle, definition) in handles.into_iter().zip(plan) {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                // A worker must never vanish without a result.
                warn!("worker for {} aborted: {e}", definition.id);
                results.push(TestResult {
                    id: definition.id.clone(),
                    name: definition.name.clone(),
                    status: TestStatus::Failed,
                    exit_code: -1,
                    duration_seconds: 0.0,
                    log_file: log_path(config, &definition.id),
                    note: Some(format!("runner worker aborted: {e}")),
                });
            }
        }
    }
    Ok(results)
}

fn log_path(config: &RunConfig, id: &str) -> PathBuf {
    config.output_dir.join(format!("test-{id}.log"))
}

async fn run_single(definition: &TestDefinition, config: &RunConfig) -> TestResult {
    let log_file = log_path(config, &definition.id);
    info!("running {}: {}", definition.id, definition.command.join(" "));
    let started = Instant::now();

    let capture = spawn_and_capture(definition, config).await;
    let duration_seconds = started.elapsed().as_secs_f64();

    let mut outcome = definition.tool.classify(capture.exit_code, &capture.output);
    if capture.timed_out {
        let limit = config.timeout.as_secs();
        outcome.note = Some(match outcome.status {
            TestStatus::Failed => format!("timed out after {limit}s and was killed"),
            TestStatus::Passed => {
                format!("timed out after {limit}s and was killed; tolerated for this tool")
            }
        });
    }

    if let Err(e) = std::fs::write(&log_file, redact::scrub_output(&capture.output)) {
        warn!("could not write {}: {e}", log_file.display());
    }

    info!(
        "{} finished: {} (exit {}) in {:.1}s",
        definition.id,
        outcome.status.as_str(),
        outcome.exit_code,
        duration_seconds
    );

    TestResult {
        id: definition.id.clone(),
        name: definition.name.clone(),
        status: outcome.status,
        exit_code: outcome.exit_code,
        duration_seconds,
        log_file,
        note: outcome.note,
    }
}

struct Capture {
    exit_code: i32,
    output: String,
    timed_out: bool,
}

async fn spawn_and_capture(definition: &TestDefinition, config: &RunConfig) -> Capture {
    let mut command = Command::new(&definition.command[0]);
    command
        .args(&definition.command[1..])
        .current_dir(&config.project_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if definition.tool == Tool::Snyk {
        if let Some(token) = &config.snyk_token {
            command.env(SNYK_TOKEN_ENV, token);
        }
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return Capture {
                exit_code: SPAWN_FAILURE_EXIT_CODE,
                output: format!("failed to launch '{}': {e}\n", definition.command[0]),
                timed_out: false,
            }
        }
    };

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out = Vec::new();
    let mut err = Vec::new();

    // Drain both pipes while waiting; a full pipe would otherwise wedge the
    // child before it can exit.
    let wait = async {
        tokio::join!(
            async {
                if let Some(stream) = stdout.as_mut() {
                    let _ = stream.read_to_end(&mut out).await;
                }
            },
            async {
                if let Some(stream) = stderr.as_mut() {
                    let _ = stream.read_to_end(&mut err).await;
                }
            },
        );
        child.wait().await
    };

    match tokio::time::timeout(config.timeout, wait).await {
        Ok(status) => {
            let exit_code = match status {
                Ok(status) => exit_code_of(status),
                Err(e) => {
                    warn!("could not reap {}: {e}", definition.id);
                    -1
                }
            };
            Capture {
                exit_code,
                output: combine_output(out, err),
                timed_out: false,
            }
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("could not kill timed-out {}: {e}", definition.id);
            }
            let mut output = combine_output(out, err);
            output.push_str(&format!(
                "\n[secsweep] killed after exceeding the {}s timeout\n",
                config.timeout.as_secs()
            ));
            Capture {
                exit_code: TIMEOUT_EXIT_CODE,
                output,
                timed_out: true,
            }
        }
    }
}

fn combine_output(stdout: Vec<u8>, stderr: Vec<u8>) -> String {
    let mut output = String::from_utf8_lossy(&stdout).into_owned();
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&String::from_utf8_lossy(&stderr));
    }
    output
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
