use crate::runner::TestResult;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Host descriptor embedded in every report.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub os: String,
    pub arch: String,
    pub hostname: String,
}

impl Environment {
    pub fn capture() -> Self {
        Environment {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            hostname: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("COMPUTERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// Aggregate of one full invocation, derived entirely from the results.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration_seconds: f64,
    pub timestamp: DateTime<Local>,
    pub environment: Environment,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed()).count();
        RunSummary {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            total_duration_seconds: results.iter().map(|r| r.duration_seconds).sum(),
            timestamp: Local::now(),
            environment: Environment::capture(),
        }
    }

    /// Pass percentage rounded to 2 decimals.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.passed as f64 * 100.0 / self.total as f64 * 100.0).round() / 100.0
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Format seconds as a compact human-readable duration.
pub fn format_duration(secs: f64) -> String {
    if secs >= 60.0 {
        let total = secs.round() as u64;
        format!("{}m{:02}s", total / 60, total % 60)
    } else {
        format!("{:.1}s", secs)
    }
}

/// Render the plain-text report: header block, summary, then one line per
/// test in definition order.
pub fn render_text(summary: &RunSummary, results: &[TestResult]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(56);
    let thin_rule = "-".repeat(56);

    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(" SecSweep Security Report v{}\n", env!("CARGO_PKG_VERSION")));
    out.push_str(&format!(
        " Generated: {}\n",
        summary.timestamp.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!(
        " Host: {} ({}/{})\n",
        summary.environment.hostname, summary.environment.os, summary.environment.arch
    ));
    out.push_str(&rule);
    out.push_str("\n\n");

    out.push_str(&format!(" Tests run: {}\n", summary.total));
    out.push_str(&format!(" Passed:    {}\n", summary.passed));
    out.push_str(&format!(" Failed:    {}\n", summary.failed));
    out.push_str(&format!(" Success:   {:.2}%\n", summary.success_rate()));
    out.push_str(&format!(
        " Duration:  {}\n\n",
        format_duration(summary.total_duration_seconds)
    ));

    out.push_str(&thin_rule);
    out.push('\n');
    for result in results {
        let status = if result.passed() { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            " [{}] {:<14} {:<22} {:>8}",
            status,
            result.id,
            result.name,
            format_duration(result.duration_seconds)
        ));
        if let Some(note) = &result.note {
            out.push_str(&format!("  ({note})"));
        }
        out.push('\n');
    }
    out.push_str(&thin_rule);
    out.push('\n');

    out
}

/// Schema version of the JSON report, bumped on breaking layout changes.
const JSON_REPORT_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub version: String,
    pub tool_version: String,
    pub timestamp: String,
    pub environment: Environment,
    pub summary: JsonSummary,
    pub tests: Vec<JsonTest>,
}

#[derive(Debug, Serialize)]
pub struct JsonSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_seconds: f64,
    pub success_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonTest {
    pub id: String,
    pub name: String,
    pub status: &'static str,
    pub exit_code: i32,
    pub duration_seconds: f64,
    pub log_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub fn build_json(summary: &RunSummary, results: &[TestResult]) -> JsonReport {
    JsonReport {
        version: JSON_REPORT_VERSION.to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: summary.timestamp.to_rfc3339(),
        environment: summary.environment.clone(),
        summary: JsonSummary {
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            duration_seconds: summary.total_duration_seconds,
            success_rate: summary.success_rate(),
        },
        tests: results
            .iter()
            .map(|r| JsonTest {
                id: r.id.clone(),
                name: r.name.clone(),
                status: r.status.as_str(),
                exit_code: r.exit_code,
                duration_seconds: r.duration_seconds,
                log_file: r.log_file.display().to_string(),
                note: r.note.clone(),
            })
            .collect(),
    }
}

/// Paths of the report files produced by [`write_reports`].
#[derive(Debug, Clone)]
pub struct WrittenReports {
    pub text: PathBuf,
    pub json: Option<PathBuf>,
}

/// Write the text report (and optionally the JSON report) under timestamped
/// names, creating the output directory if needed.
pub fn write_reports(
    output_dir: &Path,
    summary: &RunSummary,
    results: &[TestResult],
    json: bool,
) -> std::io::Result<WrittenReports> {
    std::fs::create_dir_all(output_dir)?;
    let stamp = summary.timestamp.format("%Y%m%d-%H%M%S");

    let text_path = output_dir.join(format!("security-report-{stamp}.txt"));
    std::fs::write(&text_path, render_text(summary, results))?;

    let json_path = if json {
        let path = output_dir.join(format!("security-report-{stamp}.json"));
        let report = build_json(summary, results);
        let body = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
        std::fs::write(&path, body)?;
        Some(path)
    } else {
        None
    };

    Ok(WrittenReports {
        text: text_path,
        json: json_path,
    })
}
