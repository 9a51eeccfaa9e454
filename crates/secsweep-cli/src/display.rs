use colored::*;
use secsweep_core::report::format_duration;
use secsweep_core::{RunConfig, RunOutcome, TestResult, ToolInventory};

/// Print the run banner.
pub fn print_header(config: &RunConfig) {
    println!();
    println!(
        "{}",
        format!(
            " SecSweep v{} — scanning {}",
            env!("CARGO_PKG_VERSION"),
            config.project_root.display()
        )
        .bold()
    );
    println!();
}

/// Print which scanners were found and which are missing.
pub fn print_inventory(inventory: &ToolInventory, config: &RunConfig) {
    println!(" {}", "Scanners".bold().underline());
    for (tool, path) in &inventory.available {
        println!(
            " {} {} {}",
            "|-".dimmed(),
            format!("{:<14}", tool.id()).green(),
            path.display().to_string().dimmed()
        );
    }
    for tool in &inventory.missing {
        println!(
            " {} {} {}",
            "|-".dimmed(),
            format!("{:<14}", tool.id()).yellow(),
            "not found".dimmed()
        );
        if config.install {
            println!("      {} {}", "install:".dimmed(), tool.install_hint().cyan());
        }
    }
    println!();
}

/// Print one line per finished test, in definition order.
pub fn print_results(results: &[TestResult]) {
    println!(" {}", "Results".bold().underline());
    for result in results {
        let status = if result.passed() {
            " PASS ".on_green().black().bold().to_string()
        } else {
            " FAIL ".on_red().white().bold().to_string()
        };
        print!(
            " {} {:<14} {:<22} {:>8}",
            status,
            result.id,
            result.name,
            format_duration(result.duration_seconds)
        );
        if let Some(note) = &result.note {
            print!("  {}", note.yellow());
        }
        println!();
    }
    println!();
}

/// Print the summary block and where the reports landed.
pub fn print_summary(outcome: &RunOutcome) {
    let summary = &outcome.summary;

    println!(" {}", "=".repeat(56).dimmed());
    println!();
    println!(" {}", "Summary".bold().underline());
    println!(" {} Tests run: {}", "|-".dimmed(), summary.total);
    println!(
        " {} Passed:    {}",
        "|-".dimmed(),
        if summary.passed > 0 {
            summary.passed.to_string().green().to_string()
        } else {
            summary.passed.to_string()
        }
    );
    println!(
        " {} Failed:    {}",
        "|-".dimmed(),
        if summary.failed > 0 {
            summary.failed.to_string().red().bold().to_string()
        } else {
            "0".to_string()
        }
    );
    println!(" {} Success:   {:.2}%", "|-".dimmed(), summary.success_rate());
    println!(
        " {} Duration:  {}",
        "|-".dimmed(),
        format_duration(summary.total_duration_seconds)
    );
    println!();

    if let Some(reports) = &outcome.reports {
        println!(" Report: {}", reports.text.display().to_string().cyan());
        if let Some(json) = &reports.json {
            println!(" JSON:   {}", json.display().to_string().cyan());
        }
    } else {
        println!(" {}", "Report files could not be written".yellow());
    }
    println!();

    if summary.all_passed() {
        println!(" {} All security tests passed", "OK".green().bold());
    } else {
        println!(
            " {} {} of {} security tests failed; see the logs above",
            "!!".red().bold(),
            summary.failed,
            summary.total
        );
    }
    println!();
}

pub fn print_warning(message: &str) {
    println!(" {} {}", "warning:".yellow().bold(), message);
}

pub fn print_fatal(error: &anyhow::Error) {
    eprintln!();
    eprintln!(" {} {:#}", "error:".red().bold(), error);
    eprintln!();
}
