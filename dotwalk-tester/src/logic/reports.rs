use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let total = results.len();
    if total == 0 {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / total as f64) * 100.0;
    rate
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Walker Scenario Results".bright_cyan().bold())?;
    writeln!(writer, "{}", "==========================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Total runs: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(writer, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            writer,
            "{} {} [{}]",
            status,
            result.scenario_name.bold(),
            result.seed_code
        )?;
        writeln!(
            writer,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "   Average time: {:?}", result.average_duration)?;
        if let Some(last) = result.runs.last() {
            writeln!(
                writer,
                "   Last run: legs {} redirects {} halts {} distance {:.1} overshoot {:.2}",
                last.stats.legs_picked,
                last.stats.redirects,
                last.stats.halts,
                last.stats.distance,
                last.stats.worst_overshoot
            )?;
        }

        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "# Dotwalk Scenario Results\n")?;
    writeln!(writer, "_Generated {}_\n", Utc::now().to_rfc3339())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total runs**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(writer, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(writer, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            writer,
            "### {} {} (`{}`)\n",
            status, result.scenario_name, result.seed_code
        )?;
        writeln!(
            writer,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "- **Average time**: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// One row per run.
pub fn generate_csv_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(
        writer,
        "scenario,seed_code,seed,iteration,passed,frames,legs_picked,redirects,halts,paused_ticks,idle_ticks,advancing_ticks,distance,worst_overshoot,worst_escape,rejected_fields,fingerprint"
    )?;
    for run in results.iter().flat_map(|r| r.runs.iter()) {
        let stats = &run.stats;
        let fingerprint = run
            .fingerprint
            .map(|f| format!("{f:016x}"))
            .unwrap_or_default();
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{:.3},{:.4},{:.4},{},{}",
            run.scenario_key,
            run.seed_code,
            run.seed,
            run.iteration,
            run.passed,
            stats.frames,
            stats.legs_picked,
            stats.redirects,
            stats.halts,
            stats.paused_ticks,
            stats.idle_ticks,
            stats.advancing_ticks,
            stats.distance,
            stats.worst_overshoot,
            stats.worst_escape,
            stats.rejected_fields,
            fingerprint
        )?;
    }
    Ok(())
}
