mod common;
mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::scenario::{get_scenario, list_scenarios, scenario_keys};
use common::{load_config, parse_viewport, split_csv};
use logic::reports::{
    generate_console_report, generate_csv_report, generate_json_report, generate_markdown_report,
};
use logic::{LogicTester, ScenarioResult, SimulationSettings, Simulator, resolve_seed_inputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "dotwalk-tester", version)]
#[command(about = "Headless frame driver and QA scenarios for the Dotwalk motion engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// Print the scenario catalog and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers or replay codes, or `all`)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Runs per scenario and seed; each run offsets the seed by its index
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Frames per run; scenarios may raise this to their own minimum
    #[arg(long, default_value_t = logic::simulation::DEFAULT_FRAMES)]
    frames: u64,

    /// Simulated milliseconds between frames
    #[arg(long, default_value_t = dotwalk_core::DEFAULT_FRAME_INTERVAL_MS)]
    frame_ms: u64,

    /// Drawable area as WIDTHxHEIGHT
    #[arg(long, default_value = "800x600")]
    viewport: String,

    /// Walker configuration JSON file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Print per-iteration progress
    #[arg(short, long)]
    verbose: bool,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_scenarios {
        let mut out = open_output(args.output.as_deref())?;
        write_catalog(&mut out)?;
        out.flush()?;
        return Ok(());
    }

    println!("{}", "🟠 Dotwalk Scenario Tester".bright_cyan().bold());
    println!("{}", "==========================".cyan());

    let started = Instant::now();
    let settings = build_settings(&args)?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let tester = LogicTester::new(Simulator::new(settings, args.verbose));

    let mut results = Vec::new();
    for key in expand_scenarios(&args.scenarios) {
        match get_scenario(&key) {
            Some(scenario) => {
                results.extend(tester.run_scenario(scenario, &seeds, args.iterations));
            }
            None => eprintln!("⚠️  Unknown scenario: {}", key.yellow()),
        }
    }

    let mut out = open_output(args.output.as_deref())?;
    write_report(&mut out, args.report, &results, started)?;
    out.flush()?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn build_settings(args: &Args) -> Result<SimulationSettings> {
    anyhow::ensure!(args.frame_ms > 0, "--frame-ms must be at least 1");
    anyhow::ensure!(args.iterations > 0, "--iterations must be at least 1");
    Ok(SimulationSettings {
        config: load_config(args.config.as_deref())?,
        viewport: parse_viewport(&args.viewport)?,
        frames: args.frames,
        frame_ms: args.frame_ms,
    })
}

/// Expand `all` in place, keeping explicitly named scenarios first.
fn expand_scenarios(raw: &str) -> Vec<String> {
    let requested = split_csv(raw);
    if !requested.iter().any(|s| s == "all") {
        return requested;
    }
    let mut expanded: Vec<String> = requested.into_iter().filter(|s| s != "all").collect();
    for key in scenario_keys() {
        if !expanded.iter().any(|s| s == key) {
            expanded.push(key.to_string());
        }
    }
    expanded
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn write_catalog(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(out, "  {key:25} - {description}")?;
    }
    Ok(())
}

fn write_report(
    out: &mut dyn Write,
    format: ReportFormat,
    results: &[ScenarioResult],
    started: Instant,
) -> Result<()> {
    match format {
        ReportFormat::Json => generate_json_report(out, results),
        ReportFormat::Markdown => generate_markdown_report(out, results),
        ReportFormat::Csv => generate_csv_report(out, results),
        ReportFormat::Console => {
            generate_console_report(out, results, started.elapsed())?;
            writeln!(out)?;
            writeln!(out, "🏁 Total time: {:?}", started.elapsed())?;
            Ok(())
        }
    }
}
