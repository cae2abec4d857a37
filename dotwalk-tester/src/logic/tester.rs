use colored::Colorize;
use serde::{Deserialize, Serialize, Serializer};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::driver::RunStats;
use crate::logic::seeds::SeedInfo;
use crate::logic::simulation::{SimulationPlan, SimulationSummary, Simulator};

/// One iteration of one scenario for one seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub scenario_key: String,
    pub seed: u64,
    pub seed_code: String,
    pub iteration: usize,
    pub passed: bool,
    pub stats: RunStats,
    pub fingerprint: Option<u64>,
    pub failure: Option<String>,
}

/// Aggregate over every iteration of a scenario for one seed input.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub scenario_key: String,
    pub seed: u64,
    pub seed_code: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Mean wall time of the passing iterations.
    #[serde(serialize_with = "millis")]
    pub average_duration: Duration,
    #[serde(serialize_with = "millis_each")]
    pub performance_data: Vec<Duration>,
    pub runs: Vec<RunRecord>,
}

fn millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

fn millis_each<S: Serializer>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(durations.iter().map(Duration::as_millis))
}

pub struct LogicTester {
    simulator: Simulator,
}

impl LogicTester {
    #[must_use]
    pub const fn new(simulator: Simulator) -> Self {
        Self { simulator }
    }

    /// Run `iterations` passes of `scenario` for each seed; one result per seed.
    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[SeedInfo],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|seed| {
                if self.simulator.verbose() {
                    println!(
                        "🧪 Testing scenario: {} (seed: {} code: {})",
                        scenario.name.bright_white(),
                        seed.seed,
                        seed.display_code()
                    );
                }
                self.run_seed(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_seed(&self, scenario: &TestScenario, seed: &SeedInfo, iterations: usize) -> ScenarioResult {
        let mut runs = Vec::with_capacity(iterations);
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for iteration in 0..iterations {
            let started = Instant::now();
            let record = self.run_iteration(scenario, seed, iteration);
            let elapsed = started.elapsed();
            let progress = format!("{}/{iterations}", iteration + 1);

            match &record.failure {
                Some(err) => {
                    let stats = &record.stats;
                    failures.push(format!(
                        "Iteration {progress} (seed {}, frames {}, legs {}, redirects {}, halts {}): {err}",
                        record.seed, stats.frames, stats.legs_picked, stats.redirects, stats.halts
                    ));
                    if self.simulator.verbose() {
                        println!("  ❌ Iteration {progress} failed: {}", err.as_str().red());
                    }
                }
                None => {
                    performance_data.push(elapsed);
                    if self.simulator.verbose() {
                        println!(
                            "  ✅ Iteration {progress} passed ({elapsed:?}) legs:{} redirects:{} distance:{:.1}",
                            record.stats.legs_picked, record.stats.redirects, record.stats.distance
                        );
                    }
                }
            }
            runs.push(record);
        }

        let average_duration = u32::try_from(performance_data.len())
            .ok()
            .filter(|count| *count > 0)
            .map_or(Duration::ZERO, |count| {
                performance_data.iter().sum::<Duration>() / count
            });

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            scenario_key: scenario.key.to_string(),
            seed: seed.seed,
            seed_code: seed.display_code(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: iterations - failures.len(),
            failures,
            average_duration,
            performance_data,
            runs,
        }
    }

    /// Iteration `n` runs with the seed offset by `n`.
    fn run_iteration(&self, scenario: &TestScenario, seed: &SeedInfo, iteration: usize) -> RunRecord {
        let run_seed = seed
            .seed
            .wrapping_add(u64::try_from(iteration).unwrap_or(u64::MAX));
        let (stats, fingerprint, failure) =
            match self.simulator.run_plan(&scenario.plan, run_seed, seed.policy) {
                Ok(summary) => (
                    summary.trace.stats.clone(),
                    Some(summary.fingerprint()),
                    first_failure(&scenario.plan, &summary),
                ),
                Err(err) => (RunStats::default(), None, Some(format!("{err:#}"))),
            };

        RunRecord {
            scenario_key: scenario.key.to_string(),
            seed: run_seed,
            seed_code: seed.iteration_code(iteration),
            iteration,
            passed: failure.is_none(),
            stats,
            fingerprint,
            failure,
        }
    }
}

fn first_failure(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.check(summary).err())
        .map(|err| format!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scenario::get_scenario;
    use crate::logic::simulation::SimulationSettings;

    fn tester() -> LogicTester {
        LogicTester::new(Simulator::new(
            SimulationSettings {
                frames: 600,
                ..SimulationSettings::default()
            },
            false,
        ))
    }

    #[test]
    fn smoke_passes_for_each_seed() {
        let scenario = get_scenario("smoke").unwrap();
        let seeds = [SeedInfo::from_numeric(1), SeedInfo::from_numeric(2)];
        let results = tester().run_scenario(scenario, &seeds, 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.runs.len(), 2);
            assert_eq!(result.successful_iterations, 2);
        }
        assert_eq!(results[0].runs[1].seed, 2);
    }

    #[test]
    fn offset_runs_do_not_reuse_the_input_code() {
        let scenario = get_scenario("smoke").unwrap();
        let seed = SeedInfo::from_numeric(40);
        let result = &tester().run_scenario(scenario, std::slice::from_ref(&seed), 2)[0];
        assert_eq!(result.seed_code, seed.display_code());
        assert_eq!(result.runs[0].seed_code, seed.display_code());
        assert_eq!(result.runs[1].seed, 41);
        assert_eq!(result.runs[1].seed_code, format!("{}+1", seed.display_code()));
    }

    fn always_fails(_summary: &SimulationSummary) -> anyhow::Result<()> {
        anyhow::bail!("nope")
    }

    #[test]
    fn failing_expectation_is_recorded() {
        let scenario = TestScenario::new(
            "always-fails",
            "Always Fails",
            "expectation that never holds",
            SimulationPlan::new().with_expectation(always_fails),
        );
        let results = tester().run_scenario(&scenario, &[SeedInfo::from_numeric(3)], 1);
        assert!(!results[0].passed);
        assert!(results[0].failures[0].contains("nope"));
        assert_eq!(results[0].runs[0].failure.as_deref(), Some("nope"));
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let scenario = get_scenario("smoke").unwrap();
        let results = tester().run_scenario(scenario, &[SeedInfo::from_numeric(4)], 1);
        let json = serde_json::to_value(&results[0]).unwrap();
        assert!(json["average_duration"].is_u64());
        assert_eq!(json["scenario_key"], "smoke");
    }
}
