use once_cell::sync::Lazy;

use crate::logic::SimulationPlan;

pub mod catalog;

/// A named walker run with its expectations.
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// CLI key, e.g. `containment`.
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan,
        }
    }
}

static SCENARIOS: Lazy<Vec<TestScenario>> = Lazy::new(catalog::catalog_scenarios);

#[must_use]
pub fn get_scenario(key: &str) -> Option<&'static TestScenario> {
    SCENARIOS.iter().find(|scenario| scenario.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

/// Every registered key in catalog order.
#[must_use]
pub fn scenario_keys() -> Vec<&'static str> {
    SCENARIOS.iter().map(|scenario| scenario.key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique_and_resolvable() {
        let keys = scenario_keys();
        assert_eq!(keys.len(), 13);
        for key in &keys {
            assert_eq!(get_scenario(key).map(|s| s.key), Some(*key));
        }
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn listing_matches_keys() {
        let listed: Vec<_> = list_scenarios().into_iter().map(|(key, _)| key).collect();
        assert_eq!(listed, scenario_keys());
    }
}
