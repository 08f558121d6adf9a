// The consolidated input snapshot accepted by the planning core

use super::config::ModelConfig;
use super::errors::{ConfigError, ValidationError};
use super::layout::Layout;
use super::scenario::Scenario;
use super::teams::TeamRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layout, teams and configuration for one sweep.
///
/// ```
/// use deskplan::domain::PlanningInput;
///
/// let input = PlanningInput::from_toml_str(r#"
///     [layout]
///     desks = [{ id = "d1", positions = 2 }, { id = "d2", positions = 2 }]
///     distances = [{ desk_a = "d1", desk_b = "d2", distance = 5.0 }]
///
///     [teams]
///     teams = [{ id = "a", size = 3 }, { id = "b", size = 2 }]
///
///     [config]
///     distance_weight = 1.0
///     mandatory_day_sweep = [1, 2]
/// "#).unwrap();
///
/// assert_eq!(input.layout.total_capacity(), 4);
/// assert_eq!(input.scenarios().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningInput {
    pub layout: Layout,
    pub teams: TeamRegistry,
    #[serde(default)]
    pub config: ModelConfig,
    /// Explicit per-team scenarios; when empty the configuration's uniform
    /// sweep is used instead
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl PlanningInput {
    pub fn new(layout: Layout, teams: TeamRegistry, config: ModelConfig) -> Self {
        Self {
            layout,
            teams,
            config,
            scenarios: Vec::new(),
        }
    }

    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Loads and validates a TOML snapshot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let input: Self = toml::from_str(s)?;
        input.validate()?;
        Ok(input)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let input: Self = serde_json::from_str(s)?;
        input.validate()?;
        Ok(input)
    }

    /// Scenarios to solve, in sweep order
    pub fn scenarios(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            self.config.uniform_scenarios(&self.teams)
        } else {
            self.scenarios.clone()
        }
    }

    /// Checks the shared inputs; per-scenario parameters are checked by the model builder.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();
        for result in [
            self.layout.validate(),
            self.teams.validate(),
            self.config.validate(),
        ] {
            if let Err(err) = result {
                reasons.extend(err.reasons);
            }
        }
        ValidationError::check(reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
        scenarios = [
            { name = "hybrid", mandatory_days = { a = 3, b = 2 } },
        ]

        [layout]
        desks = [
            { id = "d1", positions = 2, location = { corridor = 1, index = 1 } },
            { id = "d2", positions = 2, location = { corridor = 2, index = 1 } },
        ]

        [teams]
        teams = [
            { id = "a", size = 3, preferred_days = { monday = 1.5 } },
            { id = "b", size = 2 },
        ]
        synergies = [{ team_a = "a", team_b = "b" }]

        [config]
        objective_mode = "occupancy_plus_synergy"
        min_slack = 1
        solver_time_limit_seconds = 10.0
    "#;

    #[test]
    fn parses_full_snapshot() {
        let input = PlanningInput::from_toml_str(SNAPSHOT).unwrap();
        assert_eq!(input.layout.distance_table()[0][1], 5.0);
        assert_eq!(input.teams.teams[0].preference_weight(crate::domain::Day::Monday), 2.5);
        assert_eq!(input.teams.synergies[0].weight, 1.0);
        assert_eq!(input.config.min_slack, 1);
        assert_eq!(input.config.distance_weight, 10.0);

        let scenarios = input.scenarios();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].days_for("a"), Some(3));
    }

    #[test]
    fn json_snapshot_round_trips_through_serde() {
        let input = PlanningInput::from_toml_str(SNAPSHOT).unwrap();
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(PlanningInput::from_json_str(&json).unwrap(), input);
    }

    #[test]
    fn invalid_snapshot_is_rejected_after_parse() {
        let err = PlanningInput::from_toml_str(
            r#"
            [layout]
            desks = [{ id = "d1", positions = 0 }]
            [teams]
            teams = [{ id = "a", size = 1 }]
            [config]
            optimality_gap = 1.5
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Invalid(v) => assert_eq!(v.reasons.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_slack_fails_to_parse() {
        let err = PlanningInput::from_toml_str(
            r#"
            [layout]
            desks = [{ id = "d1", positions = 1 }]
            [teams]
            teams = [{ id = "a", size = 1 }]
            [config]
            min_slack = -1
            "#,
        );
        assert!(matches!(err, Err(ConfigError::Toml(_))));
    }
}
