// Model configuration: objective weighting, slack floor, solver limits and the
// mandatory-day sweep.

use super::errors::ValidationError;
use super::models::SolverConfig;
use super::scenario::Scenario;
use super::teams::TeamRegistry;
use super::value_objects::{ObjectiveMode, SolverBackend};
use serde::{Deserialize, Serialize};

fn default_distance_weight() -> f64 {
    10.0
}

fn default_synergy_weight() -> f64 {
    1.0
}

fn default_time_limit() -> f64 {
    60.0
}

fn default_sweep() -> Vec<i32> {
    vec![2]
}

fn default_workers() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    #[serde(default)]
    pub objective_mode: ObjectiveMode,

    /// Penalty per unit of distance between two desks a team splits across
    #[serde(default = "default_distance_weight")]
    pub distance_weight: f64,

    /// Bonus per day two synergizing teams share, scaled by the edge weight
    #[serde(default = "default_synergy_weight")]
    pub synergy_weight: f64,

    /// Seats that must stay free every day
    #[serde(default)]
    pub min_slack: u32,

    #[serde(default = "default_time_limit")]
    pub solver_time_limit_seconds: f64,

    /// Relative MIP gap in `[0, 1)` at which a solve counts as solved
    #[serde(default)]
    pub optimality_gap: f64,

    #[serde(default)]
    pub backend: SolverBackend,

    /// Uniform mandatory-day counts, one scenario each, used when no explicit
    /// scenarios are supplied
    #[serde(default = "default_sweep")]
    pub mandatory_day_sweep: Vec<i32>,

    /// Upper bound on scenarios solved at the same time
    #[serde(default = "default_workers")]
    pub max_workers: usize,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            objective_mode: ObjectiveMode::default(),
            distance_weight: default_distance_weight(),
            synergy_weight: default_synergy_weight(),
            min_slack: 0,
            solver_time_limit_seconds: default_time_limit(),
            optimality_gap: 0.0,
            backend: SolverBackend::default(),
            mandatory_day_sweep: default_sweep(),
            max_workers: default_workers(),
            verbose: false,
        }
    }
}

impl ModelConfig {
    pub fn with_objective_mode(mut self, mode: ObjectiveMode) -> Self {
        self.objective_mode = mode;
        self
    }

    pub fn with_distance_weight(mut self, weight: f64) -> Self {
        self.distance_weight = weight;
        self
    }

    pub fn with_synergy_weight(mut self, weight: f64) -> Self {
        self.synergy_weight = weight;
        self
    }

    pub fn with_min_slack(mut self, seats: u32) -> Self {
        self.min_slack = seats;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.solver_time_limit_seconds = seconds;
        self
    }

    pub fn with_optimality_gap(mut self, gap: f64) -> Self {
        self.optimality_gap = gap;
        self
    }

    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_sweep(mut self, days: Vec<i32>) -> Self {
        self.mandatory_day_sweep = days;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Finish construction, rejecting out-of-range values.
    pub fn validated(self) -> Result<Self, ValidationError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        if !(self.distance_weight.is_finite() && self.distance_weight >= 0.0) {
            reasons.push(format!(
                "distance weight must be nonnegative, got {}",
                self.distance_weight
            ));
        }
        if !(self.synergy_weight.is_finite() && self.synergy_weight >= 0.0) {
            reasons.push(format!(
                "synergy weight must be nonnegative, got {}",
                self.synergy_weight
            ));
        }
        if !(self.solver_time_limit_seconds.is_finite() && self.solver_time_limit_seconds > 0.0) {
            reasons.push(format!(
                "solver time limit must be positive, got {}",
                self.solver_time_limit_seconds
            ));
        }
        if !(0.0..1.0).contains(&self.optimality_gap) {
            reasons.push(format!(
                "optimality gap must lie in [0, 1), got {}",
                self.optimality_gap
            ));
        }
        if self.max_workers == 0 {
            reasons.push("at least one worker is required".to_string());
        }

        ValidationError::check(reasons)
    }

    /// Solver settings derived from this configuration
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            time_limit: Some(self.solver_time_limit_seconds),
            gap_tolerance: Some(self.optimality_gap),
            verbose: self.verbose,
        }
    }

    /// One scenario per distinct sweep value (ascending), each applying the
    /// same mandatory-day count to every team
    pub fn uniform_scenarios(&self, teams: &TeamRegistry) -> Vec<Scenario> {
        let mut days = if self.mandatory_day_sweep.is_empty() {
            default_sweep()
        } else {
            self.mandatory_day_sweep.clone()
        };
        days.sort_unstable();
        days.dedup();

        days.into_iter()
            .map(|k| Scenario::uniform(format!("{k} mandatory days"), teams, k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Team;

    #[test]
    fn defaults_are_valid() {
        assert!(ModelConfig::default().validate().is_ok());
    }

    #[test]
    fn construction_rejects_out_of_range_values() {
        let err = ModelConfig::default()
            .with_distance_weight(-1.0)
            .with_time_limit(0.0)
            .with_optimality_gap(1.0)
            .with_max_workers(0)
            .validated()
            .unwrap_err();
        assert_eq!(err.reasons.len(), 4);
    }

    #[test]
    fn sweep_is_sorted_and_deduplicated() {
        let teams = TeamRegistry::new(vec![Team::new("a", 2), Team::new("b", 1)]);
        let scenarios = ModelConfig::default()
            .with_sweep(vec![3, 1, 3, 2])
            .uniform_scenarios(&teams);

        let ks: Vec<_> = scenarios.iter().map(|s| s.days_for("a")).collect();
        assert_eq!(ks, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(scenarios[0].name, "1 mandatory days");
        assert_eq!(scenarios[2].days_for("b"), Some(3));
    }

    #[test]
    fn empty_sweep_falls_back_to_two_days() {
        let teams = TeamRegistry::new(vec![Team::new("a", 2)]);
        let scenarios = ModelConfig::default()
            .with_sweep(Vec::new())
            .uniform_scenarios(&teams);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].days_for("a"), Some(2));
    }

    #[test]
    fn solver_config_carries_limits() {
        let config = ModelConfig::default()
            .with_time_limit(5.0)
            .with_optimality_gap(0.01)
            .solver_config();
        assert_eq!(config.time_limit, Some(5.0));
        assert_eq!(config.gap_tolerance, Some(0.01));
    }
}
