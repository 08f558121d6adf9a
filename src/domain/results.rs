// Output structures handed to the presentation layer.

use super::scenario::Scenario;
use super::value_objects::{ConstraintFamily, Day, ScenarioStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub team: String,
    pub desk: String,
    pub slot: u32,
    pub day: Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskUsage {
    pub team: String,
    pub desk: String,
    pub day: Day,
}

/// A team spread over two desks on the same day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskSplit {
    pub team: String,
    pub desk_a: String,
    pub desk_b: String,
    pub day: Day,
    pub distance: f64,
}

/// Decision values of one scenario, in readable form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSolution {
    pub status: ScenarioStatus,
    pub objective_value: Option<f64>,
    /// Relative optimality gap reported by the solver
    pub gap: Option<f64>,
    /// Occupied seats only; every other (team, seat, day) is unoccupied
    pub assignments: Vec<SeatAssignment>,
    pub desk_usage: Vec<DeskUsage>,
    /// Days each team is in the office
    pub presence: BTreeMap<String, Vec<Day>>,
    pub splits: Vec<DeskSplit>,
    pub daily_occupancy: BTreeMap<Day, u32>,
    /// Occupied seats per desk and day
    pub desk_occupancy: BTreeMap<String, BTreeMap<Day, u32>>,
    /// Sum of distance over split desk pairs
    pub fragmentation_penalty: f64,
}

impl AllocationSolution {
    /// A result without an assignment (infeasible, failed, rejected, cancelled)
    pub fn empty(status: ScenarioStatus) -> Self {
        Self {
            status,
            objective_value: None,
            gap: None,
            assignments: Vec::new(),
            desk_usage: Vec::new(),
            presence: BTreeMap::new(),
            splits: Vec::new(),
            daily_occupancy: Day::ALL.iter().map(|&d| (d, 0)).collect(),
            desk_occupancy: BTreeMap::new(),
            fragmentation_penalty: 0.0,
        }
    }

    pub fn is_assigned(&self, team: &str, desk: &str, slot: u32, day: Day) -> bool {
        self.assignments
            .iter()
            .any(|a| a.team == team && a.desk == desk && a.slot == slot && a.day == day)
    }

    pub fn days_present(&self, team: &str) -> &[Day] {
        self.presence.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn seats_taken(&self, team: &str, day: Day) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.team == team && a.day == day)
            .count()
    }

    pub fn uses_desk(&self, team: &str, desk: &str, day: Day) -> bool {
        self.desk_usage
            .iter()
            .any(|u| u.team == team && u.desk == desk && u.day == day)
    }

    /// Seat-days occupied over the week
    pub fn total_occupancy(&self) -> u32 {
        self.daily_occupancy.values().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Variable,
    Constraint,
}

/// Interval over which a sensitivity figure stays valid.
/// An unbounded end is written as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidityRange {
    #[serde(with = "unbounded_below")]
    pub lower: f64,
    #[serde(with = "unbounded_above")]
    pub upper: f64,
}

// JSON has no infinity; both ends map non-finite values to null and back

mod unbounded_below {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_bound(*value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

mod unbounded_above {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_bound(*value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

fn serialize_bound<S: serde::Serializer>(value: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(&value)
    } else {
        serializer.serialize_none()
    }
}

impl ValidityRange {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRecord {
    pub kind: EntityKind,
    /// Variable or constraint family label
    pub family: String,
    pub identifier: String,
    /// Variable value, or row activity for constraints
    pub value: f64,
    pub reduced_cost: Option<f64>,
    pub shadow_price: Option<f64>,
    pub slack: Option<f64>,
    /// Objective-coefficient range for variables, right-hand-side range for constraints
    pub validity_range: ValidityRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxationOutcome {
    RestoresFeasibility,
    StillInfeasible,
    /// The re-test hit the time limit or failed
    Inconclusive,
}

/// One entry of the ranked infeasibility diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfeasibilityCause {
    pub families: Vec<ConstraintFamily>,
    pub outcome: RelaxationOutcome,
    pub detail: String,
}

/// What the orchestrator hands to the aggregator for one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    /// Position of the scenario in the sweep input
    pub index: usize,
    pub scenario: Scenario,
    pub solution: AllocationSolution,
    pub sensitivity: Vec<SensitivityRecord>,
    pub diagnosis: Vec<InfeasibilityCause>,
    /// Validation reasons, solver error, or timeout warning
    pub message: Option<String>,
    pub solve_time_ms: f64,
}

impl ScenarioOutcome {
    pub fn new(index: usize, scenario: Scenario, solution: AllocationSolution) -> Self {
        Self {
            index,
            scenario,
            solution,
            sensitivity: Vec::new(),
            diagnosis: Vec::new(),
            message: None,
            solve_time_ms: 0.0,
        }
    }

    /// Outcome without an assignment (rejected, cancelled, failed or infeasible)
    pub fn unsolved(
        index: usize,
        scenario: Scenario,
        status: ScenarioStatus,
        message: impl Into<String>,
    ) -> Self {
        Self::new(index, scenario, AllocationSolution::empty(status)).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> ScenarioStatus {
        self.solution.status
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    /// Seat-days occupied over the week
    pub total_occupancy: u32,
    /// `total_occupancy / (days · total capacity)`
    pub weekly_occupancy_rate: f64,
    pub free_seat_rate: f64,
    pub fragmentation_penalty: f64,
    /// Fragmentation penalty per present team-day
    pub average_fragmentation_penalty: f64,
    pub solve_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub index: usize,
    pub scenario: Scenario,
    pub status: ScenarioStatus,
    pub solution: AllocationSolution,
    pub sensitivity: Vec<SensitivityRecord>,
    pub diagnosis: Vec<InfeasibilityCause>,
    pub message: Option<String>,
    pub summary: ScenarioSummary,
}

/// Every scenario of a sweep, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub results: Vec<ScenarioResult>,
}

impl SweepReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Scenario with the highest objective among those with an assignment
    pub fn best(&self) -> Option<&ScenarioResult> {
        self.results
            .iter()
            .filter(|r| r.status.has_assignment())
            .filter_map(|r| r.solution.objective_value.map(|v| (r, v)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, _)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_solution_has_zero_occupancy_every_day() {
        let solution = AllocationSolution::empty(ScenarioStatus::Infeasible);
        assert_eq!(solution.daily_occupancy.len(), Day::COUNT);
        assert_eq!(solution.total_occupancy(), 0);
        assert!(solution.days_present("anyone").is_empty());
    }

    #[test]
    fn assignment_lookups() {
        let mut solution = AllocationSolution::empty(ScenarioStatus::Solved);
        solution.assignments.push(SeatAssignment {
            team: "a".into(),
            desk: "d1".into(),
            slot: 2,
            day: Day::Tuesday,
        });
        assert!(solution.is_assigned("a", "d1", 2, Day::Tuesday));
        assert!(!solution.is_assigned("a", "d1", 1, Day::Tuesday));
        assert_eq!(solution.seats_taken("a", Day::Tuesday), 1);
    }

    #[test]
    fn validity_range_is_inclusive() {
        let range = ValidityRange::new(1.0, f64::INFINITY);
        assert!(range.contains(1.0));
        assert!(range.contains(1e9));
        assert!(!range.contains(0.5));
    }

    #[test]
    fn unbounded_range_ends_survive_json() {
        let ranges = [
            ValidityRange::new(3.0, f64::INFINITY),
            ValidityRange::new(f64::NEG_INFINITY, 2.5),
            ValidityRange::new(1.0, 1.0),
        ];
        let json = serde_json::to_string(&ranges).unwrap();
        assert_eq!(
            json,
            r#"[{"lower":3.0,"upper":null},{"lower":null,"upper":2.5},{"lower":1.0,"upper":1.0}]"#
        );

        let back: Vec<ValidityRange> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ranges);
    }
}
