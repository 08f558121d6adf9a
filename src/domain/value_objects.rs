// Domain value objects shared by the solver layer and the desk planning model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of decision variable in the optimization problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

/// Type of constraint comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationType {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Raw status reported by a solver backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Found optimal solution (or within the configured gap)
    Optimal,
    /// Found feasible solution (may not be optimal)
    Feasible,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// Time limit reached; `variable_values` holds the incumbent if one exists
    TimeLimit,
    /// Solver error occurred
    Error,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Feasible => write!(f, "Feasible"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::TimeLimit => write!(f, "Time Limit Reached"),
            SolutionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Automatically select best solver
    #[default]
    Auto,
    /// COIN-OR CBC solver
    CoinCbc,
    /// HiGHS solver
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}

/// A working day of the office week
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    /// The working week, in order.
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "Mon",
            Day::Tuesday => "Tue",
            Day::Wednesday => "Wed",
            Day::Thursday => "Thu",
            Day::Friday => "Fri",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Which terms the objective carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Weighted seat occupancy only
    OccupancyOnly,
    /// Occupancy minus the distance-weighted fragmentation penalty
    #[default]
    OccupancyMinusFragmentation,
    /// Occupancy minus fragmentation plus a bonus for synergizing teams sharing a day
    OccupancyPlusSynergy,
}

impl ObjectiveMode {
    pub fn penalizes_fragmentation(self) -> bool {
        !matches!(self, ObjectiveMode::OccupancyOnly)
    }

    pub fn rewards_synergy(self) -> bool {
        matches!(self, ObjectiveMode::OccupancyPlusSynergy)
    }
}

impl fmt::Display for ObjectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveMode::OccupancyOnly => write!(f, "occupancy_only"),
            ObjectiveMode::OccupancyMinusFragmentation => write!(f, "occupancy_minus_fragmentation"),
            ObjectiveMode::OccupancyPlusSynergy => write!(f, "occupancy_plus_synergy"),
        }
    }
}

/// Constraint families of the allocation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintFamily {
    /// At most one occupant per position and day
    SeatCapacity,
    /// A seat at a desk implies the team uses that desk
    DeskLinkage,
    /// Team occupancy of a desk is capped by the desk size
    DeskSaturation,
    /// AND-linearization of desk usage pairs
    Fragmentation,
    /// A team is either fully seated or absent
    WholeTeamPresence,
    /// Number of in-office days per team
    MandatoryDays,
    /// Seats kept free every day
    DailySlackFloor,
    /// AND-linearization of synergizing teams' presence
    SynergyLink,
}

impl ConstraintFamily {
    /// Families that translate into a planning decision and are reported in sensitivity output.
    pub fn is_planning_lever(self) -> bool {
        matches!(
            self,
            ConstraintFamily::SeatCapacity
                | ConstraintFamily::WholeTeamPresence
                | ConstraintFamily::MandatoryDays
                | ConstraintFamily::DailySlackFloor
        )
    }
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::SeatCapacity => "seat capacity",
            ConstraintFamily::DeskLinkage => "desk linkage",
            ConstraintFamily::DeskSaturation => "desk saturation",
            ConstraintFamily::Fragmentation => "fragmentation",
            ConstraintFamily::WholeTeamPresence => "whole-team presence",
            ConstraintFamily::MandatoryDays => "mandatory days",
            ConstraintFamily::DailySlackFloor => "daily slack floor",
            ConstraintFamily::SynergyLink => "synergy link",
        };
        f.write_str(name)
    }
}

/// Decision variable families of the allocation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableFamily {
    /// x[t,p,d]: team occupies a position on a day
    Seat,
    /// y[t,m,d]: team uses at least one position of a desk
    DeskUse,
    /// z[t,m1,m2,d]: team uses both desks of a pair
    DeskPair,
    /// pres[t,d]: team is in the office
    Presence,
    /// together[a,b,d]: two synergizing teams share the day
    Together,
}

impl fmt::Display for VariableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableFamily::Seat => "seat",
            VariableFamily::DeskUse => "desk use",
            VariableFamily::DeskPair => "desk pair",
            VariableFamily::Presence => "presence",
            VariableFamily::Together => "together",
        };
        f.write_str(name)
    }
}

/// Final classification of one scenario of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Optimal or within the optimality gap
    Solved,
    /// Time limit hit; the best incumbent is reported with its gap
    TimedOut,
    /// Proven to have no feasible assignment
    Infeasible,
    /// The solver itself failed
    Failed,
    /// Scenario parameters were rejected before solving
    Rejected,
    /// Cancelled before the solver was invoked
    Cancelled,
}

impl ScenarioStatus {
    pub fn has_assignment(self) -> bool {
        matches!(self, ScenarioStatus::Solved | ScenarioStatus::TimedOut)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Solved => write!(f, "Solved"),
            ScenarioStatus::TimedOut => write!(f, "Timed Out"),
            ScenarioStatus::Infeasible => write!(f, "Infeasible"),
            ScenarioStatus::Failed => write!(f, "Failed"),
            ScenarioStatus::Rejected => write!(f, "Rejected"),
            ScenarioStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_are_ordered_and_indexed() {
        for (i, day) in Day::ALL.iter().enumerate() {
            assert_eq!(day.index(), i);
        }
        assert!(Day::Monday < Day::Friday);
    }

    #[test]
    fn only_planning_families_are_levers() {
        let levers: Vec<_> = [
            ConstraintFamily::SeatCapacity,
            ConstraintFamily::DeskLinkage,
            ConstraintFamily::DeskSaturation,
            ConstraintFamily::Fragmentation,
            ConstraintFamily::WholeTeamPresence,
            ConstraintFamily::MandatoryDays,
            ConstraintFamily::DailySlackFloor,
            ConstraintFamily::SynergyLink,
        ]
        .into_iter()
        .filter(|f| f.is_planning_lever())
        .collect();

        assert_eq!(
            levers,
            vec![
                ConstraintFamily::SeatCapacity,
                ConstraintFamily::WholeTeamPresence,
                ConstraintFamily::MandatoryDays,
                ConstraintFamily::DailySlackFloor,
            ]
        );
    }

    #[test]
    fn objective_modes_gate_terms() {
        assert!(!ObjectiveMode::OccupancyOnly.penalizes_fragmentation());
        assert!(ObjectiveMode::OccupancyMinusFragmentation.penalizes_fragmentation());
        assert!(!ObjectiveMode::OccupancyMinusFragmentation.rewards_synergy());
        assert!(ObjectiveMode::OccupancyPlusSynergy.rewards_synergy());
    }
}
