// Reads a solved allocation model back into domain terms.
//
// Decision values become an [`AllocationSolution`]. Sensitivity comes from the
// fixed relaxation: every integer column is pinned at its rounded value and the
// LP is re-solved so the backend can report row duals and reduced costs.

use crate::application::model_builder::{ScenarioModel, VariableKey};
use crate::domain::{
    AllocationSolution, ConstraintType, Day, DeskSplit, DeskUsage, EntityKind, OptimizationProblem,
    ScenarioStatus, SeatAssignment, SensitivityRecord, Solution, SolverError, SolverService,
    ValidityRange, Variable, FEASIBILITY_TOLERANCE,
};
use tracing::debug;

/// Reduced costs below this magnitude are treated as zero
const DUAL_TOLERANCE: f64 = 1e-9;

pub struct SensitivityExtractor<'a> {
    model: &'a ScenarioModel,
}

impl<'a> SensitivityExtractor<'a> {
    pub fn new(model: &'a ScenarioModel) -> Self {
        Self { model }
    }

    /// Decision values of `solution` as assignments, desk usage, presence and splits
    pub fn allocation(&self, status: ScenarioStatus, solution: &Solution) -> AllocationSolution {
        let model = self.model;
        let mut allocation = AllocationSolution::empty(status);
        allocation.objective_value = solution.optimal_value;
        allocation.gap = solution.gap;

        for team in &model.team_ids {
            allocation.presence.insert(team.clone(), Vec::new());
        }
        for desk in &model.desk_ids {
            allocation.desk_occupancy.insert(
                desk.clone(),
                Day::ALL.iter().map(|&d| (d, 0)).collect(),
            );
        }

        let values = &solution.variable_values;
        for (col, key) in model.variables.iter().enumerate() {
            if !is_set(values.get(col).copied()) {
                continue;
            }
            match *key {
                VariableKey::Seat { team, position, day } => {
                    let pos = model.positions[position];
                    let desk = &model.desk_ids[pos.desk];
                    allocation.assignments.push(SeatAssignment {
                        team: model.team_ids[team].clone(),
                        desk: desk.clone(),
                        slot: pos.slot,
                        day,
                    });
                    *allocation.daily_occupancy.entry(day).or_insert(0) += 1;
                    if let Some(per_day) = allocation.desk_occupancy.get_mut(desk) {
                        *per_day.entry(day).or_insert(0) += 1;
                    }
                }
                VariableKey::DeskUse { team, desk, day } => {
                    allocation.desk_usage.push(DeskUsage {
                        team: model.team_ids[team].clone(),
                        desk: model.desk_ids[desk].clone(),
                        day,
                    });
                }
                VariableKey::DeskPair {
                    team,
                    desk_a,
                    desk_b,
                    day,
                } => {
                    let distance = model.distances[desk_a][desk_b];
                    allocation.fragmentation_penalty += distance;
                    allocation.splits.push(DeskSplit {
                        team: model.team_ids[team].clone(),
                        desk_a: model.desk_ids[desk_a].clone(),
                        desk_b: model.desk_ids[desk_b].clone(),
                        day,
                        distance,
                    });
                }
                VariableKey::Presence { team, day } => {
                    allocation
                        .presence
                        .entry(model.team_ids[team].clone())
                        .or_default()
                        .push(day);
                }
                VariableKey::Together { .. } => {}
            }
        }

        allocation
    }

    /// Sensitivity records around the incumbent `values`.
    ///
    /// Fails with [`SolverError::SolverNotAvailable`] when the backend reports no duals.
    pub fn sensitivity(
        &self,
        solver: &dyn SolverService,
        values: &[f64],
    ) -> Result<Vec<SensitivityRecord>, SolverError> {
        if !solver.supports_duals() {
            return Err(SolverError::SolverNotAvailable(format!(
                "{} does not report dual values",
                solver.name()
            )));
        }

        let lp = self.model.problem.fixed_relaxation(values);
        let lp_solution = solver.solve(&lp)?;
        if !lp_solution.is_optimal() || !lp_solution.has_duals() {
            return Err(SolverError::ExecutionFailed(format!(
                "fixed relaxation of '{}' returned no duals ({})",
                self.model.problem.name, lp_solution.status
            )));
        }

        let records = self.records(&lp, &lp_solution);
        debug!(
            problem = %self.model.problem.name,
            records = records.len(),
            "extracted sensitivity"
        );
        Ok(records)
    }

    fn records(&self, lp: &OptimizationProblem, lp_solution: &Solution) -> Vec<SensitivityRecord> {
        let model = self.model;
        let values = &lp_solution.variable_values;
        let coefficients = &model.problem.objective.coefficients;
        let mut records = Vec::with_capacity(model.num_variables());

        // bounds of the original model decide whether a column is basic
        for (col, (key, var)) in model
            .variables
            .iter()
            .zip(&model.problem.variables)
            .enumerate()
        {
            let value = values.get(col).copied().unwrap_or(0.0);
            let cost = coefficients.get(col).copied().unwrap_or(0.0);
            let raw = lp_solution.reduced_costs.get(col).copied().unwrap_or(0.0);
            let (reduced_cost, validity_range) = variable_range(var, value, cost, raw);

            records.push(SensitivityRecord {
                kind: EntityKind::Variable,
                family: key.family().to_string(),
                identifier: var.name.clone(),
                value,
                reduced_cost: Some(reduced_cost),
                shadow_price: None,
                slack: None,
                validity_range,
            });
        }

        for (row, (key, constraint)) in model.constraints.iter().zip(&lp.constraints).enumerate() {
            let family = key.family();
            if !family.is_planning_lever() {
                continue;
            }
            let activity = constraint.activity(values);
            let validity_range = match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => ValidityRange::new(activity, f64::INFINITY),
                ConstraintType::GreaterThanOrEqual => {
                    ValidityRange::new(f64::NEG_INFINITY, activity)
                }
                ConstraintType::Equal => ValidityRange::new(activity, activity),
            };

            records.push(SensitivityRecord {
                kind: EntityKind::Constraint,
                family: family.to_string(),
                identifier: constraint.name.clone(),
                value: activity,
                reduced_cost: None,
                shadow_price: Some(lp_solution.dual_values.get(row).copied().unwrap_or(0.0)),
                slack: Some(constraint.slack(values)),
                validity_range,
            });
        }

        records
    }
}

fn is_set(value: Option<f64>) -> bool {
    value.is_some_and(|v| v > 0.5)
}

/// Reduced cost to report and the objective-coefficient range that keeps the column where it is
fn variable_range(var: &Variable, value: f64, cost: f64, reduced_cost: f64) -> (f64, ValidityRange) {
    let magnitude = reduced_cost.abs();
    let at_lower = (value - var.lower_bound).abs() <= FEASIBILITY_TOLERANCE;
    let at_upper = (value - var.upper()).abs() <= FEASIBILITY_TOLERANCE;

    if magnitude <= DUAL_TOLERANCE || !(at_lower || at_upper) {
        return (0.0, ValidityRange::new(cost, cost));
    }
    if at_upper {
        (reduced_cost, ValidityRange::new(cost - magnitude, f64::INFINITY))
    } else {
        (reduced_cost, ValidityRange::new(f64::NEG_INFINITY, cost + magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::model_builder::ModelBuilder;
    use crate::domain::{
        ConstraintFamily, Desk, DistancePair, Layout, ModelConfig, Scenario, Team,
        TeamRegistry,
    };

    fn model() -> ScenarioModel {
        let layout = Layout::new(
            vec![Desk::new("d1", 2), Desk::new("d2", 2)],
            vec![DistancePair::new("d1", "d2", 5.0)],
        );
        let teams = TeamRegistry::new(vec![Team::new("A", 3)]);
        let config = ModelConfig::default().with_distance_weight(1.0);
        ModelBuilder::new(&layout, &teams, &config)
            .build(&Scenario::new("s").with_days("A", 1))
            .unwrap()
    }

    /// A seated on Monday across both desks: seats d1#1, d1#2, d2#1
    fn monday_split(model: &ScenarioModel) -> Vec<f64> {
        let mut values = vec![0.0; model.num_variables()];
        for key in [
            VariableKey::Seat { team: 0, position: 0, day: Day::Monday },
            VariableKey::Seat { team: 0, position: 1, day: Day::Monday },
            VariableKey::Seat { team: 0, position: 2, day: Day::Monday },
            VariableKey::DeskUse { team: 0, desk: 0, day: Day::Monday },
            VariableKey::DeskUse { team: 0, desk: 1, day: Day::Monday },
            VariableKey::DeskPair { team: 0, desk_a: 0, desk_b: 1, day: Day::Monday },
            VariableKey::Presence { team: 0, day: Day::Monday },
        ] {
            values[model.column(&key).unwrap()] = 1.0;
        }
        values
    }

    #[test]
    fn allocation_reads_back_decisions() {
        let model = model();
        let values = monday_split(&model);
        let solution = Solution::optimal(-2.0, values);

        let allocation =
            SensitivityExtractor::new(&model).allocation(ScenarioStatus::Solved, &solution);

        assert_eq!(allocation.assignments.len(), 3);
        assert!(allocation.is_assigned("A", "d2", 1, Day::Monday));
        assert_eq!(allocation.days_present("A"), &[Day::Monday]);
        assert_eq!(allocation.daily_occupancy[&Day::Monday], 3);
        assert_eq!(allocation.daily_occupancy[&Day::Tuesday], 0);
        assert_eq!(allocation.desk_occupancy["d1"][&Day::Monday], 2);
        assert_eq!(allocation.desk_occupancy["d2"][&Day::Monday], 1);
        assert_eq!(allocation.splits.len(), 1);
        assert_eq!(allocation.fragmentation_penalty, 5.0);
        assert_eq!(allocation.objective_value, Some(-2.0));
    }

    #[test]
    fn sensitivity_covers_variables_and_planning_families() {
        let model = model();
        let values = monday_split(&model);
        let solver = crate::solver::HighsSolver::new();

        let records = SensitivityExtractor::new(&model)
            .sensitivity(&solver, &values)
            .unwrap();

        let variables = records
            .iter()
            .filter(|r| r.kind == EntityKind::Variable)
            .count();
        assert_eq!(variables, model.num_variables());

        let counts = model.family_counts();
        let expected_rows: usize = counts
            .iter()
            .filter(|(family, _)| family.is_planning_lever())
            .map(|(_, n)| n)
            .sum();
        let constraints: Vec<_> = records
            .iter()
            .filter(|r| r.kind == EntityKind::Constraint)
            .collect();
        assert_eq!(constraints.len(), expected_rows);
        assert!(constraints
            .iter()
            .all(|r| r.family != ConstraintFamily::Fragmentation.to_string()));

        let mandatory = constraints
            .iter()
            .find(|r| r.identifier == "mandatory_days[A]")
            .unwrap();
        assert_eq!(mandatory.value, 1.0);
        assert_eq!(mandatory.slack, Some(0.0));
        assert!(mandatory.validity_range.contains(1.0));
    }

    #[test]
    fn basic_columns_report_zero_reduced_cost() {
        let var = Variable::continuous("v").with_bounds(0.0, Some(4.0));
        let (rc, range) = variable_range(&var, 2.0, 3.0, 0.7);
        assert_eq!(rc, 0.0);
        assert_eq!(range, ValidityRange::new(3.0, 3.0));

        let (rc, range) = variable_range(&var, 4.0, 3.0, 0.7);
        assert_eq!(rc, 0.7);
        assert!((range.lower - 2.3).abs() < 1e-12);
        assert!(range.upper.is_infinite());
    }
}
