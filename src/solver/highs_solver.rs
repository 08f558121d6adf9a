// HiGHS Solver Adapter
// Translates the domain problem into a HiGHS row problem and maps the outcome back

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus},
};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::time::Instant;
use tracing::{debug, warn};

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Best objective bound implied by a relative gap around the incumbent
fn bound_from_gap(objective: f64, gap: f64, sense: OptimizationType) -> f64 {
    let spread = gap * objective.abs();
    match sense {
        OptimizationType::Maximize => objective + spread,
        OptimizationType::Minimize => objective - spread,
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        // Validate first
        self.validate(problem)?;

        let start_time = Instant::now();
        let is_mip = problem.is_mixed_integer();

        // Use HiGHS RowProblem (add variables first, then constraints)
        let mut pb = RowProblem::default();
        let mut cols = Vec::with_capacity(problem.variables.len());

        for (i, var_def) in problem.variables.iter().enumerate() {
            let lower = var_def.lower_bound;
            let upper = var_def.upper();
            let obj_coeff = problem.objective.coefficients.get(i).copied().unwrap_or(0.0);

            let col = if var_def.is_integer() {
                pb.add_integer_column(obj_coeff, lower..=upper)
            } else {
                pb.add_column(obj_coeff, lower..=upper)
            };
            cols.push(col);
        }

        for constraint in &problem.constraints {
            let terms: Vec<_> = constraint
                .terms
                .iter()
                .filter(|&&(_, coeff)| coeff != 0.0)
                .map(|&(i, coeff)| (cols[i], coeff))
                .collect();

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    pb.add_row(..=constraint.bound, &terms);
                }
                ConstraintType::Equal => {
                    pb.add_row(constraint.bound..=constraint.bound, &terms);
                }
                ConstraintType::GreaterThanOrEqual => {
                    pb.add_row(constraint.bound.., &terms);
                }
            }
        }

        let sense = match problem.objective.optimization_type {
            OptimizationType::Maximize => Sense::Maximise,
            OptimizationType::Minimize => Sense::Minimise,
        };

        let mut model = pb.optimise(sense);
        if !problem.solver_config.verbose {
            model.make_quiet();
        }
        if let Some(limit) = problem.solver_config.time_limit {
            model.set_option("time_limit", limit);
        }
        if let Some(gap) = problem.solver_config.gap_tolerance {
            if is_mip {
                model.set_option("mip_rel_gap", gap);
            }
        }

        let solved = model.try_solve().map_err(|status| {
            SolverError::ExecutionFailed(format!("HiGHS could not run: {:?}", status))
        })?;
        let solve_time = start_time.elapsed().as_secs_f64() * 1000.0;
        let statistics = SolverStatistics::for_problem(problem, solve_time);

        let status = solved.status();
        debug!(problem = %problem.name, ?status, solve_time_ms = solve_time, "HiGHS finished");

        match status {
            HighsModelStatus::Optimal => {
                let solution_data = solved.get_solution();
                let variable_values = solution_data.columns().to_vec();
                let objective = problem.objective.evaluate(&variable_values);
                let quality = problem.assess(&variable_values);

                let mut solution = DomainSolution::optimal(objective, variable_values);
                if is_mip {
                    let gap = solved.mip_gap();
                    let gap = if gap.is_finite() { gap.max(0.0) } else { 0.0 };
                    solution.gap = Some(gap);
                    solution.best_bound = Some(bound_from_gap(
                        objective,
                        gap,
                        problem.objective.optimization_type,
                    ));
                } else {
                    // duals only mean something for a pure LP
                    solution.dual_values = solution_data.dual_rows().to_vec();
                    solution.reduced_costs = solution_data.dual_columns().to_vec();
                }
                solution.statistics = statistics;
                solution.quality = quality;
                solution.message = format!("Optimal solution found for '{}'", problem.name);

                Ok(solution)
            }
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                let variable_values = solved.get_solution().columns().to_vec();
                let quality = problem.assess(&variable_values);
                let mut solution = DomainSolution::new(
                    DomainSolutionStatus::TimeLimit,
                    format!("Time limit reached for '{}'", problem.name),
                );

                if quality.is_acceptable() {
                    let objective = problem.objective.evaluate(&variable_values);
                    let gap = solved.mip_gap();
                    let gap = gap.is_finite().then_some(gap.max(0.0));
                    solution.optimal_value = Some(objective);
                    solution.gap = gap;
                    solution.best_bound = gap.map(|g| {
                        bound_from_gap(objective, g, problem.objective.optimization_type)
                    });
                    solution.variable_values = variable_values;
                } else {
                    warn!(problem = %problem.name, "time limit reached without a feasible incumbent");
                    solution.message = format!(
                        "Time limit reached for '{}' without a feasible solution",
                        problem.name
                    );
                }
                solution.quality = quality;
                solution.statistics = statistics;
                Ok(solution)
            }
            HighsModelStatus::Infeasible => Ok(DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            HighsModelStatus::UnboundedOrInfeasible if problem.is_bounded() => {
                // every column is boxed, so the problem cannot be unbounded
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Infeasible,
                    "Problem is infeasible: no solution satisfies all constraints",
                )
                .with_statistics(statistics))
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Unbounded,
                    "Problem is unbounded: objective can be improved infinitely",
                )
                .with_statistics(statistics))
            }
            HighsModelStatus::ModelEmpty => {
                Ok(DomainSolution::optimal(0.0, Vec::new()).with_statistics(statistics))
            }
            status => Err(SolverError::ExecutionFailed(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_mip(&self) -> bool {
        true
    }

    fn supports_duals(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraint, ObjectiveFunction, Variable};

    fn knapsack() -> OptimizationProblem {
        // max 150a + 90b + 120c + 100d + 80e  s.t.  7a + 3b + 4c + 5d + 2e <= 15
        let values = vec![150.0, 90.0, 120.0, 100.0, 80.0];
        let weights = [7.0, 3.0, 4.0, 5.0, 2.0];
        OptimizationProblem::new(ObjectiveFunction::new(OptimizationType::Maximize, values))
            .with_name("knapsack")
            .with_variables((0..5).map(|i| Variable::binary(format!("item{i}"))).collect())
            .add_constraint(Constraint::leq(
                weights.iter().copied().enumerate().collect(),
                15.0,
            ))
    }

    #[test]
    fn solves_binary_knapsack() {
        let solution = HighsSolver::new().solve(&knapsack()).unwrap();
        assert!(solution.is_optimal());
        // stove, food, water and camera: 14 kg
        assert!((solution.optimal_value.unwrap() - 390.0).abs() < 1e-6);
        assert!(solution.quality.is_acceptable());
        assert!(!solution.has_duals());
    }

    #[test]
    fn reports_lp_duals() {
        // max x + y  s.t.  x + 2y <= 4,  x <= 2
        let problem = OptimizationProblem::new(ObjectiveFunction::new(
            OptimizationType::Maximize,
            vec![1.0, 1.0],
        ))
        .with_variables(vec![Variable::continuous("x"), Variable::continuous("y")])
        .add_constraint(Constraint::leq(vec![(0, 1.0), (1, 2.0)], 4.0))
        .add_constraint(Constraint::leq(vec![(0, 1.0)], 2.0));

        let solution = HighsSolver::new().solve(&problem).unwrap();
        assert!((solution.optimal_value.unwrap() - 3.0).abs() < 1e-6);
        assert_eq!(solution.dual_values.len(), 2);
        assert_eq!(solution.reduced_costs.len(), 2);
        assert!((solution.dual_values[0].abs() - 0.5).abs() < 1e-6);
        assert!((solution.dual_values[1].abs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn detects_infeasibility() {
        let problem = knapsack().add_constraint(Constraint::geq(
            (0..5).map(|i| (i, 1.0)).collect(),
            6.0,
        ));
        let solution = HighsSolver::new().solve(&problem).unwrap();
        assert_eq!(solution.status, DomainSolutionStatus::Infeasible);
        assert!(solution.variable_values.is_empty());
    }

    #[test]
    fn rejects_invalid_problem() {
        let problem = knapsack().add_constraint(Constraint::leq(vec![(9, 1.0)], 1.0));
        assert!(matches!(
            HighsSolver::new().solve(&problem),
            Err(SolverError::InvalidProblem(_))
        ));
    }

    #[test]
    fn bound_from_gap_follows_sense() {
        assert_eq!(bound_from_gap(100.0, 0.1, OptimizationType::Maximize), 110.0);
        assert_eq!(bound_from_gap(100.0, 0.1, OptimizationType::Minimize), 90.0);
    }
}
