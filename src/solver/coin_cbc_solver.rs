use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus},
};
use good_lp::{
    solvers::coin_cbc, variable, variables, Expression, ResolutionError,
    Solution as GoodLpSolutionTrait, SolverModel, Variable as GoodLpVariable,
};
use std::time::Instant;
use tracing::debug;

/// COIN-OR CBC through `good_lp`. Reports primal values only.
pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        // Validate first
        self.validate(problem)?;

        let start_time = Instant::now();

        // Build variables using good_lp
        let mut vars = variables!();
        let mut lp_variables: Vec<GoodLpVariable> = Vec::with_capacity(problem.variables.len());

        for var_def in problem.variables.iter() {
            let lower = var_def.lower_bound;
            let upper = var_def.upper();

            let var = if var_def.is_integer() {
                vars.add(variable().integer().min(lower).max(upper))
            } else {
                vars.add(variable().min(lower).max(upper))
            };
            lp_variables.push(var);
        }

        // good_lp minimises, so negate for maximization
        let is_maximize = problem.objective.optimization_type == OptimizationType::Maximize;
        let mut obj_expr: Expression = 0.into();

        for (i, &coeff) in problem.objective.coefficients.iter().enumerate() {
            if coeff != 0.0 {
                let c = if is_maximize { -coeff } else { coeff };
                obj_expr += c * lp_variables[i];
            }
        }

        let mut lp_model = vars.minimise(obj_expr).using(coin_cbc::coin_cbc);
        if !problem.solver_config.verbose {
            lp_model.set_parameter("log", "0");
        }
        if let Some(limit) = problem.solver_config.time_limit {
            lp_model.set_parameter("sec", &limit.to_string());
        }
        if let Some(gap) = problem.solver_config.gap_tolerance {
            lp_model.set_parameter("ratioGap", &gap.to_string());
        }

        for constraint in &problem.constraints {
            let mut lhs: Expression = 0.into();
            for &(i, coeff) in &constraint.terms {
                if coeff != 0.0 {
                    lhs += coeff * lp_variables[i];
                }
            }

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    lp_model = lp_model.with(lhs.leq(constraint.bound));
                }
                ConstraintType::Equal => {
                    lp_model = lp_model.with(lhs.eq(constraint.bound));
                }
                ConstraintType::GreaterThanOrEqual => {
                    lp_model = lp_model.with(lhs.geq(constraint.bound));
                }
            }
        }

        let solution_result = lp_model.solve();
        let solve_time = start_time.elapsed().as_secs_f64() * 1000.0;
        let statistics = SolverStatistics::for_problem(problem, solve_time);
        debug!(problem = %problem.name, solve_time_ms = solve_time, "CBC finished");

        match solution_result {
            Ok(sol) => {
                let variable_values: Vec<f64> =
                    lp_variables.iter().map(|&var| sol.value(var)).collect();
                let quality = problem.assess(&variable_values);
                let objective = problem.objective.evaluate(&variable_values);
                let raw = sol.model();

                if raw.is_proven_optimal() {
                    let mut solution = DomainSolution::optimal(objective, variable_values);
                    solution.statistics = statistics;
                    solution.quality = quality;
                    solution.message = format!("Optimal solution found for '{}'", problem.name);
                    return Ok(solution);
                }

                let status = if raw.is_seconds_limit_reached() {
                    DomainSolutionStatus::TimeLimit
                } else {
                    DomainSolutionStatus::Feasible
                };
                let mut solution =
                    DomainSolution::new(status, format!("Stopped early on '{}'", problem.name));
                if quality.is_acceptable() {
                    solution.optimal_value = Some(objective);
                    solution.variable_values = variable_values;
                }
                solution.statistics = statistics;
                solution.quality = quality;
                Ok(solution)
            }
            Err(ResolutionError::Infeasible) => Ok(DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            Err(ResolutionError::Unbounded) => Ok(DomainSolution::new(
                DomainSolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            )
            .with_statistics(statistics)),
            Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
        }
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}
