use super::value_objects::{
    ConstraintType, OptimizationType, SolutionStatus, VariableType,
};

/// Tolerance used when checking feasibility of a returned point
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Integer columns this close to a whole number count as integral
pub const INTEGRALITY_TOLERANCE: f64 = 1e-5;

/// Decision variable in an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Continuous,
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: Some(1.0),
            name: name.into(),
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.variable_type,
            VariableType::Integer | VariableType::Binary
        )
    }

    pub fn upper(&self) -> f64 {
        self.upper_bound.unwrap_or(f64::INFINITY)
    }
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveFunction {
    pub optimization_type: OptimizationType,
    /// One coefficient per variable, in variable order
    pub coefficients: Vec<f64>,
}

impl ObjectiveFunction {
    pub fn new(optimization_type: OptimizationType, coefficients: Vec<f64>) -> Self {
        Self {
            optimization_type,
            coefficients,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.coefficients.len()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum()
    }
}

/// Linear constraint over a sparse set of variables
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    /// `(variable index, coefficient)` pairs; absent variables have coefficient zero
    pub terms: Vec<(usize, f64)>,
    pub bound: f64,
    pub name: String,
}

impl Constraint {
    pub fn new(constraint_type: ConstraintType, terms: Vec<(usize, f64)>, bound: f64) -> Self {
        Self {
            constraint_type,
            terms,
            bound,
            name: String::new(),
        }
    }

    pub fn leq(terms: Vec<(usize, f64)>, bound: f64) -> Self {
        Self::new(ConstraintType::LessThanOrEqual, terms, bound)
    }

    pub fn eq(terms: Vec<(usize, f64)>, bound: f64) -> Self {
        Self::new(ConstraintType::Equal, terms, bound)
    }

    pub fn geq(terms: Vec<(usize, f64)>, bound: f64) -> Self {
        Self::new(ConstraintType::GreaterThanOrEqual, terms, bound)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Left-hand side evaluated at `values`
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(i, c)| c * values.get(i).copied().unwrap_or(0.0))
            .sum()
    }

    /// Unused room before the bound is reached; zero for equalities that hold
    pub fn slack(&self, values: &[f64]) -> f64 {
        let activity = self.activity(values);
        match self.constraint_type {
            ConstraintType::LessThanOrEqual | ConstraintType::Equal => self.bound - activity,
            ConstraintType::GreaterThanOrEqual => activity - self.bound,
        }
    }

    /// Amount by which `values` violates this constraint (zero when satisfied)
    pub fn violation(&self, values: &[f64]) -> f64 {
        let activity = self.activity(values);
        match self.constraint_type {
            ConstraintType::LessThanOrEqual => (activity - self.bound).max(0.0),
            ConstraintType::GreaterThanOrEqual => (self.bound - activity).max(0.0),
            ConstraintType::Equal => (activity - self.bound).abs(),
        }
    }
}

/// Configuration for the solver
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Wall-clock limit in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP gap at which the solver may stop
    pub gap_tolerance: Option<f64>,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            gap_tolerance: None,
            verbose: false,
        }
    }
}

/// Complete optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationProblem {
    pub name: String,
    pub objective: ObjectiveFunction,
    pub constraints: Vec<Constraint>,
    pub variables: Vec<Variable>,
    pub solver_config: SolverConfig,
}

impl OptimizationProblem {
    pub fn new(objective: ObjectiveFunction) -> Self {
        Self {
            name: String::new(),
            objective,
            constraints: Vec::new(),
            variables: Vec::new(),
            solver_config: SolverConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn num_variables(&self) -> usize {
        self.objective.num_variables()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.num_integer_variables() > 0
    }

    /// True when every variable has finite bounds, so the problem cannot be unbounded
    pub fn is_bounded(&self) -> bool {
        self.variables
            .iter()
            .all(|v| v.lower_bound.is_finite() && v.upper().is_finite())
    }

    /// Constraint and integrality violations of `values`
    pub fn assess(&self, values: &[f64]) -> SolutionQuality {
        if values.len() != self.variables.len() {
            return SolutionQuality {
                max_constraint_violation: f64::INFINITY,
                max_integrality_violation: f64::INFINITY,
                reliability: 0.0,
            };
        }

        // rows are checked at the snapped point so integrality noise is not
        // multiplied by large coefficients
        let snapped: Vec<f64> = self
            .variables
            .iter()
            .zip(values)
            .map(|(var, &v)| {
                if var.is_integer() && (v - v.round()).abs() <= INTEGRALITY_TOLERANCE {
                    v.round()
                } else {
                    v
                }
            })
            .collect();

        let bound_violation = self
            .variables
            .iter()
            .zip(&snapped)
            .map(|(var, &v)| (var.lower_bound - v).max(0.0).max(v - var.upper()))
            .fold(0.0_f64, f64::max);
        let row_violation = self
            .constraints
            .iter()
            .map(|c| c.violation(&snapped))
            .fold(0.0_f64, f64::max);
        let max_integrality_violation = self
            .variables
            .iter()
            .zip(values)
            .filter(|(var, _)| var.is_integer())
            .map(|(_, &v)| (v - v.round()).abs())
            .fold(0.0_f64, f64::max);

        let max_constraint_violation = bound_violation.max(row_violation);
        let reliability = if max_constraint_violation <= FEASIBILITY_TOLERANCE
            && max_integrality_violation <= INTEGRALITY_TOLERANCE
        {
            1.0
        } else {
            0.0
        };

        SolutionQuality {
            max_constraint_violation,
            max_integrality_violation,
            reliability,
        }
    }

    /// LP obtained by fixing every integer variable at its rounded value in `values`.
    ///
    /// Continuous variables keep their bounds. Solving this LP yields the duals
    /// of the integer solution's fixed relaxation.
    pub fn fixed_relaxation(&self, values: &[f64]) -> OptimizationProblem {
        let variables = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, var)| {
                if var.is_integer() {
                    let fixed = values.get(i).copied().unwrap_or(0.0).round();
                    Variable::continuous(var.name.clone()).with_bounds(fixed, Some(fixed))
                } else {
                    var.clone()
                }
            })
            .collect();

        OptimizationProblem {
            name: format!("{} (fixed relaxation)", self.name),
            objective: self.objective.clone(),
            constraints: self.constraints.clone(),
            variables,
            solver_config: self.solver_config.clone(),
        }
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStatistics {
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_integer_vars: u32,
    pub num_binary_vars: u32,
}

impl SolverStatistics {
    pub fn for_problem(problem: &OptimizationProblem, solve_time_ms: f64) -> Self {
        let count = |t: VariableType| {
            problem
                .variables
                .iter()
                .filter(|v| v.variable_type == t)
                .count() as u32
        };
        Self {
            solve_time_ms,
            num_variables: problem.num_variables() as u32,
            num_constraints: problem.constraints.len() as u32,
            num_integer_vars: count(VariableType::Integer),
            num_binary_vars: count(VariableType::Binary),
        }
    }
}

/// Quality metrics for the solution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolutionQuality {
    pub max_constraint_violation: f64,
    pub max_integrality_violation: f64,
    /// 1.0 when the point is feasible and integral within tolerance
    pub reliability: f64,
}

impl SolutionQuality {
    pub fn is_acceptable(&self) -> bool {
        self.reliability >= 1.0
    }
}

/// Solution to an optimization problem as returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolutionStatus,
    pub optimal_value: Option<f64>,
    pub best_bound: Option<f64>,
    pub gap: Option<f64>,
    pub variable_values: Vec<f64>,
    /// Row duals, one per constraint, when the backend exposes them
    pub dual_values: Vec<f64>,
    /// Column duals, one per variable, when the backend exposes them
    pub reduced_costs: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
    pub quality: SolutionQuality,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            optimal_value: None,
            best_bound: None,
            gap: None,
            variable_values: Vec::new(),
            dual_values: Vec::new(),
            reduced_costs: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
        }
    }

    pub fn optimal(value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            optimal_value: Some(value),
            best_bound: Some(value),
            gap: Some(0.0),
            variable_values,
            dual_values: Vec::new(),
            reduced_costs: Vec::new(),
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_quality(mut self, quality: SolutionQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// A usable primal point is attached (optimal, feasible, or a valid incumbent)
    pub fn has_incumbent(&self) -> bool {
        !self.variable_values.is_empty() && self.quality.is_acceptable()
    }

    pub fn has_duals(&self) -> bool {
        !self.dual_values.is_empty() || !self.reduced_costs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_problem() -> OptimizationProblem {
        // max x0 + 2 x1  s.t.  x0 + x1 <= 1
        OptimizationProblem::new(ObjectiveFunction::new(
            OptimizationType::Maximize,
            vec![1.0, 2.0],
        ))
        .with_variables(vec![Variable::binary("x0"), Variable::binary("x1")])
        .add_constraint(Constraint::leq(vec![(0, 1.0), (1, 1.0)], 1.0).with_name("pick one"))
    }

    #[test]
    fn constraint_activity_and_slack() {
        let c = Constraint::leq(vec![(0, 2.0), (2, 1.0)], 5.0);
        let values = [1.0, 9.0, 2.0];
        assert_eq!(c.activity(&values), 4.0);
        assert_eq!(c.slack(&values), 1.0);
        assert_eq!(c.violation(&values), 0.0);

        let g = Constraint::geq(vec![(1, 1.0)], 10.0);
        assert_eq!(g.slack(&values), -1.0);
        assert_eq!(g.violation(&values), 1.0);
    }

    #[test]
    fn assess_flags_infeasible_and_fractional_points() {
        let problem = tiny_problem();
        assert!(problem.assess(&[0.0, 1.0]).is_acceptable());

        let over = problem.assess(&[1.0, 1.0]);
        assert_eq!(over.max_constraint_violation, 1.0);
        assert!(!over.is_acceptable());

        let fractional = problem.assess(&[0.5, 0.5]);
        assert_eq!(fractional.max_integrality_violation, 0.5);
        assert!(!fractional.is_acceptable());

        assert!(!problem.assess(&[1.0]).is_acceptable());
    }

    #[test]
    fn integrality_noise_is_not_scaled_by_row_coefficients() {
        // a team of five present on the day: 5 * y = x1 + .. + x5
        let mut variables = vec![Variable::binary("y")];
        variables.extend((1..=5).map(|i| Variable::binary(format!("x{i}"))));
        let terms = (1..=5).map(|i| (i, 1.0)).chain([(0, -5.0)]).collect();
        let problem = OptimizationProblem::new(ObjectiveFunction::new(
            OptimizationType::Maximize,
            vec![0.0; 6],
        ))
        .with_variables(variables)
        .add_constraint(Constraint::eq(terms, 0.0));

        let noisy = [1.0 - 9e-7, 1.0, 1.0, 1.0, 1.0, 1.0];
        let quality = problem.assess(&noisy);
        assert_eq!(quality.max_constraint_violation, 0.0);
        assert!(quality.is_acceptable());

        let off = problem.assess(&[0.8, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(off.max_constraint_violation > 0.5);
        assert!(!off.is_acceptable());
    }

    #[test]
    fn fixed_relaxation_pins_integer_columns() {
        let problem = tiny_problem();
        let lp = problem.fixed_relaxation(&[0.0, 0.9999999]);

        assert!(!lp.is_mixed_integer());
        assert_eq!(lp.variables[0].lower_bound, 0.0);
        assert_eq!(lp.variables[0].upper_bound, Some(0.0));
        assert_eq!(lp.variables[1].lower_bound, 1.0);
        assert_eq!(lp.variables[1].upper_bound, Some(1.0));
        assert_eq!(lp.constraints, problem.constraints);
    }

    #[test]
    fn binary_problems_are_bounded() {
        assert!(tiny_problem().is_bounded());
        let open = tiny_problem().with_variables(vec![
            Variable::continuous("x0"),
            Variable::binary("x1"),
        ]);
        assert!(!open.is_bounded());
    }
}
