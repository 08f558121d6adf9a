// Infeasibility diagnosis by relaxation.
//
// The slack floor and the mandatory-day targets are the usual culprits, so each
// is dropped in turn and the remaining model is re-tested for feasibility with a
// zero objective. Only when neither relaxation alone helps are both dropped.

use crate::application::model_builder::ScenarioModel;
use crate::domain::{
    ConstraintFamily, InfeasibilityCause, OptimizationProblem, RelaxationOutcome,
    SolutionStatus, SolverService,
};
use tracing::{debug, warn};

pub struct InfeasibilityDiagnoser<'a> {
    model: &'a ScenarioModel,
    solver: &'a dyn SolverService,
}

impl<'a> InfeasibilityDiagnoser<'a> {
    pub fn new(model: &'a ScenarioModel, solver: &'a dyn SolverService) -> Self {
        Self { model, solver }
    }

    /// Ranked causes: relaxations that restore feasibility first, inconclusive
    /// ones next, those that leave the model infeasible last.
    pub fn diagnose(&self) -> Vec<InfeasibilityCause> {
        let mut causes = vec![
            self.try_relaxing(&[ConstraintFamily::DailySlackFloor]),
            self.try_relaxing(&[ConstraintFamily::MandatoryDays]),
        ];

        if causes
            .iter()
            .all(|c| c.outcome != RelaxationOutcome::RestoresFeasibility)
        {
            causes.push(self.try_relaxing(&[
                ConstraintFamily::DailySlackFloor,
                ConstraintFamily::MandatoryDays,
            ]));
        }

        // stable, so ties keep the relaxation order
        causes.sort_by_key(|c| rank(c.outcome));
        causes
    }

    fn try_relaxing(&self, families: &[ConstraintFamily]) -> InfeasibilityCause {
        let problem = feasibility_problem(self.model.relaxed(families));
        let outcome = match self.solver.solve(&problem) {
            Ok(solution) if solution.has_incumbent() => RelaxationOutcome::RestoresFeasibility,
            Ok(solution) if solution.status == SolutionStatus::Infeasible => {
                RelaxationOutcome::StillInfeasible
            }
            Ok(solution) => {
                debug!(status = %solution.status, "relaxation gave no verdict");
                RelaxationOutcome::Inconclusive
            }
            Err(err) => {
                warn!(problem = %self.model.problem.name, error = %err, "relaxation solve failed");
                RelaxationOutcome::Inconclusive
            }
        };

        InfeasibilityCause {
            families: families.to_vec(),
            outcome,
            detail: self.detail(families, outcome),
        }
    }

    fn detail(&self, families: &[ConstraintFamily], outcome: RelaxationOutcome) -> String {
        let names: Vec<String> = families.iter().map(|f| f.to_string()).collect();
        let verdict = match outcome {
            RelaxationOutcome::RestoresFeasibility => "restores feasibility",
            RelaxationOutcome::StillInfeasible => "leaves the model infeasible",
            RelaxationOutcome::Inconclusive => "was inconclusive",
        };
        let (demand, available) = self.model.weekly_demand();
        format!(
            "relaxing {} {}; mandatory presence needs {} seat-days against {} available over the week (min slack {})",
            names.join(" and "),
            verdict,
            demand,
            available,
            self.model.min_slack
        )
    }
}

fn rank(outcome: RelaxationOutcome) -> u8 {
    match outcome {
        RelaxationOutcome::RestoresFeasibility => 0,
        RelaxationOutcome::Inconclusive => 1,
        RelaxationOutcome::StillInfeasible => 2,
    }
}

fn feasibility_problem(mut problem: OptimizationProblem) -> OptimizationProblem {
    problem.name = format!("{} (feasibility)", problem.name);
    for coefficient in problem.objective.coefficients.iter_mut() {
        *coefficient = 0.0;
    }
    problem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::model_builder::ModelBuilder;
    use crate::domain::{Desk, Layout, ModelConfig, Scenario, Team, TeamRegistry};
    use crate::solver::HighsSolver;

    fn build(min_slack: u32, k: i32) -> ScenarioModel {
        let layout = Layout::new(vec![Desk::new("d1", 2), Desk::new("d2", 2)], vec![]);
        let teams = TeamRegistry::new(vec![Team::new("A", 3), Team::new("B", 2)]);
        let config = ModelConfig::default().with_min_slack(min_slack);
        ModelBuilder::new(&layout, &teams, &config)
            .build(&Scenario::uniform("s", &teams, k))
            .unwrap()
    }

    #[test]
    fn slack_floor_ranks_first_when_it_reserves_every_seat() {
        let model = build(4, 1);
        let solver = HighsSolver::new();
        let causes = InfeasibilityDiagnoser::new(&model, &solver).diagnose();

        assert_eq!(causes.len(), 2);
        assert_eq!(causes[0].families, vec![ConstraintFamily::DailySlackFloor]);
        assert_eq!(causes[0].outcome, RelaxationOutcome::RestoresFeasibility);
        assert!(causes[0].detail.contains("5 seat-days against 0 available"));
    }

    #[test]
    fn overbooked_week_points_at_mandatory_days() {
        // 5 people every day on 4 seats: only dropping the targets helps
        let model = build(0, 5);
        let solver = HighsSolver::new();
        let causes = InfeasibilityDiagnoser::new(&model, &solver).diagnose();

        assert_eq!(causes.len(), 2);
        assert_eq!(causes[0].families, vec![ConstraintFamily::MandatoryDays]);
        assert_eq!(causes[0].outcome, RelaxationOutcome::RestoresFeasibility);
        assert_eq!(causes[1].outcome, RelaxationOutcome::StillInfeasible);
    }

    #[test]
    fn ranking_orders_outcomes() {
        let mut outcomes = vec![
            RelaxationOutcome::StillInfeasible,
            RelaxationOutcome::Inconclusive,
            RelaxationOutcome::RestoresFeasibility,
        ];
        outcomes.sort_by_key(|&o| rank(o));
        assert_eq!(outcomes[0], RelaxationOutcome::RestoresFeasibility);
        assert_eq!(outcomes[2], RelaxationOutcome::StillInfeasible);
    }
}
