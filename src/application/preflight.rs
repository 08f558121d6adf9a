// Preflight: validate a snapshot and build every scenario without solving

use crate::application::model_builder::ModelBuilder;
use crate::domain::PlanningInput;

/// Outcome of building one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioCheck {
    pub name: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub num_variables: usize,
    pub num_constraints: usize,
}

impl ScenarioCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builds each scenario of `input` and reports errors and likely-infeasible demand
pub fn check_scenarios(input: &PlanningInput) -> Vec<ScenarioCheck> {
    let builder = ModelBuilder::new(&input.layout, &input.teams, &input.config);

    input
        .scenarios()
        .iter()
        .map(|scenario| match builder.build(scenario) {
            Ok(model) => {
                let mut warnings = Vec::new();
                let (demand, available) = model.weekly_demand();
                if demand > available {
                    warnings.push(format!(
                        "needs {demand} seat-days but only {available} are available over the week; expect Infeasible"
                    ));
                }
                let integer_vars = model.problem.num_integer_variables();
                if integer_vars > 100_000 {
                    warnings.push(format!(
                        "{integer_vars} binary variables, may be slow to solve"
                    ));
                }
                ScenarioCheck {
                    name: scenario.name.clone(),
                    errors: Vec::new(),
                    warnings,
                    num_variables: model.num_variables(),
                    num_constraints: model.num_constraints(),
                }
            }
            Err(err) => ScenarioCheck {
                name: scenario.name.clone(),
                errors: err.reasons,
                warnings: Vec::new(),
                num_variables: 0,
                num_constraints: 0,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Desk, Layout, ModelConfig, Scenario, Team, TeamRegistry};

    #[test]
    fn reports_each_scenario() {
        let layout = Layout::new(vec![Desk::new("d1", 2), Desk::new("d2", 2)], vec![]);
        let teams = TeamRegistry::new(vec![Team::new("A", 3), Team::new("B", 2)]);
        let input = PlanningInput::new(layout, teams, ModelConfig::default()).with_scenarios(vec![
            Scenario::new("fine").with_days("A", 2).with_days("B", 2),
            Scenario::new("crowded").with_days("A", 5).with_days("B", 5),
            Scenario::new("broken").with_days("A", 6).with_days("B", 1),
        ]);

        let checks = check_scenarios(&input);
        assert_eq!(checks.len(), 3);
        assert!(checks[0].is_valid() && checks[0].warnings.is_empty());
        assert_eq!(checks[0].num_variables, 80);
        assert!(checks[1].is_valid());
        assert_eq!(checks[1].warnings.len(), 1);
        assert!(!checks[2].is_valid());
    }
}
