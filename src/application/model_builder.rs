// Scenario model builder: turns the planning inputs and one scenario into a MIP.
//
// Variables (all binary), per team `t` and day `d`:
//
// * `x[t,p,d]`: team occupies position `p`
// * `y[t,m,d]`: team uses at least one position of desk `m`
// * `z[t,m1,m2,d]`: team uses both desks of the pair `m1 < m2`
// * `pres[t,d]`: team is in the office
// * `together[a,b,d]`: synergizing teams `a < b` share the day (synergy mode only)
//
// Building has no solver side effects and is deterministic: the same inputs
// always produce the same variable order, constraint order and coefficients.

use crate::domain::{
    Constraint, ConstraintFamily, Day, Layout, ModelConfig, ObjectiveFunction,
    OptimizationProblem, OptimizationType, Position, Scenario, TeamRegistry, ValidationError,
    Variable, VariableFamily,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Identity of a decision variable; indices refer to teams, layout positions and desks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKey {
    Seat { team: usize, position: usize, day: Day },
    DeskUse { team: usize, desk: usize, day: Day },
    DeskPair { team: usize, desk_a: usize, desk_b: usize, day: Day },
    Presence { team: usize, day: Day },
    Together { team_a: usize, team_b: usize, day: Day },
}

impl VariableKey {
    pub fn family(&self) -> VariableFamily {
        match self {
            VariableKey::Seat { .. } => VariableFamily::Seat,
            VariableKey::DeskUse { .. } => VariableFamily::DeskUse,
            VariableKey::DeskPair { .. } => VariableFamily::DeskPair,
            VariableKey::Presence { .. } => VariableFamily::Presence,
            VariableKey::Together { .. } => VariableFamily::Together,
        }
    }
}

/// Which inequality of the three-part AND linearization a row is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairBound {
    /// `z ≥ y1 + y2 − 1`
    Lower,
    /// `z ≤ y1`
    UpperFirst,
    /// `z ≤ y2`
    UpperSecond,
}

/// Identity of a constraint instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKey {
    SeatCapacity { position: usize, day: Day },
    DeskLinkage { team: usize, position: usize, day: Day },
    DeskSaturation { team: usize, desk: usize, day: Day },
    Fragmentation { team: usize, desk_a: usize, desk_b: usize, day: Day, bound: PairBound },
    WholeTeamPresence { team: usize, day: Day },
    MandatoryDays { team: usize },
    DailySlackFloor { day: Day },
    SynergyLink { team_a: usize, team_b: usize, day: Day, first: bool },
}

impl ConstraintKey {
    pub fn family(&self) -> ConstraintFamily {
        match self {
            ConstraintKey::SeatCapacity { .. } => ConstraintFamily::SeatCapacity,
            ConstraintKey::DeskLinkage { .. } => ConstraintFamily::DeskLinkage,
            ConstraintKey::DeskSaturation { .. } => ConstraintFamily::DeskSaturation,
            ConstraintKey::Fragmentation { .. } => ConstraintFamily::Fragmentation,
            ConstraintKey::WholeTeamPresence { .. } => ConstraintFamily::WholeTeamPresence,
            ConstraintKey::MandatoryDays { .. } => ConstraintFamily::MandatoryDays,
            ConstraintKey::DailySlackFloor { .. } => ConstraintFamily::DailySlackFloor,
            ConstraintKey::SynergyLink { .. } => ConstraintFamily::SynergyLink,
        }
    }
}

/// A built MIP instance plus the bookkeeping needed to read its solution back
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioModel {
    pub problem: OptimizationProblem,
    /// One key per column of `problem`
    pub variables: Vec<VariableKey>,
    /// One key per row of `problem`
    pub constraints: Vec<ConstraintKey>,
    pub team_ids: Vec<String>,
    pub team_sizes: Vec<u32>,
    pub desk_ids: Vec<String>,
    pub positions: Vec<Position>,
    pub distances: Vec<Vec<f64>>,
    pub total_capacity: u32,
    pub min_slack: u32,
    /// `k_t` per team index
    pub mandatory_days: Vec<i32>,
    columns: HashMap<VariableKey, usize>,
}

impl ScenarioModel {
    pub fn column(&self, key: &VariableKey) -> Option<usize> {
        self.columns.get(key).copied()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Row count per constraint family
    pub fn family_counts(&self) -> BTreeMap<ConstraintFamily, usize> {
        let mut counts = BTreeMap::new();
        for key in &self.constraints {
            *counts.entry(key.family()).or_insert(0) += 1;
        }
        counts
    }

    /// Copy of the problem with every row of the given families dropped
    pub fn relaxed(&self, families: &[ConstraintFamily]) -> OptimizationProblem {
        let constraints = self
            .problem
            .constraints
            .iter()
            .zip(&self.constraints)
            .filter(|(_, key)| !families.contains(&key.family()))
            .map(|(c, _)| c.clone())
            .collect();

        OptimizationProblem {
            constraints,
            ..self.problem.clone()
        }
    }

    /// Seat-days the scenario asks for versus what the slack floor leaves over the week
    pub fn weekly_demand(&self) -> (u64, u64) {
        let demand = self
            .team_sizes
            .iter()
            .zip(&self.mandatory_days)
            .map(|(&size, &k)| size as u64 * k.max(0) as u64)
            .sum();
        let available =
            Day::COUNT as u64 * self.total_capacity.saturating_sub(self.min_slack) as u64;
        (demand, available)
    }
}

/// Pure builder over borrowed, read-only inputs
pub struct ModelBuilder<'a> {
    layout: &'a Layout,
    teams: &'a TeamRegistry,
    config: &'a ModelConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(layout: &'a Layout, teams: &'a TeamRegistry, config: &'a ModelConfig) -> Self {
        Self {
            layout,
            teams,
            config,
        }
    }

    /// Checks the scenario against the inputs and returns `k_t` per team index.
    pub fn validate_scenario(&self, scenario: &Scenario) -> Result<Vec<i32>, ValidationError> {
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

        let capacity = self.layout.total_capacity();
        if self.config.min_slack > capacity {
            reasons.push(format!(
                "minimum slack {} exceeds total capacity {}",
                self.config.min_slack, capacity
            ));
        }

        for team in scenario.mandatory_days.keys() {
            if self.teams.team_index(team).is_none() {
                reasons.push(format!(
                    "scenario '{}' names unknown team '{}'",
                    scenario.name, team
                ));
            }
        }

        let mut days = Vec::with_capacity(self.teams.len());
        for team in &self.teams.teams {
            if team.size > capacity {
                reasons.push(format!(
                    "team '{}' has {} members but the office only seats {}",
                    team.id, team.size, capacity
                ));
            }
            match scenario.days_for(&team.id) {
                Some(k) if k < 0 => reasons.push(format!(
                    "team '{}' has a negative mandatory-day count {}",
                    team.id, k
                )),
                Some(k) if k as usize > Day::COUNT => reasons.push(format!(
                    "team '{}' needs {} mandatory days but the week has {}",
                    team.id,
                    k,
                    Day::COUNT
                )),
                Some(k) => days.push(k),
                None => reasons.push(format!(
                    "scenario '{}' has no mandatory-day count for team '{}'",
                    scenario.name, team.id
                )),
            }
        }

        ValidationError::check(reasons)?;
        Ok(days)
    }

    pub fn build(&self, scenario: &Scenario) -> Result<ScenarioModel, ValidationError> {
        let mandatory_days = self.validate_scenario(scenario)?;

        let teams = &self.teams.teams;
        let desks = &self.layout.desks;
        let positions = self.layout.positions();
        let distances = self.layout.distance_table();
        let total_capacity = self.layout.total_capacity();
        let mode = self.config.objective_mode;

        let mut positions_of_desk: Vec<Vec<usize>> = vec![Vec::new(); desks.len()];
        for (p, pos) in positions.iter().enumerate() {
            positions_of_desk[pos.desk].push(p);
        }
        let desk_pairs: Vec<(usize, usize)> = (0..desks.len())
            .flat_map(|a| ((a + 1)..desks.len()).map(move |b| (a, b)))
            .collect();
        let synergy_pairs = if mode.rewards_synergy() {
            self.teams.synergy_pairs()
        } else {
            Vec::new()
        };

        let seat_label = |p: usize| {
            let pos = positions[p];
            format!("{}#{}", desks[pos.desk].id, pos.slot)
        };

        let mut asm = Assembly::default();

        // Columns, team-major then day
        let mut x = vec![vec![Vec::with_capacity(positions.len()); Day::COUNT]; teams.len()];
        let mut y = vec![vec![Vec::with_capacity(desks.len()); Day::COUNT]; teams.len()];
        let mut z = vec![vec![Vec::with_capacity(desk_pairs.len()); Day::COUNT]; teams.len()];
        let mut pres = vec![vec![0; Day::COUNT]; teams.len()];

        for (t, team) in teams.iter().enumerate() {
            for day in Day::ALL {
                let d = day.index();
                let weight = team.preference_weight(day);
                for p in 0..positions.len() {
                    x[t][d].push(asm.add_binary(
                        VariableKey::Seat { team: t, position: p, day },
                        format!("x[{},{},{}]", team.id, seat_label(p), day),
                        weight,
                    ));
                }
                for (m, desk) in desks.iter().enumerate() {
                    y[t][d].push(asm.add_binary(
                        VariableKey::DeskUse { team: t, desk: m, day },
                        format!("y[{},{},{}]", team.id, desk.id, day),
                        0.0,
                    ));
                }
                for &(a, b) in &desk_pairs {
                    let penalty = if mode.penalizes_fragmentation() {
                        -self.config.distance_weight * distances[a][b]
                    } else {
                        0.0
                    };
                    z[t][d].push(asm.add_binary(
                        VariableKey::DeskPair { team: t, desk_a: a, desk_b: b, day },
                        format!("z[{},{},{},{}]", team.id, desks[a].id, desks[b].id, day),
                        penalty,
                    ));
                }
                pres[t][d] = asm.add_binary(
                    VariableKey::Presence { team: t, day },
                    format!("pres[{},{}]", team.id, day),
                    0.0,
                );
            }
        }

        let mut together = Vec::with_capacity(synergy_pairs.len());
        for &(a, b, weight) in &synergy_pairs {
            let cols: Vec<usize> = Day::ALL
                .iter()
                .map(|&day| {
                    asm.add_binary(
                        VariableKey::Together { team_a: a, team_b: b, day },
                        format!("together[{},{},{}]", teams[a].id, teams[b].id, day),
                        self.config.synergy_weight * weight,
                    )
                })
                .collect();
            together.push((a, b, cols));
        }

        // 1. seat capacity
        for day in Day::ALL {
            let d = day.index();
            for p in 0..positions.len() {
                let terms = (0..teams.len()).map(|t| (x[t][d][p], 1.0)).collect();
                asm.add_row(
                    ConstraintKey::SeatCapacity { position: p, day },
                    Constraint::leq(terms, 1.0)
                        .with_name(format!("seat_capacity[{},{}]", seat_label(p), day)),
                );
            }
        }

        // 2. x → y linkage
        for (t, team) in teams.iter().enumerate() {
            for day in Day::ALL {
                let d = day.index();
                for (m, seats) in positions_of_desk.iter().enumerate() {
                    for &p in seats {
                        asm.add_row(
                            ConstraintKey::DeskLinkage { team: t, position: p, day },
                            Constraint::leq(vec![(x[t][d][p], 1.0), (y[t][d][m], -1.0)], 0.0)
                                .with_name(format!(
                                    "desk_linkage[{},{},{}]",
                                    team.id,
                                    seat_label(p),
                                    day
                                )),
                        );
                    }
                }
            }
        }

        // 3. desk saturation
        for (t, team) in teams.iter().enumerate() {
            for day in Day::ALL {
                let d = day.index();
                for (m, seats) in positions_of_desk.iter().enumerate() {
                    let mut terms: Vec<(usize, f64)> =
                        seats.iter().map(|&p| (x[t][d][p], 1.0)).collect();
                    terms.push((y[t][d][m], -(desks[m].capacity() as f64)));
                    asm.add_row(
                        ConstraintKey::DeskSaturation { team: t, desk: m, day },
                        Constraint::leq(terms, 0.0).with_name(format!(
                            "desk_saturation[{},{},{}]",
                            team.id, desks[m].id, day
                        )),
                    );
                }
            }
        }

        // 4. fragmentation: z = y1 AND y2 as three inequalities
        for (t, team) in teams.iter().enumerate() {
            for day in Day::ALL {
                let d = day.index();
                for (i, &(a, b)) in desk_pairs.iter().enumerate() {
                    let (zc, ya, yb) = (z[t][d][i], y[t][d][a], y[t][d][b]);
                    let label = format!("{},{},{},{}", team.id, desks[a].id, desks[b].id, day);
                    let key = |bound| ConstraintKey::Fragmentation {
                        team: t,
                        desk_a: a,
                        desk_b: b,
                        day,
                        bound,
                    };
                    asm.add_row(
                        key(PairBound::Lower),
                        Constraint::geq(vec![(zc, 1.0), (ya, -1.0), (yb, -1.0)], -1.0)
                            .with_name(format!("fragmentation_lower[{label}]")),
                    );
                    asm.add_row(
                        key(PairBound::UpperFirst),
                        Constraint::leq(vec![(zc, 1.0), (ya, -1.0)], 0.0)
                            .with_name(format!("fragmentation_upper_a[{label}]")),
                    );
                    asm.add_row(
                        key(PairBound::UpperSecond),
                        Constraint::leq(vec![(zc, 1.0), (yb, -1.0)], 0.0)
                            .with_name(format!("fragmentation_upper_b[{label}]")),
                    );
                }
            }
        }

        // 5. whole-team presence
        for (t, team) in teams.iter().enumerate() {
            for day in Day::ALL {
                let d = day.index();
                let mut terms: Vec<(usize, f64)> = x[t][d].iter().map(|&c| (c, 1.0)).collect();
                terms.push((pres[t][d], -(team.size as f64)));
                asm.add_row(
                    ConstraintKey::WholeTeamPresence { team: t, day },
                    Constraint::eq(terms, 0.0)
                        .with_name(format!("whole_team[{},{}]", team.id, day)),
                );
            }
        }

        // 6. mandatory days
        for (t, team) in teams.iter().enumerate() {
            let terms = pres[t].iter().map(|&c| (c, 1.0)).collect();
            asm.add_row(
                ConstraintKey::MandatoryDays { team: t },
                Constraint::eq(terms, mandatory_days[t] as f64)
                    .with_name(format!("mandatory_days[{}]", team.id)),
            );
        }

        // 7. daily slack floor
        let seats_available = total_capacity.saturating_sub(self.config.min_slack) as f64;
        for day in Day::ALL {
            let d = day.index();
            let terms = (0..teams.len())
                .flat_map(|t| x[t][d].iter().map(|&c| (c, 1.0)))
                .collect();
            asm.add_row(
                ConstraintKey::DailySlackFloor { day },
                Constraint::leq(terms, seats_available)
                    .with_name(format!("slack_floor[{day}]")),
            );
        }

        // 8. synergy link: together ≤ pres[a], together ≤ pres[b]
        for (a, b, cols) in &together {
            for day in Day::ALL {
                let d = day.index();
                for (first, team) in [(true, *a), (false, *b)] {
                    asm.add_row(
                        ConstraintKey::SynergyLink { team_a: *a, team_b: *b, day, first },
                        Constraint::leq(vec![(cols[d], 1.0), (pres[team][d], -1.0)], 0.0)
                            .with_name(format!(
                                "synergy_link[{},{},{},{}]",
                                teams[*a].id, teams[*b].id, day, teams[team].id
                            )),
                    );
                }
            }
        }

        let Assembly {
            variables,
            objective,
            keys,
            columns,
            constraints,
            constraint_keys,
        } = asm;

        let problem = OptimizationProblem {
            name: scenario.name.clone(),
            objective: ObjectiveFunction::new(OptimizationType::Maximize, objective),
            constraints,
            variables,
            solver_config: self.config.solver_config(),
        };

        debug!(
            scenario = %scenario.name,
            variables = problem.num_variables(),
            constraints = problem.constraints.len(),
            "built allocation model"
        );

        Ok(ScenarioModel {
            problem,
            variables: keys,
            constraints: constraint_keys,
            team_ids: teams.iter().map(|t| t.id.clone()).collect(),
            team_sizes: teams.iter().map(|t| t.size).collect(),
            desk_ids: desks.iter().map(|d| d.id.clone()).collect(),
            positions,
            distances,
            total_capacity,
            min_slack: self.config.min_slack,
            mandatory_days,
            columns,
        })
    }
}

#[derive(Default)]
struct Assembly {
    variables: Vec<Variable>,
    objective: Vec<f64>,
    keys: Vec<VariableKey>,
    columns: HashMap<VariableKey, usize>,
    constraints: Vec<Constraint>,
    constraint_keys: Vec<ConstraintKey>,
}

impl Assembly {
    fn add_binary(&mut self, key: VariableKey, name: String, coefficient: f64) -> usize {
        let col = self.variables.len();
        self.variables.push(Variable::binary(name));
        self.objective.push(coefficient);
        self.keys.push(key);
        self.columns.insert(key, col);
        col
    }

    fn add_row(&mut self, key: ConstraintKey, constraint: Constraint) {
        self.constraints.push(constraint);
        self.constraint_keys.push(key);
    }
}
