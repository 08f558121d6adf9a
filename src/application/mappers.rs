// Mappers: Convert between gRPC protobuf types and domain models
// Protobuf types stay in this module; the rest of the crate only sees domain types

use crate::application::preflight::ScenarioCheck;
use crate::domain::{
    AllocationSolution, Day, Desk, DeskLocation, DistancePair, EntityKind, InfeasibilityCause,
    Layout, ModelConfig, ObjectiveMode, PlanningInput, RelaxationOutcome, Scenario,
    ScenarioResult, ScenarioStatus, SensitivityRecord, SolverBackend, SynergyEdge, Team,
    TeamRegistry,
};
use tonic::Status;

pub mod deskplan_proto {
    tonic::include_proto!("deskplan");
}

use deskplan_proto as proto;

/// Convert protobuf day to domain day
pub fn proto_to_day(value: i32) -> std::result::Result<Day, Box<Status>> {
    match proto::Day::try_from(value) {
        Ok(proto::Day::Monday) => Ok(Day::Monday),
        Ok(proto::Day::Tuesday) => Ok(Day::Tuesday),
        Ok(proto::Day::Wednesday) => Ok(Day::Wednesday),
        Ok(proto::Day::Thursday) => Ok(Day::Thursday),
        Ok(proto::Day::Friday) => Ok(Day::Friday),
        Err(_) => Err(Box::new(Status::invalid_argument(format!(
            "Invalid day: {value}"
        )))),
    }
}

pub fn day_to_proto(day: Day) -> i32 {
    match day {
        Day::Monday => proto::Day::Monday as i32,
        Day::Tuesday => proto::Day::Tuesday as i32,
        Day::Wednesday => proto::Day::Wednesday as i32,
        Day::Thursday => proto::Day::Thursday as i32,
        Day::Friday => proto::Day::Friday as i32,
    }
}

/// Convert protobuf Layout to domain Layout
pub fn proto_to_domain_layout(proto_layout: proto::Layout) -> Layout {
    let desks = proto_layout
        .desks
        .into_iter()
        .map(|d| Desk {
            id: d.id,
            positions: d.positions,
            location: match (d.corridor, d.index) {
                (Some(corridor), Some(index)) => Some(DeskLocation { corridor, index }),
                _ => None,
            },
        })
        .collect();
    let distances = proto_layout
        .distances
        .into_iter()
        .map(|p| DistancePair::new(p.desk_a, p.desk_b, p.distance))
        .collect();

    let layout = Layout::new(desks, distances);
    match proto_layout.default_distance {
        Some(distance) => layout.with_default_distance(distance),
        None => layout,
    }
}

/// Convert protobuf teams and synergies to a domain TeamRegistry
pub fn proto_to_domain_teams(
    proto_teams: Vec<proto::Team>,
    proto_synergies: Vec<proto::SynergyEdge>,
) -> std::result::Result<TeamRegistry, Box<Status>> {
    let mut teams = Vec::with_capacity(proto_teams.len());
    for t in proto_teams {
        let mut team = Team::new(t.id, t.size);
        for pref in t.preferred_days {
            team = team.prefers(proto_to_day(pref.day)?, pref.weight);
        }
        teams.push(team);
    }

    let synergies = proto_synergies
        .into_iter()
        .map(|s| {
            let weight = s.weight.unwrap_or(1.0);
            let mut edge = SynergyEdge::new(s.team_a, s.team_b);
            edge.weight = weight;
            edge
        })
        .collect();

    Ok(TeamRegistry { teams, synergies })
}

/// Convert protobuf ModelConfig to domain ModelConfig; unset fields keep their defaults
pub fn proto_to_domain_config(cfg: Option<proto::ModelConfig>) -> ModelConfig {
    let defaults = ModelConfig::default();
    let Some(cfg) = cfg else {
        return defaults;
    };

    let objective_mode = match proto::ObjectiveMode::try_from(cfg.objective_mode) {
        Ok(proto::ObjectiveMode::OccupancyOnly) => ObjectiveMode::OccupancyOnly,
        Ok(proto::ObjectiveMode::OccupancyPlusSynergy) => ObjectiveMode::OccupancyPlusSynergy,
        _ => ObjectiveMode::OccupancyMinusFragmentation,
    };
    let backend = match proto::SolverBackend::try_from(cfg.backend) {
        Ok(proto::SolverBackend::CoinCbc) => SolverBackend::CoinCbc,
        Ok(proto::SolverBackend::Highs) => SolverBackend::Highs,
        _ => SolverBackend::Auto,
    };

    ModelConfig {
        objective_mode,
        distance_weight: cfg.distance_weight.unwrap_or(defaults.distance_weight),
        synergy_weight: cfg.synergy_weight.unwrap_or(defaults.synergy_weight),
        min_slack: cfg.min_slack,
        solver_time_limit_seconds: cfg
            .solver_time_limit_seconds
            .unwrap_or(defaults.solver_time_limit_seconds),
        optimality_gap: cfg.optimality_gap,
        backend,
        mandatory_day_sweep: if cfg.mandatory_day_sweep.is_empty() {
            defaults.mandatory_day_sweep
        } else {
            cfg.mandatory_day_sweep
        },
        max_workers: cfg
            .max_workers
            .map(|w| w as usize)
            .unwrap_or(defaults.max_workers),
        verbose: cfg.verbose,
    }
}

fn proto_to_domain_scenario(proto_scenario: proto::Scenario) -> Scenario {
    proto_scenario
        .mandatory_days
        .into_iter()
        .fold(Scenario::new(proto_scenario.name), |s, td| {
            s.with_days(td.team, td.days)
        })
}

/// Convert a protobuf SweepRequest to the domain input snapshot (not yet validated)
pub fn proto_to_domain_input(
    request: proto::SweepRequest,
) -> std::result::Result<PlanningInput, Box<Status>> {
    let layout = request
        .layout
        .ok_or_else(|| Box::new(Status::invalid_argument("Layout is required")))?;

    let layout = proto_to_domain_layout(layout);
    let teams = proto_to_domain_teams(request.teams, request.synergies)?;
    let config = proto_to_domain_config(request.config);
    let scenarios = request
        .scenarios
        .into_iter()
        .map(proto_to_domain_scenario)
        .collect();

    Ok(PlanningInput::new(layout, teams, config).with_scenarios(scenarios))
}

fn status_to_proto(status: ScenarioStatus) -> i32 {
    match status {
        ScenarioStatus::Solved => proto::ScenarioStatus::Solved as i32,
        ScenarioStatus::TimedOut => proto::ScenarioStatus::TimedOut as i32,
        ScenarioStatus::Infeasible => proto::ScenarioStatus::Infeasible as i32,
        ScenarioStatus::Failed => proto::ScenarioStatus::Failed as i32,
        ScenarioStatus::Rejected => proto::ScenarioStatus::Rejected as i32,
        ScenarioStatus::Cancelled => proto::ScenarioStatus::Cancelled as i32,
    }
}

fn scenario_to_proto(scenario: Scenario) -> proto::Scenario {
    proto::Scenario {
        name: scenario.name,
        mandatory_days: scenario
            .mandatory_days
            .into_iter()
            .map(|(team, days)| proto::TeamDays { team, days })
            .collect(),
    }
}

fn allocation_to_proto(solution: AllocationSolution) -> proto::Allocation {
    let day_counts = |counts: std::collections::BTreeMap<Day, u32>| {
        counts
            .into_iter()
            .map(|(day, count)| proto::DayCount {
                day: day_to_proto(day),
                count,
            })
            .collect::<Vec<_>>()
    };

    proto::Allocation {
        objective_value: solution.objective_value,
        gap: solution.gap,
        assignments: solution
            .assignments
            .into_iter()
            .map(|a| proto::SeatAssignment {
                team: a.team,
                desk: a.desk,
                slot: a.slot,
                day: day_to_proto(a.day),
            })
            .collect(),
        presence: solution
            .presence
            .into_iter()
            .map(|(team, days)| proto::TeamPresence {
                team,
                days: days.into_iter().map(day_to_proto).collect(),
            })
            .collect(),
        splits: solution
            .splits
            .into_iter()
            .map(|s| proto::DeskSplit {
                team: s.team,
                desk_a: s.desk_a,
                desk_b: s.desk_b,
                day: day_to_proto(s.day),
                distance: s.distance,
            })
            .collect(),
        daily_occupancy: day_counts(solution.daily_occupancy),
        desk_occupancy: solution
            .desk_occupancy
            .into_iter()
            .map(|(desk, days)| proto::DeskOccupancy {
                desk,
                days: day_counts(days),
            })
            .collect(),
        fragmentation_penalty: solution.fragmentation_penalty,
    }
}

fn sensitivity_to_proto(record: SensitivityRecord) -> proto::SensitivityRecord {
    proto::SensitivityRecord {
        is_constraint: record.kind == EntityKind::Constraint,
        family: record.family,
        identifier: record.identifier,
        value: record.value,
        reduced_cost: record.reduced_cost,
        shadow_price: record.shadow_price,
        slack: record.slack,
        range_lower: record.validity_range.lower,
        range_upper: record.validity_range.upper,
    }
}

fn cause_to_proto(cause: InfeasibilityCause) -> proto::InfeasibilityCause {
    let outcome = match cause.outcome {
        RelaxationOutcome::RestoresFeasibility => "restores_feasibility",
        RelaxationOutcome::StillInfeasible => "still_infeasible",
        RelaxationOutcome::Inconclusive => "inconclusive",
    };
    proto::InfeasibilityCause {
        families: cause.families.iter().map(|f| f.to_string()).collect(),
        restores_feasibility: cause.outcome == RelaxationOutcome::RestoresFeasibility,
        outcome: outcome.to_string(),
        detail: cause.detail,
    }
}

/// Convert domain ScenarioResult to protobuf ScenarioResult
pub fn domain_to_proto_result(result: ScenarioResult) -> proto::ScenarioResult {
    let summary = result.summary;
    proto::ScenarioResult {
        index: result.index as u32,
        scenario: Some(scenario_to_proto(result.scenario)),
        status: status_to_proto(result.status),
        solution: Some(allocation_to_proto(result.solution)),
        sensitivity: result
            .sensitivity
            .into_iter()
            .map(sensitivity_to_proto)
            .collect(),
        diagnosis: result.diagnosis.into_iter().map(cause_to_proto).collect(),
        message: result.message.unwrap_or_default(),
        summary: Some(proto::ScenarioSummary {
            total_occupancy: summary.total_occupancy,
            weekly_occupancy_rate: summary.weekly_occupancy_rate,
            free_seat_rate: summary.free_seat_rate,
            fragmentation_penalty: summary.fragmentation_penalty,
            average_fragmentation_penalty: summary.average_fragmentation_penalty,
            solve_time_ms: summary.solve_time_ms,
        }),
    }
}

pub fn domain_to_proto_check(check: ScenarioCheck) -> proto::ScenarioCheck {
    proto::ScenarioCheck {
        is_valid: check.is_valid(),
        name: check.name,
        errors: check.errors,
        warnings: check.warnings,
        num_variables: check.num_variables as u32,
        num_constraints: check.num_constraints as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> proto::SweepRequest {
        proto::SweepRequest {
            layout: Some(proto::Layout {
                desks: vec![
                    proto::Desk {
                        id: "d1".into(),
                        positions: 2,
                        corridor: Some(0),
                        index: Some(0),
                    },
                    proto::Desk {
                        id: "d2".into(),
                        positions: 2,
                        corridor: None,
                        index: None,
                    },
                ],
                distances: vec![proto::DistancePair {
                    desk_a: "d1".into(),
                    desk_b: "d2".into(),
                    distance: 5.0,
                }],
                default_distance: None,
            }),
            teams: vec![proto::Team {
                id: "A".into(),
                size: 3,
                preferred_days: vec![proto::DayWeight {
                    day: proto::Day::Wednesday as i32,
                    weight: 0.5,
                }],
            }],
            synergies: vec![],
            config: Some(proto::ModelConfig {
                distance_weight: Some(1.0),
                mandatory_day_sweep: vec![1, 2],
                ..Default::default()
            }),
            scenarios: vec![],
            concurrent: false,
        }
    }

    #[test]
    fn maps_request_to_input() {
        let input = proto_to_domain_input(request()).unwrap();
        assert_eq!(input.layout.total_capacity(), 4);
        assert_eq!(
            input.layout.desks[0].location,
            Some(DeskLocation {
                corridor: 0,
                index: 0
            })
        );
        assert_eq!(input.teams.teams[0].preference_weight(Day::Wednesday), 1.5);
        assert_eq!(input.config.distance_weight, 1.0);
        assert_eq!(input.config.solver_time_limit_seconds, 60.0);
        assert_eq!(input.scenarios().len(), 2);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn missing_layout_is_rejected() {
        let mut req = request();
        req.layout = None;
        let err = proto_to_domain_input(req).unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn invalid_day_is_rejected() {
        assert!(proto_to_day(9).is_err());
        assert_eq!(proto_to_day(day_to_proto(Day::Friday)).unwrap(), Day::Friday);
    }
}
