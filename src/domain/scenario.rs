use super::teams::TeamRegistry;
use super::value_objects::ScenarioStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One set of mandatory in-office day counts, keyed by team id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub mandatory_days: BTreeMap<String, i32>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mandatory_days: BTreeMap::new(),
        }
    }

    pub fn with_days(mut self, team: impl Into<String>, days: i32) -> Self {
        self.mandatory_days.insert(team.into(), days);
        self
    }

    /// Same count for every registered team
    pub fn uniform(name: impl Into<String>, teams: &TeamRegistry, days: i32) -> Self {
        Self {
            name: name.into(),
            mandatory_days: teams.teams.iter().map(|t| (t.id.clone(), days)).collect(),
        }
    }

    pub fn days_for(&self, team: &str) -> Option<i32> {
        self.mandatory_days.get(team).copied()
    }
}

/// Lifecycle of a scenario inside a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Pending,
    Building,
    Solving,
    Finished(ScenarioStatus),
}

impl ScenarioState {
    /// Whether `next` may follow `self`
    pub fn can_advance_to(self, next: ScenarioState) -> bool {
        use ScenarioState::*;
        match (self, next) {
            (Pending, Building) | (Building, Solving) => true,
            // validation and cancellation end a scenario before the solver runs
            (Pending | Building, Finished(ScenarioStatus::Rejected | ScenarioStatus::Cancelled)) => {
                true
            }
            (Solving, Finished(status)) => !matches!(status, ScenarioStatus::Rejected),
            _ => false,
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioState::Pending => write!(f, "Pending"),
            ScenarioState::Building => write!(f, "Building"),
            ScenarioState::Solving => write!(f, "Solving"),
            ScenarioState::Finished(status) => write!(f, "{status}"),
        }
    }
}

/// Scenario-scoped cancellation flag; clones share the same flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
