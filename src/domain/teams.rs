// Teams, their day preferences and the synergy graph between them.

use super::errors::ValidationError;
use super::value_objects::Day;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

fn default_synergy_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub size: u32,
    /// Extra objective weight per seat on a preferred day
    #[serde(default)]
    pub preferred_days: BTreeMap<Day, f64>,
}

impl Team {
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            size,
            preferred_days: BTreeMap::new(),
        }
    }

    pub fn prefers(mut self, day: Day, weight: f64) -> Self {
        self.preferred_days.insert(day, weight);
        self
    }

    /// Objective coefficient of one occupied seat on `day`
    pub fn preference_weight(&self, day: Day) -> f64 {
        1.0 + self.preferred_days.get(&day).copied().unwrap_or(0.0)
    }
}

/// Unordered pair of teams that benefit from sharing office days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyEdge {
    pub team_a: String,
    pub team_b: String,
    #[serde(default = "default_synergy_weight")]
    pub weight: f64,
}

impl SynergyEdge {
    pub fn new(team_a: impl Into<String>, team_b: impl Into<String>) -> Self {
        Self {
            team_a: team_a.into(),
            team_b: team_b.into(),
            weight: default_synergy_weight(),
        }
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.team_a == a && self.team_b == b) || (self.team_a == b && self.team_b == a)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRegistry {
    pub teams: Vec<Team>,
    #[serde(default)]
    pub synergies: Vec<SynergyEdge>,
}

impl TeamRegistry {
    pub fn new(teams: Vec<Team>) -> Self {
        Self {
            teams,
            synergies: Vec::new(),
        }
    }

    pub fn team_index(&self, id: &str) -> Option<usize> {
        self.teams.iter().position(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Record a symmetric synergy; repeated or self pairs are ignored
    pub fn add_synergy(&mut self, a: &str, b: &str) -> Result<(), ValidationError> {
        if self.team_index(a).is_none() || self.team_index(b).is_none() {
            return Err(ValidationError::new(format!(
                "both teams must be registered before linking '{a}' and '{b}'"
            )));
        }
        if a != b && !self.synergizes(a, b) {
            self.synergies.push(SynergyEdge::new(a, b));
        }
        Ok(())
    }

    pub fn synergizes(&self, a: &str, b: &str) -> bool {
        self.synergies.iter().any(|e| e.connects(a, b))
    }

    /// Synergy edges as ordered index pairs `(lo, hi, weight)`, deduplicated
    pub fn synergy_pairs(&self) -> Vec<(usize, usize, f64)> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for edge in &self.synergies {
            if let (Some(a), Some(b)) = (self.team_index(&edge.team_a), self.team_index(&edge.team_b)) {
                let key = (a.min(b), a.max(b));
                if a != b && seen.insert(key) {
                    pairs.push((key.0, key.1, edge.weight));
                }
            }
        }
        pairs
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        if self.teams.is_empty() {
            reasons.push("no teams registered".to_string());
        }

        let mut seen = HashSet::new();
        for team in &self.teams {
            if !seen.insert(team.id.as_str()) {
                reasons.push(format!("team '{}' is registered twice", team.id));
            }
            if team.size == 0 {
                reasons.push(format!("team '{}' must have at least one member", team.id));
            }
            for (day, weight) in &team.preferred_days {
                if !(weight.is_finite() && *weight >= 0.0) {
                    reasons.push(format!(
                        "team '{}' has an invalid preference weight {} for {}",
                        team.id, weight, day
                    ));
                }
            }
        }

        for edge in &self.synergies {
            for id in [&edge.team_a, &edge.team_b] {
                if self.team_index(id).is_none() {
                    reasons.push(format!("synergy references unknown team '{id}'"));
                }
            }
            if edge.team_a == edge.team_b {
                reasons.push(format!("team '{}' cannot synergize with itself", edge.team_a));
            }
            if !(edge.weight.is_finite() && edge.weight >= 0.0) {
                reasons.push(format!(
                    "synergy between '{}' and '{}' has invalid weight {}",
                    edge.team_a, edge.team_b, edge.weight
                ));
            }
        }

        ValidationError::check(reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TeamRegistry {
        TeamRegistry::new(vec![Team::new("a", 3), Team::new("b", 2), Team::new("c", 1)])
    }

    #[test]
    fn synergy_is_symmetric_and_deduplicated() {
        let mut teams = registry();
        teams.add_synergy("a", "b").unwrap();
        teams.add_synergy("b", "a").unwrap();
        teams.add_synergy("c", "c").unwrap();

        assert_eq!(teams.synergies.len(), 1);
        assert!(teams.synergizes("b", "a"));
        assert!(!teams.synergizes("a", "c"));
        assert_eq!(teams.synergy_pairs(), vec![(0, 1, 1.0)]);
    }

    #[test]
    fn synergy_requires_registered_teams() {
        let mut teams = registry();
        assert!(teams.add_synergy("a", "ghost").is_err());
    }

    #[test]
    fn preference_weight_defaults_to_one() {
        let team = Team::new("a", 3).prefers(Day::Wednesday, 2.0);
        assert_eq!(team.preference_weight(Day::Wednesday), 3.0);
        assert_eq!(team.preference_weight(Day::Monday), 1.0);
    }

    #[test]
    fn validate_rejects_bad_registry() {
        let mut teams = registry();
        teams.teams.push(Team::new("a", 0));
        teams.synergies.push(SynergyEdge::new("a", "nobody"));
        let err = teams.validate().unwrap_err();
        assert_eq!(err.reasons.len(), 3);
    }
}
