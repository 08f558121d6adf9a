// Office layout: desks, their seats, and the distances between desks.

use super::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Extra distance charged for crossing between corridors.
pub const CORRIDOR_CROSSING_DISTANCE: f64 = 5.0;

fn default_distance() -> f64 {
    1.0
}

/// Where a desk sits, used to infer distances that are not listed explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskLocation {
    pub corridor: u32,
    /// 1-based index of the desk along its corridor
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desk {
    pub id: String,
    /// Number of seats; a desk's capacity
    pub positions: u32,
    #[serde(default)]
    pub location: Option<DeskLocation>,
}

impl Desk {
    pub fn new(id: impl Into<String>, positions: u32) -> Self {
        Self {
            id: id.into(),
            positions,
            location: None,
        }
    }

    pub fn at(mut self, corridor: u32, index: u32) -> Self {
        self.location = Some(DeskLocation { corridor, index });
        self
    }

    pub fn capacity(&self) -> u32 {
        self.positions
    }
}

/// Unordered desk pair and the walking distance between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistancePair {
    pub desk_a: String,
    pub desk_b: String,
    pub distance: f64,
}

impl DistancePair {
    pub fn new(desk_a: impl Into<String>, desk_b: impl Into<String>, distance: f64) -> Self {
        Self {
            desk_a: desk_a.into(),
            desk_b: desk_b.into(),
            distance,
        }
    }
}

/// A single seat, identified by its desk (index into `Layout::desks`) and slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub desk: usize,
    pub slot: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub desks: Vec<Desk>,
    #[serde(default)]
    pub distances: Vec<DistancePair>,
    /// Distance used for pairs neither listed nor locatable
    #[serde(default = "default_distance")]
    pub default_distance: f64,
}

impl Layout {
    pub fn new(desks: Vec<Desk>, distances: Vec<DistancePair>) -> Self {
        Self {
            desks,
            distances,
            default_distance: default_distance(),
        }
    }

    /// Corridor-style office: `tables_per_corridor[c]` desks in corridor `c + 1`,
    /// each with `positions_per_table` seats. Distances are inferred from locations.
    pub fn from_corridors(
        tables_per_corridor: &[u32],
        positions_per_table: u32,
    ) -> Result<Self, ValidationError> {
        let mut reasons = Vec::new();
        if tables_per_corridor.is_empty() {
            reasons.push("a layout needs at least one corridor".to_string());
        }
        if positions_per_table == 0 {
            reasons.push("positions per table must be positive".to_string());
        }
        for (c, &tables) in tables_per_corridor.iter().enumerate() {
            if tables == 0 {
                reasons.push(format!("corridor {} has no tables", c + 1));
            }
        }
        ValidationError::check(reasons)?;

        let desks = tables_per_corridor
            .iter()
            .enumerate()
            .flat_map(|(c, &tables)| {
                let corridor = c as u32 + 1;
                (1..=tables).map(move |m| {
                    Desk::new(format!("C{corridor}-M{m}"), positions_per_table).at(corridor, m)
                })
            })
            .collect();

        Ok(Self::new(desks, Vec::new()))
    }

    pub fn with_default_distance(mut self, distance: f64) -> Self {
        self.default_distance = distance;
        self
    }

    pub fn total_capacity(&self) -> u32 {
        self.desks.iter().map(Desk::capacity).sum()
    }

    pub fn desk_index(&self, id: &str) -> Option<usize> {
        self.desks.iter().position(|d| d.id == id)
    }

    /// Every seat, desk by desk, slots 1-based
    pub fn positions(&self) -> Vec<Position> {
        self.desks
            .iter()
            .enumerate()
            .flat_map(|(desk, d)| (1..=d.positions).map(move |slot| Position { desk, slot }))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        if self.desks.is_empty() {
            reasons.push("layout has no desks".to_string());
        }

        let mut seen = HashSet::new();
        for desk in &self.desks {
            if !seen.insert(desk.id.as_str()) {
                reasons.push(format!("duplicate desk id '{}'", desk.id));
            }
            if desk.positions == 0 {
                reasons.push(format!("desk '{}' has no positions", desk.id));
            }
        }

        if !(self.default_distance.is_finite() && self.default_distance >= 0.0) {
            reasons.push(format!(
                "default distance must be a nonnegative number, got {}",
                self.default_distance
            ));
        }

        let mut listed: HashMap<(usize, usize), f64> = HashMap::new();
        for pair in &self.distances {
            let (Some(a), Some(b)) = (self.desk_index(&pair.desk_a), self.desk_index(&pair.desk_b))
            else {
                reasons.push(format!(
                    "distance pair ({}, {}) references an unknown desk",
                    pair.desk_a, pair.desk_b
                ));
                continue;
            };
            if a == b {
                reasons.push(format!("distance pair for desk '{}' with itself", pair.desk_a));
                continue;
            }
            if !(pair.distance.is_finite() && pair.distance >= 0.0) {
                reasons.push(format!(
                    "distance between '{}' and '{}' must be nonnegative, got {}",
                    pair.desk_a, pair.desk_b, pair.distance
                ));
                continue;
            }
            let key = (a.min(b), a.max(b));
            if let Some(previous) = listed.insert(key, pair.distance) {
                if previous != pair.distance {
                    reasons.push(format!(
                        "conflicting distances between '{}' and '{}': {} and {}",
                        pair.desk_a, pair.desk_b, previous, pair.distance
                    ));
                }
            }
        }

        ValidationError::check(reasons)
    }

    /// Symmetric desk-by-desk distance table, explicit pairs first, then inferred.
    /// The diagonal is zero and never used by the model.
    pub fn distance_table(&self) -> Vec<Vec<f64>> {
        let n = self.desks.len();
        let mut table = vec![vec![0.0; n]; n];

        for a in 0..n {
            for b in (a + 1)..n {
                let d = self.inferred_distance(a, b);
                table[a][b] = d;
                table[b][a] = d;
            }
        }

        for pair in &self.distances {
            if let (Some(a), Some(b)) = (self.desk_index(&pair.desk_a), self.desk_index(&pair.desk_b)) {
                if a != b {
                    table[a][b] = pair.distance;
                    table[b][a] = pair.distance;
                }
            }
        }

        table
    }

    fn inferred_distance(&self, a: usize, b: usize) -> f64 {
        match (self.desks[a].location, self.desks[b].location) {
            (Some(la), Some(lb)) => {
                let along = (la.index as f64 - lb.index as f64).abs();
                if la.corridor == lb.corridor {
                    along
                } else {
                    CORRIDOR_CROSSING_DISTANCE + along
                }
            }
            _ => self.default_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corridor_layout_generates_desks_and_distances() {
        let layout = Layout::from_corridors(&[2, 3], 4).unwrap();
        assert_eq!(layout.desks.len(), 5);
        assert_eq!(layout.total_capacity(), 20);
        assert_eq!(layout.desks[2].id, "C2-M1");

        let table = layout.distance_table();
        // same corridor: index difference
        assert_eq!(table[0][1], 1.0);
        // C1-M1 to C2-M3: crossing + 2
        assert_eq!(table[0][4], 7.0);
        assert_eq!(table[4][0], 7.0);
    }

    #[test]
    fn corridor_layout_rejects_empty_corridor() {
        let err = Layout::from_corridors(&[2, 0], 4).unwrap_err();
        assert!(err.reasons[0].contains("corridor 2"));
    }

    #[test]
    fn explicit_pairs_override_inference() {
        let layout = Layout::new(
            vec![Desk::new("a", 2), Desk::new("b", 2), Desk::new("c", 1)],
            vec![DistancePair::new("b", "a", 5.0)],
        )
        .with_default_distance(3.0);

        let table = layout.distance_table();
        assert_eq!(table[0][1], 5.0);
        assert_eq!(table[1][0], 5.0);
        assert_eq!(table[0][2], 3.0);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn positions_enumerate_every_slot() {
        let layout = Layout::new(vec![Desk::new("a", 2), Desk::new("b", 1)], Vec::new());
        assert_eq!(
            layout.positions(),
            vec![
                Position { desk: 0, slot: 1 },
                Position { desk: 0, slot: 2 },
                Position { desk: 1, slot: 1 },
            ]
        );
    }

    #[test]
    fn validate_collects_layout_errors() {
        let layout = Layout::new(
            vec![Desk::new("a", 0), Desk::new("a", 2), Desk::new("b", 1)],
            vec![
                DistancePair::new("a", "zzz", 1.0),
                DistancePair::new("a", "b", -1.0),
                DistancePair::new("b", "b", 1.0),
            ],
        );
        let err = layout.validate().unwrap_err();
        assert_eq!(err.reasons.len(), 5);
    }

    #[test]
    fn validate_rejects_conflicting_pairs() {
        let layout = Layout::new(
            vec![Desk::new("a", 1), Desk::new("b", 1)],
            vec![DistancePair::new("a", "b", 2.0), DistancePair::new("b", "a", 3.0)],
        );
        assert!(layout.validate().unwrap_err().reasons[0].contains("conflicting"));
    }
}
