use crate::domain::{Day, ScenarioOutcome, ScenarioResult, ScenarioSummary, SweepReport};
use parking_lot::Mutex;

/// Collects scenario outcomes from any number of workers and hands them back in
/// scenario order.
pub struct ResultAggregator {
    total_capacity: u32,
    results: Mutex<Vec<ScenarioResult>>,
}

impl ResultAggregator {
    pub fn new(total_capacity: u32) -> Self {
        Self {
            total_capacity,
            results: Mutex::new(Vec::new()),
        }
    }

    /// Stores the outcome and returns the assembled result
    pub fn push(&self, outcome: ScenarioOutcome) -> ScenarioResult {
        let result = assemble(outcome, self.total_capacity);
        self.results.lock().push(result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains everything collected so far into a report ordered by scenario index.
    /// Workers still holding the aggregator may keep pushing into an empty buffer.
    pub fn finish(&self) -> SweepReport {
        let mut results = std::mem::take(&mut *self.results.lock());
        results.sort_by_key(|r| r.index);
        SweepReport { results }
    }
}

/// Tags an outcome with its summary statistics
pub fn assemble(outcome: ScenarioOutcome, total_capacity: u32) -> ScenarioResult {
    let summary = summarize(&outcome, total_capacity);
    ScenarioResult {
        index: outcome.index,
        status: outcome.status(),
        scenario: outcome.scenario,
        solution: outcome.solution,
        sensitivity: outcome.sensitivity,
        diagnosis: outcome.diagnosis,
        message: outcome.message,
        summary,
    }
}

fn summarize(outcome: &ScenarioOutcome, total_capacity: u32) -> ScenarioSummary {
    let solution = &outcome.solution;
    let total_occupancy = solution.total_occupancy();
    let seat_days = (Day::COUNT as u64 * total_capacity as u64) as f64;
    let weekly_occupancy_rate = if seat_days > 0.0 {
        total_occupancy as f64 / seat_days
    } else {
        0.0
    };
    let present_team_days: usize = solution.presence.values().map(Vec::len).sum();
    let average_fragmentation_penalty = if present_team_days > 0 {
        solution.fragmentation_penalty / present_team_days as f64
    } else {
        0.0
    };

    ScenarioSummary {
        total_occupancy,
        weekly_occupancy_rate,
        free_seat_rate: if seat_days > 0.0 {
            1.0 - weekly_occupancy_rate
        } else {
            0.0
        },
        fragmentation_penalty: solution.fragmentation_penalty,
        average_fragmentation_penalty,
        solve_time_ms: outcome.solve_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AllocationSolution, Scenario, ScenarioStatus};
    use std::sync::Arc;

    fn solved(index: usize) -> ScenarioOutcome {
        let mut solution = AllocationSolution::empty(ScenarioStatus::Solved);
        solution.daily_occupancy.insert(Day::Monday, 3);
        solution.daily_occupancy.insert(Day::Tuesday, 2);
        solution
            .presence
            .insert("A".into(), vec![Day::Monday, Day::Tuesday]);
        solution.fragmentation_penalty = 5.0;
        let mut outcome = ScenarioOutcome::new(index, Scenario::new(format!("s{index}")), solution);
        outcome.solve_time_ms = 12.0;
        outcome
    }

    #[test]
    fn summary_rates() {
        let result = assemble(solved(0), 4);
        assert_eq!(result.summary.total_occupancy, 5);
        assert!((result.summary.weekly_occupancy_rate - 0.25).abs() < 1e-12);
        assert!((result.summary.free_seat_rate - 0.75).abs() < 1e-12);
        assert_eq!(result.summary.average_fragmentation_penalty, 2.5);
        assert_eq!(result.summary.solve_time_ms, 12.0);
        assert_eq!(result.status, ScenarioStatus::Solved);
    }

    #[test]
    fn unsolved_outcomes_summarize_to_zero() {
        let outcome =
            ScenarioOutcome::unsolved(3, Scenario::new("x"), ScenarioStatus::Rejected, "bad k");
        let result = assemble(outcome, 4);
        assert_eq!(result.summary.total_occupancy, 0);
        assert_eq!(result.summary.average_fragmentation_penalty, 0.0);
        assert_eq!(result.message.as_deref(), Some("bad k"));
    }

    #[test]
    fn finish_restores_input_order() {
        let aggregator = Arc::new(ResultAggregator::new(4));
        let handles: Vec<_> = (0..8)
            .rev()
            .map(|i| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    aggregator.push(solved(i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(aggregator.len(), 8);
        let report = aggregator.finish();
        let order: Vec<_> = report.results.iter().map(|r| r.index).collect();
        assert_eq!(order, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn finish_drains_while_other_handles_are_alive() {
        let aggregator = Arc::new(ResultAggregator::new(4));
        let worker = Arc::clone(&aggregator);
        worker.push(solved(1));
        worker.push(solved(0));

        let report = aggregator.finish();
        assert_eq!(report.len(), 2);
        assert_eq!(report.results[0].index, 0);
        assert!(aggregator.is_empty());

        worker.push(solved(2));
        assert_eq!(aggregator.finish().results[0].index, 2);
    }
}
