// Sweep orchestration: builds, solves and classifies every scenario, one
// independent model per scenario. Failures stay local to their scenario.

use crate::application::aggregator::ResultAggregator;
use crate::application::diagnostics::InfeasibilityDiagnoser;
use crate::application::model_builder::{ModelBuilder, ScenarioModel};
use crate::application::sensitivity::SensitivityExtractor;
use crate::domain::{
    CancelToken, PlanningError, PlanningInput, Scenario, ScenarioOutcome, ScenarioResult,
    ScenarioState, ScenarioStatus, Solution, SolutionStatus, SolverError, SolverService,
    SweepReport,
};
use crate::solver::SolverFactory;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// A scenario queued in a sweep together with its cancellation handle
#[derive(Debug, Clone)]
pub struct PlannedScenario {
    pub scenario: Scenario,
    pub token: CancelToken,
}

/// Ordered scenarios of one sweep
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    pub entries: Vec<PlannedScenario>,
}

impl SweepPlan {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self {
            entries: scenarios
                .into_iter()
                .map(|scenario| PlannedScenario {
                    scenario,
                    token: CancelToken::new(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cancellation handle of the scenario at `index`
    pub fn token(&self, index: usize) -> Option<CancelToken> {
        self.entries.get(index).map(|e| e.token.clone())
    }
}

/// Drives a sweep over shared, read-only planning inputs
#[derive(Clone)]
pub struct SweepOrchestrator {
    input: Arc<PlanningInput>,
    solver: Arc<dyn SolverService>,
}

impl SweepOrchestrator {
    /// Uses the backend named in the input configuration
    pub fn new(input: PlanningInput) -> Result<Self, PlanningError> {
        let solver = SolverFactory::create_from_backend(input.config.backend)?;
        Ok(Self::with_solver(Arc::new(input), solver))
    }

    pub fn with_solver(input: Arc<PlanningInput>, solver: Arc<dyn SolverService>) -> Self {
        Self { input, solver }
    }

    pub fn input(&self) -> &PlanningInput {
        &self.input
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Plan over the input's scenarios (explicit list or the uniform sweep)
    pub fn plan(&self) -> SweepPlan {
        SweepPlan::new(self.input.scenarios())
    }

    /// Solves the scenarios one after the other
    pub fn run(&self, scenarios: &[Scenario]) -> SweepReport {
        self.run_plan(&SweepPlan::new(scenarios.to_vec()))
    }

    pub fn run_plan(&self, plan: &SweepPlan) -> SweepReport {
        info!(scenarios = plan.len(), solver = self.solver.name(), "starting sequential sweep");
        let aggregator = ResultAggregator::new(self.input.layout.total_capacity());
        for (index, entry) in plan.entries.iter().enumerate() {
            aggregator.push(self.solve_scenario(index, &entry.scenario, &entry.token));
        }
        aggregator.finish()
    }

    /// Solves scenarios on blocking workers, at most `max_workers` at a time.
    /// The report is in scenario order regardless of completion order.
    pub async fn run_concurrent(&self, scenarios: &[Scenario]) -> SweepReport {
        self.run_plan_concurrent(&SweepPlan::new(scenarios.to_vec()), None)
            .await
    }

    /// Like [`run_concurrent`](Self::run_concurrent); every result is also sent to
    /// `progress` as soon as its scenario finishes.
    pub async fn run_plan_concurrent(
        &self,
        plan: &SweepPlan,
        progress: Option<mpsc::Sender<ScenarioResult>>,
    ) -> SweepReport {
        let workers = self.input.config.max_workers.max(1);
        info!(
            scenarios = plan.len(),
            workers,
            solver = self.solver.name(),
            "starting concurrent sweep"
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let aggregator = Arc::new(ResultAggregator::new(self.input.layout.total_capacity()));
        let mut handles = Vec::with_capacity(plan.len());

        for (index, entry) in plan.entries.iter().enumerate() {
            let this = self.clone();
            let scenario = entry.scenario.clone();
            let token = entry.token.clone();
            let semaphore = Arc::clone(&semaphore);
            let aggregator = Arc::clone(&aggregator);
            let progress = progress.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let fallback = scenario.clone();
                let outcome = match tokio::task::spawn_blocking(move || {
                    this.solve_scenario(index, &scenario, &token)
                })
                .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(scenario = %fallback.name, error = %err, "scenario worker died");
                        ScenarioOutcome::unsolved(
                            index,
                            fallback,
                            ScenarioStatus::Failed,
                            format!("worker failed: {err}"),
                        )
                    }
                };
                let result = aggregator.push(outcome);
                if let Some(progress) = progress {
                    // a dropped receiver only stops progress reporting
                    let _ = progress.send(result).await;
                }
            }));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "sweep task failed");
            }
        }

        aggregator.finish()
    }

    /// Full pipeline for one scenario: build, solve, classify, extract.
    pub fn solve_scenario(
        &self,
        index: usize,
        scenario: &Scenario,
        token: &CancelToken,
    ) -> ScenarioOutcome {
        let started = Instant::now();
        let mut state = ScenarioState::Pending;
        info!(scenario = %scenario.name, index, "scenario started");

        let mut outcome = self.pipeline(index, scenario, token, &mut state);
        outcome.solve_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        advance(scenario, &mut state, ScenarioState::Finished(outcome.status()));

        match outcome.status() {
            ScenarioStatus::Solved | ScenarioStatus::TimedOut => info!(
                scenario = %scenario.name,
                status = %outcome.status(),
                objective = outcome.solution.objective_value,
                elapsed_ms = outcome.solve_time_ms,
                "scenario finished"
            ),
            status => warn!(
                scenario = %scenario.name,
                %status,
                reason = outcome.message.as_deref().unwrap_or(""),
                elapsed_ms = outcome.solve_time_ms,
                "scenario finished without an assignment"
            ),
        }
        outcome
    }

    fn pipeline(
        &self,
        index: usize,
        scenario: &Scenario,
        token: &CancelToken,
        state: &mut ScenarioState,
    ) -> ScenarioOutcome {
        if token.is_cancelled() {
            return cancelled(index, scenario);
        }

        advance(scenario, state, ScenarioState::Building);
        let input = &*self.input;
        let model = match ModelBuilder::new(&input.layout, &input.teams, &input.config)
            .build(scenario)
        {
            Ok(model) => model,
            Err(err) => {
                return ScenarioOutcome::unsolved(
                    index,
                    scenario.clone(),
                    ScenarioStatus::Rejected,
                    PlanningError::from(err).to_string(),
                )
            }
        };

        if token.is_cancelled() {
            return cancelled(index, scenario);
        }

        advance(scenario, state, ScenarioState::Solving);
        let solved = self.solver.solve(&model.problem);
        self.classify(index, scenario, &model, solved)
    }

    fn classify(
        &self,
        index: usize,
        scenario: &Scenario,
        model: &ScenarioModel,
        solved: Result<Solution, SolverError>,
    ) -> ScenarioOutcome {
        let solution = match solved {
            Ok(solution) => solution,
            Err(err) => {
                return ScenarioOutcome::unsolved(
                    index,
                    scenario.clone(),
                    ScenarioStatus::Failed,
                    PlanningError::from(err).to_string(),
                )
            }
        };
        let extractor = SensitivityExtractor::new(model);

        match solution.status {
            SolutionStatus::Optimal | SolutionStatus::Feasible if solution.has_incumbent() => {
                let allocation = extractor.allocation(ScenarioStatus::Solved, &solution);
                let mut outcome = ScenarioOutcome::new(index, scenario.clone(), allocation);
                match extractor.sensitivity(self.solver.as_ref(), &solution.variable_values) {
                    Ok(records) => outcome.sensitivity = records,
                    Err(err) => {
                        debug!(scenario = %scenario.name, error = %err, "no sensitivity");
                        outcome.message = Some(format!("sensitivity unavailable: {err}"));
                    }
                }
                outcome
            }
            SolutionStatus::TimeLimit if solution.has_incumbent() => {
                let gap = match solution.gap {
                    Some(gap) => format!("{:.2}%", gap * 100.0),
                    None => "unknown".to_string(),
                };
                warn!(scenario = %scenario.name, %gap, "time limit reached, keeping incumbent");
                let allocation = extractor.allocation(ScenarioStatus::TimedOut, &solution);
                ScenarioOutcome::new(index, scenario.clone(), allocation).with_message(format!(
                    "time limit reached; best incumbent reported with optimality gap {gap}"
                ))
            }
            SolutionStatus::TimeLimit => ScenarioOutcome::unsolved(
                index,
                scenario.clone(),
                ScenarioStatus::Failed,
                "time limit reached before any feasible assignment was found",
            ),
            SolutionStatus::Infeasible => {
                let diagnosis =
                    InfeasibilityDiagnoser::new(model, self.solver.as_ref()).diagnose();
                let mut message = PlanningError::InfeasibleModel(scenario.name.clone()).to_string();
                if let Some(cause) = diagnosis.first() {
                    message.push_str("; ");
                    message.push_str(&cause.detail);
                }
                let mut outcome = ScenarioOutcome::unsolved(
                    index,
                    scenario.clone(),
                    ScenarioStatus::Infeasible,
                    message,
                );
                outcome.diagnosis = diagnosis;
                outcome
            }
            status => ScenarioOutcome::unsolved(
                index,
                scenario.clone(),
                ScenarioStatus::Failed,
                format!("solver finished with status {status}: {}", solution.message),
            ),
        }
    }
}

fn cancelled(index: usize, scenario: &Scenario) -> ScenarioOutcome {
    ScenarioOutcome::unsolved(
        index,
        scenario.clone(),
        ScenarioStatus::Cancelled,
        "cancelled before solving",
    )
}

fn advance(scenario: &Scenario, state: &mut ScenarioState, next: ScenarioState) {
    debug_assert!(
        state.can_advance_to(next),
        "illegal scenario transition {state} -> {next}"
    );
    debug!(scenario = %scenario.name, from = %state, to = %next, "scenario state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Desk, DistancePair, Layout, ModelConfig, OptimizationProblem, SolverBackend, Team,
        TeamRegistry,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn input() -> PlanningInput {
        let layout = Layout::new(
            vec![Desk::new("d1", 2), Desk::new("d2", 2)],
            vec![DistancePair::new("d1", "d2", 5.0)],
        );
        let teams = TeamRegistry::new(vec![Team::new("A", 3), Team::new("B", 2)]);
        PlanningInput::new(layout, teams, ModelConfig::default().with_distance_weight(1.0))
    }

    /// Replays a fixed answer for every solve and counts calls
    struct ScriptedSolver {
        answer: fn(&OptimizationProblem) -> Result<Solution, SolverError>,
        calls: AtomicUsize,
    }

    impl ScriptedSolver {
        fn new(answer: fn(&OptimizationProblem) -> Result<Solution, SolverError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SolverService for ScriptedSolver {
        fn solve(&self, problem: &OptimizationProblem) -> Result<Solution, SolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.answer)(problem)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn supports_mip(&self) -> bool {
            true
        }
    }

    /// Nobody comes in, so the all-zero point is feasible
    fn idle() -> Scenario {
        Scenario::new("idle").with_days("A", 0).with_days("B", 0)
    }

    fn all_zero(problem: &OptimizationProblem) -> Result<Solution, SolverError> {
        let values = vec![0.0; problem.num_variables()];
        let quality = problem.assess(&values);
        Ok(Solution::optimal(0.0, values).with_quality(quality))
    }

    #[test]
    fn backend_follows_the_configuration() {
        let mut highs = input();
        highs.config = highs.config.with_backend(SolverBackend::Highs);
        let orchestrator = SweepOrchestrator::new(highs).unwrap();
        assert_eq!(orchestrator.solver_name(), "HiGHS");

        let mut cbc = input();
        cbc.config = cbc.config.with_backend(SolverBackend::CoinCbc);
        let created = SweepOrchestrator::new(cbc);
        if cfg!(feature = "cbc") {
            assert_eq!(created.unwrap().solver_name(), "COIN-OR CBC");
        } else {
            assert!(matches!(
                created,
                Err(PlanningError::SolverFailure(SolverError::SolverNotAvailable(_)))
            ));
        }
    }

    fn scenarios() -> Vec<Scenario> {
        vec![
            Scenario::new("ok").with_days("A", 1).with_days("B", 1),
            Scenario::new("too many").with_days("A", 6).with_days("B", 1),
            Scenario::new("also ok").with_days("A", 0).with_days("B", 2),
        ]
    }

    #[test]
    fn time_limit_with_incumbent_is_timed_out() {
        let solver = ScriptedSolver::new(|problem| {
            let mut solution = Solution::new(SolutionStatus::TimeLimit, "limit");
            solution.variable_values = vec![0.0; problem.num_variables()];
            solution.quality = problem.assess(&solution.variable_values);
            solution.optimal_value = Some(0.0);
            solution.gap = Some(0.125);
            Ok(solution)
        });
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input()), solver.clone());

        let report = orchestrator.run(&[idle()]);
        let result = &report.results[0];
        assert_eq!(result.status, ScenarioStatus::TimedOut);
        assert!(result.message.as_deref().unwrap().contains("12.50%"));
        assert!(result.sensitivity.is_empty());
        assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn time_limit_without_incumbent_fails() {
        let solver =
            ScriptedSolver::new(|_| Ok(Solution::new(SolutionStatus::TimeLimit, "limit")));
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input()), solver);

        let report = orchestrator.run(&scenarios()[..1]);
        assert_eq!(report.results[0].status, ScenarioStatus::Failed);
    }

    #[test]
    fn solver_errors_stay_local_to_their_scenario() {
        let solver = ScriptedSolver::new(|_| {
            Err(SolverError::ExecutionFailed("out of memory".to_string()))
        });
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input()), solver.clone());

        let report = orchestrator.run(&scenarios());
        let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ScenarioStatus::Failed,
                ScenarioStatus::Rejected,
                ScenarioStatus::Failed
            ]
        );
        assert!(report.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("out of memory"));
        // the rejected scenario never reaches the solver
        assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backends_without_duals_still_solve() {
        let solver = ScriptedSolver::new(all_zero);
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input()), solver);

        let report = orchestrator.run(&[idle()]);
        let result = &report.results[0];
        assert_eq!(result.status, ScenarioStatus::Solved);
        assert!(result.sensitivity.is_empty());
        assert!(result
            .message
            .as_deref()
            .unwrap()
            .starts_with("sensitivity unavailable"));
    }

    #[test]
    fn integrality_noise_from_the_solver_is_tolerated() {
        let solver = ScriptedSolver::new(|problem| {
            let values = vec![9e-7; problem.num_variables()];
            let quality = problem.assess(&values);
            Ok(Solution::optimal(0.0, values).with_quality(quality))
        });
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input()), solver);

        let report = orchestrator.run(&[idle()]);
        let result = &report.results[0];
        assert_eq!(result.status, ScenarioStatus::Solved);
        assert_eq!(result.summary.total_occupancy, 0);
    }

    #[test]
    fn cancelled_scenarios_skip_the_solver() {
        let solver = ScriptedSolver::new(|_| Err(SolverError::ExecutionFailed("boom".into())));
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input()), solver.clone());

        let plan = SweepPlan::new(scenarios());
        plan.token(0).unwrap().cancel();
        let report = orchestrator.run_plan(&plan);

        assert_eq!(report.results[0].status, ScenarioStatus::Cancelled);
        assert_eq!(report.results[2].status, ScenarioStatus::Failed);
        assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_sweep_keeps_input_order() {
        let solver = ScriptedSolver::new(all_zero);
        let mut input = input();
        input.config.max_workers = 3;
        let orchestrator = SweepOrchestrator::with_solver(Arc::new(input), solver);

        let (tx, mut rx) = mpsc::channel(8);
        let report = orchestrator
            .run_plan_concurrent(&SweepPlan::new(scenarios()), Some(tx))
            .await;

        let names: Vec<_> = report.results.iter().map(|r| r.scenario.name.as_str()).collect();
        assert_eq!(names, vec!["ok", "too many", "also ok"]);
        assert_eq!(report.results[1].status, ScenarioStatus::Rejected);

        let mut streamed = 0;
        while rx.recv().await.is_some() {
            streamed += 1;
        }
        assert_eq!(streamed, 3);
    }
}
