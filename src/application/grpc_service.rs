use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use super::mappers::{self, deskplan_proto as proto};
use super::orchestrator::SweepOrchestrator;
use super::preflight::check_scenarios;
use crate::domain::{PlanningInput, ScenarioResult, SolverBackend};
use crate::solver::SolverFactory;

/// gRPC service implementation
pub struct GrpcDeskPlannerService;

impl GrpcDeskPlannerService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrpcDeskPlannerService {
    fn default() -> Self {
        Self::new()
    }
}

/// Map and validate a request into an orchestrator over its snapshot
fn orchestrator_for(request: proto::SweepRequest) -> Result<SweepOrchestrator, Status> {
    let input = mappers::proto_to_domain_input(request).map_err(|e| *e)?;
    input
        .validate()
        .map_err(|e| Status::invalid_argument(e.to_string()))?;
    SweepOrchestrator::new(input).map_err(|e| Status::failed_precondition(e.to_string()))
}

#[tonic::async_trait]
impl proto::desk_planner_server::DeskPlanner for GrpcDeskPlannerService {
    async fn run_sweep(
        &self,
        request: Request<proto::SweepRequest>,
    ) -> Result<Response<proto::SweepReport>, Status> {
        let request = request.into_inner();
        let concurrent = request.concurrent;
        let orchestrator = orchestrator_for(request)?;
        let plan = orchestrator.plan();
        let solver = orchestrator.solver_name().to_string();
        info!(scenarios = plan.len(), concurrent, %solver, "RunSweep");

        let report = if concurrent {
            orchestrator.run_plan_concurrent(&plan, None).await
        } else {
            tokio::task::spawn_blocking(move || orchestrator.run_plan(&plan))
                .await
                .map_err(|e| Status::internal(format!("Sweep worker failed: {}", e)))?
        };

        Ok(Response::new(proto::SweepReport {
            results: report
                .results
                .into_iter()
                .map(mappers::domain_to_proto_result)
                .collect(),
            solver,
        }))
    }

    type RunSweepStreamStream = ReceiverStream<Result<proto::ScenarioResult, Status>>;

    async fn run_sweep_stream(
        &self,
        request: Request<proto::SweepRequest>,
    ) -> Result<Response<Self::RunSweepStreamStream>, Status> {
        let orchestrator = orchestrator_for(request.into_inner())?;
        let plan = orchestrator.plan();
        let tokens: Vec<_> = plan.entries.iter().map(|e| e.token.clone()).collect();
        info!(scenarios = plan.len(), "RunSweepStream");

        let (progress_tx, mut progress_rx) = mpsc::channel::<ScenarioResult>(16);
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            orchestrator.run_plan_concurrent(&plan, Some(progress_tx)).await;
        });

        tokio::spawn(async move {
            while let Some(result) = progress_rx.recv().await {
                let message = mappers::domain_to_proto_result(result);
                if tx.send(Ok(message)).await.is_err() {
                    warn!("client went away, cancelling remaining scenarios");
                    for token in &tokens {
                        token.cancel();
                    }
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn validate_input(
        &self,
        request: Request<proto::SweepRequest>,
    ) -> Result<Response<proto::ValidationResult>, Status> {
        let input: PlanningInput =
            mappers::proto_to_domain_input(request.into_inner()).map_err(|e| *e)?;

        let errors = match input.validate() {
            Ok(()) => Vec::new(),
            Err(e) => e.reasons,
        };
        let scenarios: Vec<_> = check_scenarios(&input)
            .into_iter()
            .map(mappers::domain_to_proto_check)
            .collect();

        Ok(Response::new(proto::ValidationResult {
            is_valid: errors.is_empty() && scenarios.iter().all(|s| s.is_valid),
            errors,
            scenarios,
            total_capacity: input.layout.total_capacity(),
        }))
    }

    async fn get_available_solvers(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::AvailableSolvers>, Status> {
        let available = SolverFactory::available_backends();
        let solvers = vec![
            proto::SolverInfo {
                name: "HiGHS".to_string(),
                available: available.contains(&SolverBackend::Highs),
                supports_mip: true,
                supports_duals: true,
                capabilities: vec![
                    "Mixed-Integer Programming".to_string(),
                    "Fixed-relaxation sensitivity".to_string(),
                    "Presolve".to_string(),
                ],
            },
            proto::SolverInfo {
                name: "COIN-OR CBC".to_string(),
                available: available.contains(&SolverBackend::CoinCbc),
                supports_mip: true,
                supports_duals: false,
                capabilities: vec![
                    "Mixed-Integer Programming".to_string(),
                    "Branch and Cut".to_string(),
                ],
            },
        ];

        Ok(Response::new(proto::AvailableSolvers { solvers }))
    }
}
