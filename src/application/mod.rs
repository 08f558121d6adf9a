// Application layer: scenario pipeline and the optional gRPC surface

pub mod aggregator;
pub mod diagnostics;
pub mod model_builder;
pub mod orchestrator;
pub mod preflight;
pub mod sensitivity;

#[cfg(feature = "server")]
pub mod grpc_service;
#[cfg(feature = "server")]
pub mod mappers;

pub use aggregator::ResultAggregator;
pub use diagnostics::InfeasibilityDiagnoser;
pub use model_builder::{ConstraintKey, ModelBuilder, PairBound, ScenarioModel, VariableKey};
pub use orchestrator::{PlannedScenario, SweepOrchestrator, SweepPlan};
pub use preflight::{check_scenarios, ScenarioCheck};
pub use sensitivity::SensitivityExtractor;

#[cfg(feature = "server")]
pub use grpc_service::GrpcDeskPlannerService;
