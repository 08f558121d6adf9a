// Domain layer: office model, scenarios, results and the solver abstraction
pub mod domain;

// Application layer: model building, sweep orchestration, sensitivity and aggregation
pub mod application;

// Infrastructure layer: External concerns (gRPC, server)
#[cfg(feature = "server")]
pub mod infrastructure;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Re-export commonly used types
pub use domain::{
    AllocationSolution, ConfigError, Day, Layout, ModelConfig, ObjectiveMode, PlanningError,
    PlanningInput, Scenario, ScenarioResult, ScenarioStatus, SensitivityRecord, SolverBackend,
    SolverError, SolverService, SweepReport, Team, TeamRegistry, ValidationError,
};

pub use application::{ModelBuilder, ResultAggregator, SweepOrchestrator, SweepPlan};

#[cfg(feature = "server")]
pub use infrastructure::{start_server, ServerConfig};

#[cfg(feature = "cbc")]
pub use solver::CoinCbcSolver;
pub use solver::{HighsSolver, SolverFactory};
