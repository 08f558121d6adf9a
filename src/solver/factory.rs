use crate::domain::{
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolverBackend,
};
use crate::solver::HighsSolver;
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver for a specific backend
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>> {
        match backend {
            SolverBackend::Auto | SolverBackend::Highs => Ok(Arc::new(HighsSolver::new())),
            #[cfg(feature = "cbc")]
            SolverBackend::CoinCbc => Ok(Arc::new(crate::solver::CoinCbcSolver::new())),
            #[cfg(not(feature = "cbc"))]
            SolverBackend::CoinCbc => Err(SolverError::SolverNotAvailable(
                "COIN-OR CBC support was not compiled in (enable the `cbc` feature)".to_string(),
            )),
        }
    }

    /// Backends usable in this build
    pub fn available_backends() -> Vec<SolverBackend> {
        let mut backends = vec![SolverBackend::Highs];
        if cfg!(feature = "cbc") {
            backends.push(SolverBackend::CoinCbc);
        }
        backends
    }
}
