use super::solver_service::SolverError;
use std::fmt;

/// Malformed or impossible inputs, detected before any solve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationError {
    pub reasons: Vec<String>,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    /// `Ok(())` when no reasons were collected
    pub fn check(reasons: Vec<String>) -> Result<(), ValidationError> {
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(Self { reasons })
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.reasons.join("; "))
    }
}

/// Errors raised while planning a scenario
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no feasible assignment exists for scenario '{0}'")]
    InfeasibleModel(String),

    #[error("solver failure: {0}")]
    SolverFailure(#[from] SolverError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures loading an input snapshot
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
