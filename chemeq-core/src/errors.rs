use num_dual::linalg::LinAlgError;
use thiserror::Error;

/// Error type for improperly defined systems and convergence problems.
#[derive(Error, Debug)]
pub enum ChemeqError {
    #[error("{0}")]
    Error(String),
    #[error("`{0}` did not converge within the maximum number of iterations.")]
    NotConverged(String),
    #[error("`{0}` encountered illegal values during the iteration.")]
    IterationFailed(String),
    #[error("Unknown species `{0}`.")]
    UnknownSpecies(String),
    #[error("Unknown element `{0}` in the formula of species `{1}`.")]
    UnknownElement(String, String),
    #[error("Species `{0}` is defined more than once in phase `{1}`.")]
    DuplicateSpecies(String, String),
    #[error("Phase `{0}` contains no species.")]
    EmptyPhase(String),
    #[error("Phase `{0}` has no activity model assigned.")]
    MissingActivityModel(String),
    #[error("Invalid input in {0}: {1} = {2}.")]
    InvalidInput(String, String, f64),
    #[error("Undetermined problem: {0}.")]
    UndeterminedProblem(String),
    #[error("Infeasible conditions: {0}.")]
    Infeasible(String),
    #[error("The system has no {0} phase.")]
    MissingPhase(String),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    LinAlgError(#[from] LinAlgError),
}

/// Convenience type for `Result<T, ChemeqError>`.
pub type ChemeqResult<T> = Result<T, ChemeqError>;
