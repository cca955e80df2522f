use std::time::Duration;

use uuid::Uuid;

use crate::engine::traits::EngineError;
use crate::store::traits::StoreError;

/// Precondition failures detected before any engine call is made.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("source code must not be empty")]
    EmptySourceCode,
    #[error("problem {0} not found")]
    ProblemNotFound(Uuid),
    #[error("no test cases available for problem {0}")]
    NoTestCasesAvailable(Uuid),
}

/// Everything a run/submit call can fail with. The façade is the only
/// place that turns these into user-visible messaging; there is no
/// internal retry.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("judge engine failure: {0}")]
    Engine(#[from] EngineError),
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
    #[error("polling exceeded the {budget:?} budget before all results were terminal")]
    PollTimeout { budget: Duration },
}
