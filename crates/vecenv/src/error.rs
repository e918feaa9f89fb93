use environment::EnvironmentError;
use thiserror::Error;

/// Why one worker's slot in a batch holds no result.
#[derive(Error, Debug)]
pub enum WorkerFailure {
    #[error("worker {worker} is gone; its channel is disconnected")]
    Disconnected { worker: usize },
    #[error("worker {worker} failed: {source}")]
    Environment {
        worker: usize,
        #[source]
        source: EnvironmentError,
    },
    #[error("worker {worker} answered {got} where {expected} was expected")]
    UnexpectedReply {
        worker: usize,
        expected: &'static str,
        got: &'static str,
    },
}

impl WorkerFailure {
    #[must_use]
    pub fn worker(&self) -> usize {
        match self {
            WorkerFailure::Disconnected { worker }
            | WorkerFailure::Environment { worker, .. }
            | WorkerFailure::UnexpectedReply { worker, .. } => *worker,
        }
    }
}

#[derive(Error, Debug)]
pub enum VecEnvError {
    /// `step_async`/`step_wait` called out of order.
    #[error("protocol sequence error: {0}")]
    ProtocolSequence(&'static str),
    #[error("expected one action per worker ({expected}), got {actual}")]
    ActionCount { expected: usize, actual: usize },
    #[error("invalid executor configuration: {0}")]
    InvalidConfig(String),
    #[error("executor has no workers")]
    NoWorkers,
    #[error("executor is closed")]
    Closed,
    #[error(transparent)]
    Worker(#[from] WorkerFailure),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
