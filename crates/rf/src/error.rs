use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("propagation service is already running")]
    AlreadyRunning,

    #[error("propagation service task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, PropagationError>;
