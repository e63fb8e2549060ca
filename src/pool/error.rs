use tokio::task::JoinError;

use crate::types::Range;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool is full: {capacity} tasks already in flight")]
    Full { capacity: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("Task computing range {range} panicked: {message}")]
    Panicked { range: Range, message: String },
    #[error("Task computing range {range} was cancelled")]
    Cancelled { range: Range },
}

impl TaskError {
    pub fn from_join(range: Range, err: JoinError) -> Self {
        if !err.is_panic() {
            return Self::Cancelled { range };
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        Self::Panicked { range, message }
    }

    pub fn range(&self) -> Range {
        match self {
            Self::Panicked { range, .. } | Self::Cancelled { range } => *range,
        }
    }
}
