use crate::state::Channel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MokeError {
    #[error("Chopper imbalance persisted for {attempts} attempts (low={low}, high={high})")]
    SampleImbalance {
        attempts: u64,
        low: usize,
        high: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{device} failure: {message}")]
    Collaborator { device: String, message: String },

    #[error("Channel {0:?} missing from sample batch")]
    ChannelMissing(Channel),

    #[error("Scan already reached its terminal state")]
    ScanFinished,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MokeError {
    /// Shorthand for collaborator failures raised by hardware adapters.
    pub fn collaborator(device: impl Into<String>, message: impl Into<String>) -> Self {
        MokeError::Collaborator {
            device: device.into(),
            message: message.into(),
        }
    }
}

pub type MokeResult<T> = Result<T, MokeError>;
