//! Error types for the animation engine.
//!
//! None of these reach the user: the host logs them and leaves the affected
//! effect blank.

use thiserror::Error;

use crate::lifecycle::LoopId;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to schedule {loop_id}: {reason}")]
    Schedule { loop_id: LoopId, reason: String },

    #[error("container rejected rain column {index}: {reason}")]
    Container { index: usize, reason: String },

    #[error("viewport error: {0}")]
    Viewport(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
