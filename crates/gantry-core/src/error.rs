//! Error types for gantry-core

use thiserror::Error;

/// Core error type for Gantry
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Malformed variable key/value/scope or an invalid argument list
    #[error("[E001] Validation failed: {message}")]
    Validation { message: String },

    /// E002: A live lock already covers the requested target
    #[error("[E002] {target} is locked by user {owner}")]
    AlreadyLocked { target: String, owner: u64 },

    /// E003: Unknown stage/deploy/group id
    #[error("[E003] {entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    /// E004: A pending or running deploy already exists for the stage
    #[error("[E004] Stage {stage} already has an active deploy ({deploy})")]
    ConcurrentActiveDeploy { stage: u64, deploy: u64 },

    /// E005: Cyclic or dangling pipeline edge detected at write time
    #[error("[E005] Invalid pipeline configuration: {message}")]
    Configuration { message: String },

    /// E006: Failed to parse a configuration file
    #[error("[E006] Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// E007: IO error while reading a configuration file
    #[error("[E007] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E008: JSON serialization/deserialization error
    #[error("[E008] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Validation`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`CoreError::Configuration`] with a formatted message.
    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
