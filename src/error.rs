//! Error types for the interaction layer
//!
//! Only genuine failures live here. Rejected wizard input, stale selections,
//! timeouts and cancellations are ordinary outcomes and are modelled as
//! values by the components that produce them.

use thiserror::Error;

/// Errors surfaced by the interaction layer
#[derive(Debug, Error)]
pub enum InteractionError {
    /// An upstream event could not be projected into an inbound event
    #[error("malformed upstream event: {0}")]
    MalformedEvent(String),

    /// Configuration values failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file is not valid TOML for [`crate::InteractionConfig`]
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A draft was finalised before every required step completed
    #[error("draft is incomplete: missing {0}")]
    IncompleteDraft(&'static str),

    /// The store or the transport reported a failure
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] anyhow::Error),
}

/// Result alias used throughout the crate
pub type InteractionResult<T> = Result<T, InteractionError>;
