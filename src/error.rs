//! Error types for configuration, the hosted store, and the generation API.

/// Crate-wide result alias for application flow.
pub type Result<T> = anyhow::Result<T>;

/// Startup configuration errors. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

/// Errors from the hosted ephemerides store.
///
/// The read path recovers from all of these by falling back to the static
/// table; the write path records them as a per-day batch status.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store returned no row for an insert")]
    EmptyInsert,
}

/// Errors from the text-generation API.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion rejected ({status}): {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode completion response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("completion response contained no choices")]
    EmptyCompletion,
}

/// Generated text that failed validation before persistence.
#[derive(Debug, thiserror::Error)]
#[error("generated text failed validation: {0}")]
pub struct InvalidGeneration(pub String);
