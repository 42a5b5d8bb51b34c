/// Shared error type used across all Acontext crates.
///
/// Maps onto the taxonomy in the design's error-handling section: each
/// variant here corresponds to one propagation rule (rollback, ack-no-retry,
/// nack-and-redeliver, etc) that callers switch on.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("lock contended: {0}")]
    LockContended(String),

    #[error("flush exhausted after {0} retries")]
    FlushExhausted(u32),

    #[error("tool rejected: {0}")]
    ToolReject(String),

    #[error("transient: {0}")]
    Transient(String),

    #[error("internal invariant violated: {0}")]
    FatalBug(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True for errors that should cause the MQ message to be NACKed
    /// (broker redelivers) rather than ACKed-with-log.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::LockContended(_))
    }

    /// True for errors that are permanent from the consumer's point of view
    /// (stale envelope, entity already gone) — ACK with log, no retry.
    pub fn is_permanent_drop(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
