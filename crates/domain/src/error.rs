use thiserror::Error;

/// Domain-level error taxonomy.
///
/// Mirrors the five-way split the core is specified against: configuration
/// problems are surfaced to a caller or end an Action in `error`; transient
/// I/O is retried (MQTT) or reported (single-shot ops); protocol violations
/// drop the offending message; timeouts resolve through the branch
/// tie-break; fatal errors are unrecoverable within this process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transient I/O error: {0}")]
    TransientIo(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("timed out waiting for: {0}")]
    Timeout(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
