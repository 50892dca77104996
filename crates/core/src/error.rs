#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Malformed signal: {0}")]
    MalformedSignal(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
