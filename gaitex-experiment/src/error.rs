use thiserror::Error;

/// Fatal errors of the trial state machine.
///
/// Sink and vendor failures are deliberately absent: they are logged at the
/// boundary and never interrupt trial timing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    /// Invalid block sizing or timing; raised before the block starts.
    #[error("invalid block configuration: {0}")]
    Config(String),

    /// Trial index ran past the generated sequence. A controller bug, not a
    /// runtime condition to recover from.
    #[error("trial sequence exhausted: index {index} of {len}")]
    SequenceExhausted { index: usize, len: usize },
}
