use thiserror::Error;

/// Errors raised while turning a pattern into an element tree.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The recognizer or the verification matcher rejected the pattern.
    #[error("invalid pattern: {0}")]
    Invalid(String),
    /// The pattern uses a construct the element model has no mapping for.
    #[error("unsupported construct `{construct}` at offset {offset}")]
    Unsupported { construct: String, offset: usize },
    /// The recognizer produced an inconsistent event sequence.
    #[error("malformed pattern walk: {0}")]
    Walk(String),
    #[error(transparent)]
    Core(#[from] xeger_core::Error),
}

impl PatternError {
    /// True when the pattern is valid but cannot be sampled by this engine,
    /// so callers should fall back to another generation strategy.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, PatternError::Unsupported { .. })
    }
}
