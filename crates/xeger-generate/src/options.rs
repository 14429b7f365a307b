use serde::{Deserialize, Serialize};

/// Tuning for emission and checked sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XegerOptions {
    /// Attempts used by `emit_checked` when the caller does not pass one.
    pub attempts: u32,
    /// Extra repetitions allowed past `min` for unbounded quantifiers.
    pub unbounded_window: u32,
    /// Cap on the spread sampled between `min` and `max` for bounded ones.
    pub bounded_window: u32,
}

impl Default for XegerOptions {
    fn default() -> Self {
        Self {
            attempts: 15,
            unbounded_window: 12,
            bounded_window: 16,
        }
    }
}
