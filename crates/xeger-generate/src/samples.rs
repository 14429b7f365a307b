//! Valid and invalid sample values for pattern-constrained fields.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PatternError;
use crate::xeger::Xeger;

/// What a caller wants sampled from one pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRequest {
    /// Strings that must match the pattern.
    pub valid: usize,
    /// Strings that must not match the pattern.
    pub invalid: usize,
    /// Inclusive length limits, in characters, applied to both kinds.
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    /// Reject repeats within each kind.
    pub distinct: bool,
    /// Checked emissions allowed per requested sample.
    pub attempts_per_sample: u32,
}

impl Default for SampleRequest {
    fn default() -> Self {
        Self {
            valid: 5,
            invalid: 0,
            min_len: None,
            max_len: None,
            distinct: false,
            attempts_per_sample: 5,
        }
    }
}

impl SampleRequest {
    fn fits(&self, text: &str) -> bool {
        let len = text.chars().count();
        self.min_len.is_none_or(|min| len >= min) && self.max_len.is_none_or(|max| len <= max)
    }
}

/// Samples produced for one pattern. Either list may come back shorter than
/// requested; callers fall back to other strategies for the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSamples {
    pub pattern: String,
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    /// False when no confounded variant exists for the pattern.
    pub confoundable: bool,
}

impl PatternSamples {
    pub fn is_complete(&self, request: &SampleRequest) -> bool {
        self.valid.len() == request.valid && self.invalid.len() == request.invalid
    }
}

/// Builds a facade for `pattern` and samples it.
pub fn sample_pattern(
    pattern: &str,
    request: &SampleRequest,
    rng: &mut dyn RngCore,
) -> Result<PatternSamples, PatternError> {
    let xeger = Xeger::new(pattern)?;
    Ok(synthesize(&xeger, request, rng))
}

/// Samples valid strings from `xeger` and invalid ones from its confounded
/// variant, each verified by the facade that produced it.
pub fn synthesize(xeger: &Xeger, request: &SampleRequest, rng: &mut dyn RngCore) -> PatternSamples {
    let valid = collect(xeger, request.valid, request, rng);
    let confounded = if request.invalid > 0 {
        xeger.confound()
    } else {
        None
    };
    let invalid = match &confounded {
        Some(negated) => collect(negated, request.invalid, request, rng),
        None => Vec::new(),
    };
    let samples = PatternSamples {
        pattern: xeger.pattern().to_string(),
        valid,
        invalid,
        confoundable: confounded.is_some(),
    };
    if !samples.is_complete(request) {
        debug!(
            pattern = %samples.pattern,
            valid = samples.valid.len(),
            invalid = samples.invalid.len(),
            "sample request only partially satisfied"
        );
    }
    samples
}

fn collect(
    xeger: &Xeger,
    wanted: usize,
    request: &SampleRequest,
    rng: &mut dyn RngCore,
) -> Vec<String> {
    let mut found: Vec<String> = Vec::with_capacity(wanted);
    let budget = wanted.saturating_mul(request.attempts_per_sample as usize);
    for _ in 0..budget {
        if found.len() >= wanted {
            break;
        }
        let Some(text) = xeger.emit_checked(rng) else {
            continue;
        };
        if !request.fits(&text) || (request.distinct && found.contains(&text)) {
            continue;
        }
        found.push(text);
    }
    found
}
