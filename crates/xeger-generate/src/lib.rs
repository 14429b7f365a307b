//! Pattern-driven string synthesis.
//!
//! Turns a pattern into an element tree, emits random strings from it,
//! verifies them against the pattern, and derives confounded trees whose
//! output the pattern is expected to reject. [`Xeger`] ties these together.

pub mod confound;
pub mod dissect;
pub mod emit;
pub mod errors;
pub mod options;
pub mod oracle;
pub mod recognizer;
pub mod samples;
pub mod xeger;

pub use dissect::{Dissection, Dissector, Skipped, dissect};
pub use errors::PatternError;
pub use options::XegerOptions;
pub use oracle::Oracle;
pub use recognizer::{GroupKind, PatternEvents, Recognizer, SyntaxRecognizer};
pub use samples::{PatternSamples, SampleRequest, sample_pattern, synthesize};
pub use xeger::Xeger;
