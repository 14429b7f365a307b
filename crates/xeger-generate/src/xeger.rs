use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use tracing::{debug, trace};
use xeger_core::ElementTree;

use crate::confound;
use crate::dissect::{Dissection, Skipped, dissect};
use crate::emit;
use crate::errors::PatternError;
use crate::options::XegerOptions;
use crate::oracle::Oracle;
use crate::recognizer::{Recognizer, SyntaxRecognizer};

/// Generates strings from a pattern and verifies them against it.
///
/// A confounded facade emits from the negated tree and accepts candidates
/// the pattern rejects. Each call is an independent attempt; nothing about
/// a facade changes after construction.
#[derive(Debug, Clone)]
pub struct Xeger {
    pattern: String,
    tree: ElementTree,
    oracle: Arc<Oracle>,
    options: XegerOptions,
    confounded: bool,
    skipped: Vec<Skipped>,
}

impl Xeger {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Self::with_options(pattern, XegerOptions::default())
    }

    pub fn with_options(pattern: &str, options: XegerOptions) -> Result<Self, PatternError> {
        Self::with_recognizer(pattern, options, &SyntaxRecognizer)
    }

    /// Builds a facade using `recognizer` in place of the default tokenizer.
    pub fn with_recognizer(
        pattern: &str,
        options: XegerOptions,
        recognizer: &dyn Recognizer,
    ) -> Result<Self, PatternError> {
        let oracle = Oracle::compile(pattern)?;
        let Dissection { tree, skipped } = dissect(pattern, recognizer)?;
        debug!(
            pattern,
            nodes = tree.node_count(),
            groups = tree.group_count(),
            skipped = skipped.len(),
            "pattern dissected"
        );
        Ok(Self {
            pattern: pattern.to_string(),
            tree,
            oracle: Arc::new(oracle),
            options,
            confounded: false,
            skipped,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn is_confounded(&self) -> bool {
        self.confounded
    }

    /// Constructs dropped because their alternation branch was unsupported.
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// Whether `text` is what this facade is meant to produce: a match for a
    /// plain facade, a mismatch for a confounded one.
    pub fn matches(&self, text: &str) -> bool {
        self.oracle.is_match(text) != self.confounded
    }

    /// One unchecked emission.
    pub fn emit(&self, rng: &mut dyn RngCore) -> String {
        emit::emit(&self.tree, &self.options, rng)
    }

    /// Emits until a candidate passes [`Xeger::matches`], using the
    /// configured attempt budget.
    pub fn emit_checked(&self, rng: &mut dyn RngCore) -> Option<String> {
        self.emit_checked_with(rng, self.options.attempts)
    }

    pub fn emit_checked_with(&self, rng: &mut dyn RngCore, attempts: u32) -> Option<String> {
        for attempt in 0..attempts {
            let candidate = self.emit(rng);
            if self.matches(&candidate) {
                return Some(candidate);
            }
            trace!(attempt, candidate = %candidate, "candidate rejected");
        }
        debug!(pattern = %self.pattern, attempts, confounded = self.confounded, "attempts exhausted");
        None
    }

    /// Collects `size` distinct checked strings within `attempts` calls to
    /// [`Xeger::emit_checked`].
    pub fn emit_set(
        &self,
        size: usize,
        rng: &mut dyn RngCore,
        attempts: u32,
    ) -> Option<BTreeSet<String>> {
        let mut result = BTreeSet::new();
        for _ in 0..attempts {
            if result.len() >= size {
                break;
            }
            if let Some(text) = self.emit_checked(rng) {
                result.insert(text);
            }
        }
        (result.len() == size).then_some(result)
    }

    /// Like [`Xeger::emit_set`], but duplicates count toward `size`.
    pub fn emit_list(&self, size: usize, rng: &mut dyn RngCore, attempts: u32) -> Option<Vec<String>> {
        let mut result = Vec::with_capacity(size);
        for _ in 0..attempts {
            if result.len() >= size {
                break;
            }
            if let Some(text) = self.emit_checked(rng) {
                result.push(text);
            }
        }
        (result.len() == size).then_some(result)
    }

    /// A facade over the confounded tree that shares this one's matcher.
    ///
    /// `None` when nothing in the tree can be confounded, or when this facade
    /// is already confounded.
    pub fn confound(&self) -> Option<Xeger> {
        if self.confounded {
            return None;
        }
        let tree = confound::confound(&self.tree)?;
        Some(Xeger {
            pattern: self.pattern.clone(),
            tree,
            oracle: Arc::clone(&self.oracle),
            options: self.options,
            confounded: true,
            skipped: self.skipped.clone(),
        })
    }
}

impl fmt::Display for Xeger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.confounded {
            f.write_str("!")?;
        }
        write!(f, "/{}/ -> {}", self.pattern, self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn display_marks_confounded_facades() {
        let xeger = Xeger::new("a{3}").unwrap();
        assert_eq!(xeger.to_string(), "/a{3}/ -> a{3}");
        let confounded = xeger.confound().unwrap();
        assert_eq!(confounded.to_string(), "!/a{3}/ -> a{0,2}");
        assert!(confounded.confound().is_none());
    }

    #[test]
    fn matches_inverts_for_confounded_facades() {
        let xeger = Xeger::new("[0-9]+").unwrap();
        let confounded = xeger.confound().unwrap();
        assert!(xeger.matches("123"));
        assert!(!confounded.matches("123"));
        assert!(confounded.matches("12a"));
    }

    #[test]
    fn emit_list_allows_duplicates_and_emit_set_does_not() {
        let xeger = Xeger::new("a|b").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let list = xeger.emit_list(6, &mut rng, 6).unwrap();
        assert_eq!(list.len(), 6);
        assert!(list.iter().all(|text| text == "a" || text == "b"));
        assert!(xeger.emit_set(3, &mut rng, 50).is_none());
        assert_eq!(xeger.emit_set(2, &mut rng, 50).unwrap().len(), 2);
    }

    #[test]
    fn impossible_patterns_exhaust_attempts() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let inner = Xeger::new("a\\Bb").unwrap();
        assert_eq!(inner.emit_checked_with(&mut rng, 1).as_deref(), Some("ab"));
        // A word boundary between two word characters can never hold.
        let never = Xeger::new("x\\by").unwrap();
        assert_eq!(never.emit_checked_with(&mut rng, 10), None);
    }

    #[test]
    fn word_boundary_forms_are_zero_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for pattern in ["\\b{start}word\\b{end}", "\\<word\\>"] {
            let xeger = Xeger::new(pattern).unwrap();
            assert_eq!(xeger.tree().to_string(), "word");
            assert_eq!(xeger.emit_checked(&mut rng).as_deref(), Some("word"));
        }
        let never = Xeger::new("a\\<b").unwrap();
        assert_eq!(never.emit_checked_with(&mut rng, 5), None);
    }
}
