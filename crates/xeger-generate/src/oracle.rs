use tracing::{debug, warn};

use crate::errors::PatternError;

/// Whole-string matcher for the source pattern.
///
/// Patterns the `regex` crate accepts use it directly. Anything it rejects
/// (backreferences, mostly) is retried with the backtracking `fancy-regex`.
#[derive(Debug, Clone)]
pub enum Oracle {
    Linear(regex::Regex),
    Backtracking(fancy_regex::Regex),
}

impl Oracle {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let anchored = format!("^(?:{pattern})$");
        match regex::Regex::new(&anchored) {
            Ok(regex) => Ok(Oracle::Linear(regex)),
            Err(linear_err) => {
                debug!(pattern, error = %linear_err, "falling back to backtracking matcher");
                fancy_regex::Regex::new(&anchored)
                    .map(Oracle::Backtracking)
                    .map_err(|err| PatternError::Invalid(err.to_string()))
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Oracle::Linear(regex) => regex.is_match(text),
            Oracle::Backtracking(regex) => regex.is_match(text).unwrap_or_else(|err| {
                warn!(error = %err, "matcher failed; treating candidate as a mismatch");
                false
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_strings_only() {
        let oracle = Oracle::compile("ab|cd").unwrap();
        assert!(matches!(oracle, Oracle::Linear(_)));
        assert!(oracle.is_match("ab"));
        assert!(oracle.is_match("cd"));
        assert!(!oracle.is_match("abcd"));
        assert!(!oracle.is_match("xab"));
    }

    #[test]
    fn backreferences_use_the_backtracking_matcher() {
        let oracle = Oracle::compile("(foo)\\1").unwrap();
        assert!(matches!(oracle, Oracle::Backtracking(_)));
        assert!(oracle.is_match("foofoo"));
        assert!(!oracle.is_match("foooof"));
    }

    #[test]
    fn rejects_broken_patterns() {
        assert!(matches!(
            Oracle::compile("(unclosed"),
            Err(PatternError::Invalid(_))
        ));
    }
}
