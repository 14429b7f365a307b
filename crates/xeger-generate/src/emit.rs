//! Random emission over element trees.

use rand::{Rng, RngCore};
use tracing::trace;
use xeger_core::{
    CharSet, Element, ElementId, ElementTree, FALLBACK_CHAR, PRINTABLE_MAX, PRINTABLE_MIN, Repeat,
    Selection,
};

use crate::options::XegerOptions;

/// Maximum values at or above this are treated as unbounded.
const PRACTICALLY_UNBOUNDED: u32 = 1 << 16;

/// Emits one string from `tree`.
///
/// Never fails: empty picks degrade to [`FALLBACK_CHAR`] and backreferences
/// to groups that have not emitted yet produce nothing.
pub fn emit(tree: &ElementTree, options: &XegerOptions, rng: &mut dyn RngCore) -> String {
    let mut pass = Pass {
        tree,
        options,
        captures: vec![None; tree.group_count()],
    };
    let mut out = String::new();
    pass.element(tree.root(), &mut out, rng);
    out
}

/// Number of repetitions to emit for `repeat`.
///
/// Unset bounds emit once. Unbounded and very large maxima are capped to the
/// windows in `options`, so `{5,}` emits at most `5 + unbounded_window`.
pub fn repeat_count(repeat: Option<Repeat>, options: &XegerOptions, rng: &mut dyn RngCore) -> u32 {
    let Some(Repeat { min, max }) = repeat else {
        return 1;
    };
    let max = max.filter(|max| *max < PRACTICALLY_UNBOUNDED);
    match max {
        None if min > 0 => min.saturating_add(rng.random_range(0..=options.unbounded_window)),
        None => rng.random_range(0..=options.bounded_window),
        Some(max) if min == max => min,
        Some(max) if min < max => {
            let spread = options.bounded_window.min(max - min);
            min + rng.random_range(0..=spread)
        }
        Some(_) => 1,
    }
}

/// State for a single emission pass.
struct Pass<'a> {
    tree: &'a ElementTree,
    options: &'a XegerOptions,
    /// Text each capture group emitted most recently, by index - 1.
    captures: Vec<Option<String>>,
}

impl Pass<'_> {
    fn element(&mut self, id: ElementId, out: &mut String, rng: &mut dyn RngCore) {
        let tree = self.tree;
        let Some(element) = tree.get(id) else {
            return;
        };
        match element {
            Element::Empty => {}
            Element::Char { ch, negated: false } => out.push(*ch),
            Element::Char { ch, negated: true } => out.push(other_printable(*ch, rng)),
            Element::Str { text, .. } => out.push_str(text),
            Element::Range {
                start,
                end,
                negated: false,
            } => out.push(range_char(*start, *end, rng)),
            Element::Range {
                start,
                end,
                negated: true,
            } => {
                let mut outside = CharSet::printable();
                outside.remove_range(*start, *end);
                out.push(outside.pick(rng).unwrap_or(FALLBACK_CHAR));
            }
            Element::Class {
                set,
                negated,
                repeat,
            } => {
                let source = if *negated {
                    printable_complement(set)
                } else {
                    set.clone()
                };
                for _ in 0..repeat_count(*repeat, self.options, rng) {
                    out.push(source.pick(rng).unwrap_or(FALLBACK_CHAR));
                }
            }
            Element::Shorthand { kind, .. } => {
                out.push(kind.alphabet().pick(rng).unwrap_or(FALLBACK_CHAR));
            }
            Element::Sequence {
                children,
                selection: Selection::All,
            } => {
                for child in children {
                    self.element(*child, out, rng);
                }
            }
            Element::Sequence {
                children,
                selection: Selection::One,
            } => {
                if !children.is_empty() {
                    let pick = children[rng.random_range(0..children.len())];
                    self.element(pick, out, rng);
                }
            }
            Element::Capture { index, children } => {
                let mut scratch = String::new();
                for child in children {
                    self.element(*child, &mut scratch, rng);
                }
                out.push_str(&scratch);
                if let Some(slot) = index.checked_sub(1).and_then(|idx| self.captures.get_mut(idx)) {
                    *slot = Some(scratch);
                }
            }
            Element::Backref { group } => {
                let recorded = group
                    .checked_sub(1)
                    .and_then(|idx| self.captures.get(idx))
                    .and_then(Option::as_deref);
                match recorded {
                    Some(text) => out.push_str(text),
                    None => trace!(group = *group, "backreference to a group that has not emitted"),
                }
            }
            Element::Bounds { child, repeat } => {
                for _ in 0..repeat_count(Some(*repeat), self.options, rng) {
                    self.element(*child, out, rng);
                }
            }
        }
    }
}

/// A printable character other than `ch`.
fn other_printable(ch: char, rng: &mut dyn RngCore) -> char {
    let mut picked = rng.random_range(PRINTABLE_MIN..=PRINTABLE_MAX);
    if picked == ch as u32 {
        picked = if picked > PRINTABLE_MIN {
            picked - 1
        } else {
            picked + 1
        };
    }
    char::from_u32(picked).unwrap_or(FALLBACK_CHAR)
}

/// One character from `start..=end`; a reversed or empty span yields `start`.
fn range_char(start: char, end: char, rng: &mut dyn RngCore) -> char {
    let (low, high) = (start as u32, end as u32);
    if high <= low {
        return start;
    }
    char::from_u32(low + rng.random_range(0..=high - low)).unwrap_or(start)
}

/// Printable characters not in `set`, with the complement taken over at
/// least the printable window.
fn printable_complement(set: &CharSet) -> CharSet {
    let mut universe = set.clone();
    universe.widen(PRINTABLE_MAX);
    universe.complement().intersection(&CharSet::printable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use xeger_core::Arena;

    fn single(element: Element) -> ElementTree {
        let mut arena = Arena::new();
        let root = arena.alloc(element);
        ElementTree::new(arena, root, 0)
    }

    #[test]
    fn repeat_count_follows_the_windows() {
        let options = XegerOptions::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            assert_eq!(repeat_count(None, &options, &mut rng), 1);
            assert_eq!(repeat_count(Some(Repeat::exact(3)), &options, &mut rng), 3);
            let unbounded = repeat_count(Some(Repeat::at_least(5)), &options, &mut rng);
            assert!((5..=17).contains(&unbounded));
            let huge = repeat_count(Some(Repeat::between(2, u32::MAX)), &options, &mut rng);
            assert!((2..=14).contains(&huge));
            let bounded = repeat_count(Some(Repeat::between(1, 100)), &options, &mut rng);
            assert!((1..=17).contains(&bounded));
            let star = repeat_count(Some(Repeat::at_least(0)), &options, &mut rng);
            assert!(star <= 16);
        }
    }

    #[test]
    fn bounded_repeat_reaches_both_ends() {
        let options = XegerOptions::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let counts: Vec<u32> = (0..200)
            .map(|_| repeat_count(Some(Repeat::between(1, 2)), &options, &mut rng))
            .collect();
        assert!(counts.contains(&1));
        assert!(counts.contains(&2));
    }

    #[test]
    fn negated_char_never_emits_itself() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for ch in [' ', 'a', '~'] {
            let tree = single(Element::Char { ch, negated: true });
            for _ in 0..100 {
                let text = emit(&tree, &XegerOptions::default(), &mut rng);
                let emitted = text.chars().next().unwrap();
                assert_ne!(emitted, ch);
                assert!((' '..='~').contains(&emitted));
            }
        }
    }

    #[test]
    fn reversed_range_emits_its_start() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = single(Element::Range {
            start: 'q',
            end: 'c',
            negated: false,
        });
        for _ in 0..20 {
            assert_eq!(emit(&tree, &XegerOptions::default(), &mut rng), "q");
        }
    }

    #[test]
    fn negated_full_class_falls_back() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let tree = single(Element::Class {
            set: CharSet::printable(),
            negated: true,
            repeat: Some(Repeat::exact(2)),
        });
        assert_eq!(
            emit(&tree, &XegerOptions::default(), &mut rng),
            format!("{FALLBACK_CHAR}{FALLBACK_CHAR}")
        );
    }

    #[test]
    fn backreference_before_its_group_emits_nothing() {
        let mut arena = Arena::new();
        let root = arena.alloc(Element::sequence());
        let backref = arena.alloc(Element::Backref { group: 1 });
        arena.push_child(root, backref).unwrap();
        let group = arena.alloc(Element::Capture {
            index: 1,
            children: Vec::new(),
        });
        arena.push_child(root, group).unwrap();
        let x = arena.alloc(Element::literal('x'));
        arena.push_child(group, x).unwrap();
        let tree = ElementTree::new(arena, root, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(emit(&tree, &XegerOptions::default(), &mut rng), "x");
    }
}
