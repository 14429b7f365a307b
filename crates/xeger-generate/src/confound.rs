//! Structural negation of element trees.
//!
//! Confounding rewrites the elements responsible for matching so that the
//! result very likely emits text the source pattern rejects. The result is
//! built in a layered arena over the source tree: only rewritten nodes are
//! allocated and every untouched subtree is shared by id.

use std::sync::Arc;

use xeger_core::{
    Arena, Element, ElementId, ElementTree, PRINTABLE_MAX, PRINTABLE_MIN, Repeat,
};

/// Whether confounding the element `id` would change anything.
pub fn can_confound(tree: &ElementTree, id: ElementId) -> bool {
    let Some(element) = tree.get(id) else {
        return false;
    };
    match element {
        Element::Empty | Element::Backref { .. } => false,
        Element::Char { .. }
        | Element::Range { .. }
        | Element::Class { .. }
        | Element::Shorthand { .. } => true,
        Element::Str { text, .. } => reversed(text).is_some(),
        Element::Bounds { child, repeat } => repeat.min > 1 || can_confound(tree, *child),
        Element::Sequence { children, .. } | Element::Capture { children, .. } => {
            children.iter().any(|child| can_confound(tree, *child))
        }
    }
}

/// Builds the confounded variant of `tree`, or `None` when no element in it
/// can be confounded. The source tree is never modified.
///
/// The result is one layer over the source arena. A source that is itself
/// layered is deep-copied first, so results never stack more than two
/// layers.
pub fn confound(tree: &ElementTree) -> Option<ElementTree> {
    let flattened;
    let source = if tree.arena().is_layered() {
        flattened = tree.duplicate();
        &flattened
    } else {
        tree
    };
    let mut confounder = Confounder {
        source,
        layer: Arena::layered(Arc::clone(source.arena())),
    };
    let root = confounder.element(source.root())?;
    Some(ElementTree::new(
        confounder.layer,
        root,
        source.group_count(),
    ))
}

struct Confounder<'a> {
    source: &'a ElementTree,
    layer: Arena,
}

impl Confounder<'_> {
    /// Id of the confounded replacement for `id`, if one exists.
    fn element(&mut self, id: ElementId) -> Option<ElementId> {
        let source = self.source;
        let replacement = match source.get(id)? {
            Element::Empty | Element::Backref { .. } => return None,
            Element::Char { ch, negated: false } => Element::Char {
                ch: *ch,
                negated: true,
            },
            Element::Char { ch, negated: true } => Element::literal(next_printable(*ch)),
            Element::Str { text, .. } => Element::Str {
                text: reversed(text)?,
                confounded: true,
            },
            Element::Range {
                start,
                end,
                negated: false,
            } => {
                let low = (*start).min(*end) as u32;
                match char::from_u32(low.wrapping_sub(1)) {
                    Some(below) if low > PRINTABLE_MIN => Element::Range {
                        start: ' ',
                        end: below,
                        negated: false,
                    },
                    _ => Element::Range {
                        start: *start,
                        end: *end,
                        negated: true,
                    },
                }
            }
            Element::Range {
                start,
                end,
                negated: true,
            } => Element::Range {
                start: *start,
                end: *end,
                negated: false,
            },
            Element::Class {
                set,
                negated,
                repeat,
            } => Element::Class {
                set: set.clone(),
                negated: !negated,
                repeat: repeat.map(violate_class_bounds),
            },
            Element::Shorthand { kind, .. } => Element::Shorthand {
                kind: kind.opposite(),
                source: kind.opposite().canonical_source(),
            },
            Element::Bounds { child, repeat } => {
                if repeat.min > 1 {
                    Element::Bounds {
                        child: *child,
                        repeat: Repeat::between(0, repeat.min - 1),
                    }
                } else {
                    Element::Bounds {
                        child: self.element(*child)?,
                        repeat: *repeat,
                    }
                }
            }
            Element::Sequence {
                children,
                selection,
            } => Element::Sequence {
                children: self.children(children)?,
                selection: *selection,
            },
            Element::Capture { index, children } => Element::Capture {
                index: *index,
                children: self.children(children)?,
            },
        };
        Some(self.layer.alloc(replacement))
    }

    /// Children with every confoundable one replaced, or `None` when none is.
    fn children(&mut self, children: &[ElementId]) -> Option<Vec<ElementId>> {
        let mut changed = false;
        let mapped = children
            .iter()
            .map(|child| match self.element(*child) {
                Some(replacement) => {
                    changed = true;
                    replacement
                }
                None => *child,
            })
            .collect();
        changed.then_some(mapped)
    }
}

fn reversed(text: &str) -> Option<String> {
    let reversed: String = text.chars().rev().collect();
    (reversed != text).then_some(reversed)
}

/// Next printable character, wrapping at the top of the window.
fn next_printable(ch: char) -> char {
    let next = ch as u32 + 1;
    let next = if (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&next) {
        next
    } else {
        PRINTABLE_MIN
    };
    char::from_u32(next).unwrap_or(' ')
}

/// "At least N" becomes "fewer than N"; "at most N" becomes "more than N".
fn violate_class_bounds(repeat: Repeat) -> Repeat {
    match repeat.max {
        _ if repeat.min > 2 => Repeat::between(0, repeat.min - 1),
        Some(max) if max > 0 && max < 100 => Repeat::at_least(max + 1),
        _ => repeat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::dissect;
    use crate::recognizer::SyntaxRecognizer;

    fn confounded(pattern: &str) -> Option<String> {
        let tree = dissect(pattern, &SyntaxRecognizer).unwrap().tree;
        confound(&tree).map(|tree| tree.to_string())
    }

    #[test]
    fn literals_flip_or_reverse() {
        assert_eq!(confounded("a").as_deref(), Some("[^a]"));
        assert_eq!(confounded("ab|cd").as_deref(), Some("(?:ba|dc)"));
        assert_eq!(confounded("abba"), None);
        assert_eq!(confounded("^$"), None);
    }

    #[test]
    fn ranges_move_below_their_start_or_flip() {
        assert_eq!(confounded("[a-z]").as_deref(), Some("[ -`]"));
        assert_eq!(confounded("[ -z]").as_deref(), Some("[^ -z]"));
        assert_eq!(confounded("[^a-z]").as_deref(), Some("[a-z]"));
    }

    #[test]
    fn class_bounds_are_violated() {
        assert_eq!(confounded("[ab]{4}").as_deref(), Some("[^ab]{0,3}"));
        assert_eq!(confounded("[ab]{1,2}").as_deref(), Some("[^ab]{3,}"));
        assert_eq!(confounded("[ab]").as_deref(), Some("[^ab]"));
    }

    #[test]
    fn bounds_drop_below_their_minimum() {
        assert_eq!(confounded("a{3}").as_deref(), Some("a{0,2}"));
        assert_eq!(confounded("x(ab)+").as_deref(), Some("[^x](ba)+"));
    }

    #[test]
    fn shorthands_take_their_opposite() {
        assert_eq!(confounded("\\d\\S").as_deref(), Some("\\D\\s"));
    }

    #[test]
    fn untouched_subtrees_are_shared() {
        let tree = dissect("(?:\\1)(?:\\2)x", &SyntaxRecognizer).unwrap().tree;
        let layered = confound(&tree).unwrap();
        // Root and the literal are rewritten; both backreferences are reused.
        assert_eq!(layered.arena().own_len(), 2);
        assert_eq!(layered.to_string(), tree.to_string().replace('x', "[^x]"));
        assert!(can_confound(&tree, tree.root()));
    }

    #[test]
    fn confounding_a_confounded_tree_flattens_it_first() {
        let tree = dissect("x[0-9]+(ab)", &SyntaxRecognizer).unwrap().tree;
        let once = confound(&tree).unwrap();
        let twice = confound(&once).unwrap();
        let base = twice.arena().base().unwrap();
        assert!(!base.is_layered());
        assert_eq!(base.len(), once.node_count());
        assert_eq!(
            twice.to_string(),
            confound(&once.duplicate()).unwrap().to_string()
        );
    }
}
