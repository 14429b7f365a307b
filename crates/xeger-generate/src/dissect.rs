//! Builds element trees from recognizer events.

use std::collections::HashMap;

use tracing::{trace, warn};
use xeger_core::{Arena, CharSet, Element, ElementId, ElementTree, Repeat, ShorthandKind};

use crate::errors::PatternError;
use crate::recognizer::{GroupKind, PatternEvents, Recognizer};

/// A construct dropped from a partially supported pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub construct: String,
    pub offset: usize,
}

/// Output of a successful walk.
#[derive(Debug, Clone)]
pub struct Dissection {
    pub tree: ElementTree,
    pub skipped: Vec<Skipped>,
}

/// Walks `pattern` with `recognizer` and assembles its element tree.
pub fn dissect(pattern: &str, recognizer: &dyn Recognizer) -> Result<Dissection, PatternError> {
    let mut dissector = Dissector::new();
    recognizer.walk(pattern, &mut dissector)?;
    dissector.finish()
}

/// Open construct on the builder stack.
#[derive(Debug)]
enum Frame {
    Root(ElementId),
    Group(ElementId),
    Alternation { id: ElementId, optional: bool },
    Branch { id: ElementId, poisoned: bool },
    Class(ClassBuilder),
}

/// Character class state before it becomes an element.
#[derive(Debug, Default)]
struct ClassBuilder {
    negated: bool,
    set: CharSet,
    ranges: Vec<(char, char)>,
    chars: usize,
    shorthands: Vec<ShorthandKind>,
}

impl ClassBuilder {
    fn build(self) -> Element {
        if self.chars == 0
            && self.shorthands.is_empty()
            && let [(start, end)] = self.ranges[..]
        {
            return Element::Range {
                start,
                end,
                negated: self.negated,
            };
        }
        let mut set = self.set;
        for kind in &self.shorthands {
            set.extend_from(&kind.alphabet());
        }
        Element::Class {
            set,
            negated: self.negated,
            repeat: None,
        }
    }

    fn only_shorthands(&self) -> bool {
        !self.negated && self.chars == 0 && self.ranges.is_empty() && !self.shorthands.is_empty()
    }
}

/// Receives [`PatternEvents`] and assembles an [`ElementTree`].
///
/// Keeps an explicit stack of open constructs. Leaf events always land in
/// the innermost open container.
#[derive(Debug)]
pub struct Dissector {
    arena: Arena,
    frames: Vec<Frame>,
    groups: usize,
    names: HashMap<String, usize>,
    skipped: Vec<Skipped>,
}

impl Default for Dissector {
    fn default() -> Self {
        Self::new()
    }
}

impl Dissector {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Element::sequence());
        Self {
            arena,
            frames: vec![Frame::Root(root)],
            groups: 0,
            names: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<Dissection, PatternError> {
        let [Frame::Root(root)] = self.frames[..] else {
            return Err(PatternError::Walk(format!(
                "{} constructs left open",
                self.frames.len().saturating_sub(1)
            )));
        };
        let tree = ElementTree::new(self.arena, root, self.groups);
        Ok(Dissection {
            tree,
            skipped: self.skipped,
        })
    }

    fn container(&self) -> Result<ElementId, PatternError> {
        match self.frames.last() {
            Some(Frame::Root(id) | Frame::Group(id) | Frame::Branch { id, .. }) => Ok(*id),
            Some(Frame::Alternation { .. }) => Err(PatternError::Walk(
                "content outside an alternation branch".to_string(),
            )),
            Some(Frame::Class(_)) => Err(PatternError::Walk(
                "content inside an open character class".to_string(),
            )),
            None => Err(PatternError::Walk("no open container".to_string())),
        }
    }

    /// Inside a branch that an unsupported construct has already doomed.
    fn poisoned(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| matches!(frame, Frame::Branch { poisoned: true, .. }))
    }

    fn add(&mut self, element: Element) -> Result<ElementId, PatternError> {
        let parent = self.container()?;
        let id = self.arena.alloc(element);
        self.arena.push_child(parent, id)?;
        Ok(id)
    }

    /// Marks the innermost open branch as dropped. False when there is none.
    fn poison_enclosing_branch(&mut self) -> bool {
        let branch = self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Branch { poisoned, .. } => Some(poisoned),
            _ => None,
        });
        match branch {
            Some(poisoned) => {
                *poisoned = true;
                true
            }
            None => false,
        }
    }

    fn class_builder(&mut self) -> Result<&mut ClassBuilder, PatternError> {
        match self.frames.last_mut() {
            Some(Frame::Class(builder)) => Ok(builder),
            _ => Err(PatternError::Walk("no open character class".to_string())),
        }
    }

    /// Splits the last character off a trailing literal run so a quantifier
    /// applies to it alone.
    fn split_literal_run(&mut self, parent: ElementId) -> Result<(), PatternError> {
        let Some(last) = self.arena.last_child(parent) else {
            return Ok(());
        };
        let Ok(Element::Str { text, .. }) = self.arena.get_mut(last) else {
            return Ok(());
        };
        let Some(tail) = text.pop() else {
            return Ok(());
        };
        let mut rest = text.chars();
        if let (Some(only), None) = (rest.next(), rest.next()) {
            *self.arena.get_mut(last)? = Element::literal(only);
        }
        self.add(Element::literal(tail))?;
        Ok(())
    }
}

impl PatternEvents for Dissector {
    fn enter_group(&mut self, kind: GroupKind) -> Result<(), PatternError> {
        trace!(event = "enter_group", kind = ?kind);
        let element = match kind {
            GroupKind::Capturing { name } => {
                self.groups += 1;
                if let Some(name) = name {
                    self.names.insert(name, self.groups);
                }
                Element::Capture {
                    index: self.groups,
                    children: Vec::new(),
                }
            }
            GroupKind::NonCapturing => Element::sequence(),
        };
        let id = self.add(element)?;
        self.frames.push(Frame::Group(id));
        Ok(())
    }

    fn exit_group(&mut self) -> Result<(), PatternError> {
        trace!(event = "exit_group");
        match self.frames.pop() {
            Some(Frame::Group(_)) => Ok(()),
            _ => Err(PatternError::Walk("group exit without a group".to_string())),
        }
    }

    fn enter_alternation(&mut self) -> Result<(), PatternError> {
        trace!(event = "enter_alternation");
        let id = self.add(Element::alternation())?;
        self.frames.push(Frame::Alternation {
            id,
            optional: false,
        });
        Ok(())
    }

    fn enter_branch(&mut self) -> Result<(), PatternError> {
        trace!(event = "enter_branch");
        if !matches!(self.frames.last(), Some(Frame::Alternation { .. })) {
            return Err(PatternError::Walk(
                "branch outside an alternation".to_string(),
            ));
        }
        let id = self.arena.alloc(Element::sequence());
        self.frames.push(Frame::Branch {
            id,
            poisoned: false,
        });
        Ok(())
    }

    fn exit_branch(&mut self) -> Result<(), PatternError> {
        trace!(event = "exit_branch");
        let Some(Frame::Branch { id, poisoned }) = self.frames.pop() else {
            return Err(PatternError::Walk("branch exit without a branch".to_string()));
        };
        let Some(Frame::Alternation {
            id: alternation,
            optional,
        }) = self.frames.last_mut()
        else {
            return Err(PatternError::Walk(
                "branch closed outside an alternation".to_string(),
            ));
        };
        if poisoned {
            return Ok(());
        }
        let alternation = *alternation;
        let generative = self.arena.get(id).is_some_and(|branch| {
            branch
                .children()
                .iter()
                .any(|child| !matches!(self.arena.get(*child), Some(Element::Empty)))
        });
        if !generative {
            *optional = true;
            return Ok(());
        }
        self.arena.push_child(alternation, id)?;
        Ok(())
    }

    fn exit_alternation(&mut self) -> Result<(), PatternError> {
        trace!(event = "exit_alternation");
        let Some(Frame::Alternation { id, optional }) = self.frames.pop() else {
            return Err(PatternError::Walk(
                "alternation exit without an alternation".to_string(),
            ));
        };
        let parent = self.container()?;
        let empty = self
            .arena
            .get(id)
            .is_none_or(|alternation| alternation.children().is_empty());
        if empty {
            *self.arena.get_mut(id)? = Element::Empty;
            // Every branch was dropped: the alternation itself is unsupported.
            if !optional
                && let Some(last) = self.skipped.last().cloned()
                && !self.poison_enclosing_branch()
            {
                return Err(PatternError::Unsupported {
                    construct: last.construct,
                    offset: last.offset,
                });
            }
            return Ok(());
        }
        if optional {
            self.arena.bound_last(parent, Repeat::optional())?;
        }
        Ok(())
    }

    fn enter_class(&mut self, negated: bool) -> Result<(), PatternError> {
        trace!(event = "enter_class", negated);
        self.frames.push(Frame::Class(ClassBuilder {
            negated,
            ..ClassBuilder::default()
        }));
        Ok(())
    }

    fn class_char(&mut self, ch: char) -> Result<(), PatternError> {
        trace!(event = "class_char", ch = %ch);
        let builder = self.class_builder()?;
        builder.set.add(ch);
        builder.chars += 1;
        Ok(())
    }

    fn class_range(&mut self, start: char, end: char) -> Result<(), PatternError> {
        trace!(event = "class_range", start = %start, end = %end);
        let builder = self.class_builder()?;
        builder.set.add_range(start, end);
        builder.ranges.push((start, end));
        Ok(())
    }

    fn class_shorthand(&mut self, kind: ShorthandKind) -> Result<(), PatternError> {
        trace!(event = "class_shorthand", kind = ?kind);
        self.class_builder()?.shorthands.push(kind);
        Ok(())
    }

    fn exit_class(&mut self) -> Result<(), PatternError> {
        trace!(event = "exit_class");
        let Some(Frame::Class(builder)) = self.frames.pop() else {
            return Err(PatternError::Walk("class exit without a class".to_string()));
        };
        if self.poisoned() {
            return Ok(());
        }
        if builder.only_shorthands() {
            let mut shorthands = builder.shorthands.into_iter().map(|kind| Element::Shorthand {
                kind,
                source: kind.canonical_source(),
            });
            return match (shorthands.next(), shorthands.len()) {
                (Some(single), 0) => self.add(single).map(|_| ()),
                (Some(first), _) => {
                    let choice = self.add(Element::alternation())?;
                    for element in std::iter::once(first).chain(shorthands) {
                        let id = self.arena.alloc(element);
                        self.arena.push_child(choice, id)?;
                    }
                    Ok(())
                }
                (None, _) => Ok(()),
            };
        }
        self.add(builder.build())?;
        Ok(())
    }

    fn literal_char(&mut self, ch: char) -> Result<(), PatternError> {
        trace!(event = "literal_char", ch = %ch);
        if self.poisoned() {
            return Ok(());
        }
        let parent = self.container()?;
        if let Some(last) = self.arena.last_child(parent)
            && let Ok(element) = self.arena.get_mut(last)
        {
            match *element {
                Element::Char {
                    ch: previous,
                    negated: false,
                } => {
                    *element = Element::Str {
                        text: format!("{previous}{ch}"),
                        confounded: false,
                    };
                    return Ok(());
                }
                Element::Str {
                    ref mut text,
                    confounded: false,
                } => {
                    text.push(ch);
                    return Ok(());
                }
                _ => {}
            }
        }
        self.add(Element::literal(ch))?;
        Ok(())
    }

    fn shorthand(&mut self, kind: ShorthandKind, source: &str) -> Result<(), PatternError> {
        trace!(event = "shorthand", kind = ?kind, source);
        if self.poisoned() {
            return Ok(());
        }
        self.add(Element::Shorthand {
            kind,
            source: source.to_string(),
        })?;
        Ok(())
    }

    fn quantifier(&mut self, repeat: Repeat) -> Result<(), PatternError> {
        trace!(event = "quantifier", repeat = %repeat);
        if self.poisoned() {
            return Ok(());
        }
        let parent = self.container()?;
        if let Some(last) = self.arena.last_child(parent)
            && let Ok(Element::Class {
                repeat: class_repeat @ None,
                ..
            }) = self.arena.get_mut(last)
        {
            *class_repeat = Some(repeat);
            return Ok(());
        }
        self.split_literal_run(parent)?;
        self.arena.bound_last(parent, repeat)?;
        Ok(())
    }

    fn backreference(&mut self, group: usize) -> Result<(), PatternError> {
        trace!(event = "backreference", group);
        if self.poisoned() {
            return Ok(());
        }
        self.add(Element::Backref { group })?;
        Ok(())
    }

    fn named_backreference(&mut self, name: &str) -> Result<(), PatternError> {
        trace!(event = "named_backreference", name);
        if self.poisoned() {
            return Ok(());
        }
        let group = *self
            .names
            .get(name)
            .ok_or_else(|| PatternError::Invalid(format!("unknown group name `{name}`")))?;
        self.add(Element::Backref { group })?;
        Ok(())
    }

    fn anchor(&mut self, source: &str) -> Result<(), PatternError> {
        trace!(event = "anchor", source);
        if self.poisoned() {
            return Ok(());
        }
        self.add(Element::Empty)?;
        Ok(())
    }

    fn unsupported(&mut self, construct: &str, offset: usize) -> Result<(), PatternError> {
        if !self.poison_enclosing_branch() {
            return Err(PatternError::Unsupported {
                construct: construct.to_string(),
                offset,
            });
        }
        warn!(construct, offset, "dropping alternation branch with unsupported construct");
        self.skipped.push(Skipped {
            construct: construct.to_string(),
            offset,
        });
        Ok(())
    }
}
