use std::fmt::{self, Write as _};
use std::sync::Arc;

use crate::charset::write_escaped;
use crate::element::{Element, Repeat, Selection};
use crate::error::{Error, Result};

/// Index of an element inside an [`Arena`] and every layer stacked on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only element storage.
///
/// A layered arena sits on top of a frozen base and numbers its own nodes
/// after the base's last id, so ids handed out by the base stay valid in
/// every layer above it. Only nodes owned by the top layer are mutable.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    base: Option<Arc<Arena>>,
    offset: u32,
    nodes: Vec<Element>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layered(base: Arc<Arena>) -> Self {
        let offset = base.len() as u32;
        Self {
            base: Some(base),
            offset,
            nodes: Vec::new(),
        }
    }

    /// Number of ids addressable through this layer, base layers included.
    pub fn len(&self) -> usize {
        self.offset as usize + self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_layered(&self) -> bool {
        self.base.is_some()
    }

    pub fn base(&self) -> Option<&Arena> {
        self.base.as_deref()
    }

    /// Nodes allocated in this layer alone.
    pub fn own_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn alloc(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.offset + self.nodes.len() as u32);
        self.nodes.push(element);
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        let mut layer = self;
        loop {
            if id.0 >= layer.offset {
                return layer.nodes.get((id.0 - layer.offset) as usize);
            }
            layer = layer.base.as_deref()?;
        }
    }

    pub fn get_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        if id.0 < self.offset {
            return Err(Error::ForeignNode(id));
        }
        self.nodes
            .get_mut((id.0 - self.offset) as usize)
            .ok_or(Error::UnknownNode(id))
    }

    /// Appends `child` to the container `parent`.
    pub fn push_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        match self.get_mut(parent)? {
            Element::Sequence { children, .. } | Element::Capture { children, .. } => {
                children.push(child);
                Ok(())
            }
            _ => Err(Error::NotAContainer(parent)),
        }
    }

    /// Wraps the most recently added child of `parent` in a bounds element
    /// and returns the wrapper's id.
    pub fn bound_last(&mut self, parent: ElementId, repeat: Repeat) -> Result<ElementId> {
        let last = match self.get_mut(parent)? {
            Element::Sequence { children, .. } | Element::Capture { children, .. } => {
                children.pop().ok_or(Error::NothingToBound(parent))?
            }
            _ => return Err(Error::NotAContainer(parent)),
        };
        let wrapper = self.alloc(Element::Bounds {
            child: last,
            repeat,
        });
        self.push_child(parent, wrapper)?;
        Ok(wrapper)
    }

    /// The most recently added child of `parent`, if any.
    pub fn last_child(&self, parent: ElementId) -> Option<ElementId> {
        self.get(parent)?.children().last().copied()
    }
}

/// A built element tree: shared arena, root id and capture-group count.
///
/// Trees are immutable. Emission reads them through `&self`, and a
/// confounded variant is a new tree over a layered arena.
#[derive(Debug, Clone)]
pub struct ElementTree {
    arena: Arc<Arena>,
    root: ElementId,
    group_count: usize,
}

impl ElementTree {
    pub fn new(arena: Arena, root: ElementId, group_count: usize) -> Self {
        Self::from_shared(Arc::new(arena), root, group_count)
    }

    pub fn from_shared(arena: Arc<Arena>, root: ElementId, group_count: usize) -> Self {
        Self {
            arena,
            root,
            group_count,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.arena.get(id)
    }

    /// Number of capture indices registered while building, skipped ones
    /// included.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Depth-first, pre-order walk over every reachable element.
    pub fn traverse(&self, mut visit: impl FnMut(usize, ElementId, &Element)) {
        let mut stack = vec![(0_usize, self.root)];
        while let Some((depth, id)) = stack.pop() {
            let Some(element) = self.get(id) else {
                continue;
            };
            visit(depth, id, element);
            for child in element.children().iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
    }

    /// Capture groups present in the tree, in registration order.
    pub fn capture_groups(&self) -> Vec<ElementId> {
        let mut groups = Vec::new();
        self.traverse(|_, id, element| {
            if let Element::Capture { index, .. } = element {
                groups.push((*index, id));
            }
        });
        groups.sort_by_key(|(index, _)| *index);
        groups.into_iter().map(|(_, id)| id).collect()
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.traverse(|_, _, _| count += 1);
        count
    }

    /// Deep-copies the reachable tree into a fresh, single-layer arena.
    pub fn duplicate(&self) -> ElementTree {
        let mut arena = Arena::new();
        let root = self.copy_into(self.root, &mut arena);
        ElementTree::new(arena, root, self.group_count)
    }

    fn copy_into(&self, id: ElementId, target: &mut Arena) -> ElementId {
        let Some(element) = self.get(id) else {
            return target.alloc(Element::Empty);
        };
        let copied = match element {
            Element::Sequence {
                children,
                selection,
            } => Element::Sequence {
                children: children.iter().map(|c| self.copy_into(*c, target)).collect(),
                selection: *selection,
            },
            Element::Capture { index, children } => Element::Capture {
                index: *index,
                children: children.iter().map(|c| self.copy_into(*c, target)).collect(),
            },
            Element::Bounds { child, repeat } => Element::Bounds {
                child: self.copy_into(*child, target),
                repeat: *repeat,
            },
            leaf => leaf.clone(),
        };
        target.alloc(copied)
    }

    fn render(&self, id: ElementId, out: &mut String) -> fmt::Result {
        let Some(element) = self.get(id) else {
            return Ok(());
        };
        match element {
            Element::Empty => {}
            Element::Char { ch, negated: false } => write_literal(out, *ch)?,
            Element::Char { ch, negated: true } => {
                out.push_str("[^");
                write_class_char(out, *ch)?;
                out.push(']');
            }
            Element::Str { text, .. } => {
                for ch in text.chars() {
                    write_literal(out, ch)?;
                }
            }
            Element::Range {
                start,
                end,
                negated,
            } => {
                out.push_str(if *negated { "[^" } else { "[" });
                write_class_char(out, *start)?;
                out.push('-');
                write_class_char(out, *end)?;
                out.push(']');
            }
            Element::Class {
                set,
                negated,
                repeat,
            } => {
                out.push_str(if *negated { "[^" } else { "[" });
                write_class_body(out, set.iter())?;
                out.push(']');
                if let Some(repeat) = repeat {
                    write!(out, "{repeat}")?;
                }
            }
            Element::Shorthand { source, .. } => out.push_str(source),
            Element::Sequence {
                children,
                selection: Selection::All,
            } => {
                for child in children {
                    self.render(*child, out)?;
                }
            }
            Element::Sequence {
                children,
                selection: Selection::One,
            } => {
                out.push_str("(?:");
                for (idx, child) in children.iter().enumerate() {
                    if idx > 0 {
                        out.push('|');
                    }
                    self.render(*child, out)?;
                }
                out.push(')');
            }
            Element::Capture { children, .. } => {
                out.push('(');
                for child in children {
                    self.render(*child, out)?;
                }
                out.push(')');
            }
            Element::Backref { group } => write!(out, "\\{group}")?,
            Element::Bounds { child, repeat } => {
                let mut inner = String::new();
                self.render(*child, &mut inner)?;
                if self.renders_as_atom(*child) {
                    out.push_str(&inner);
                } else {
                    write!(out, "(?:{inner})")?;
                }
                write!(out, "{repeat}")?;
            }
        }
        Ok(())
    }

    fn renders_as_atom(&self, id: ElementId) -> bool {
        match self.get(id) {
            Some(Element::Str { text, .. }) => text.chars().count() == 1,
            Some(Element::Sequence {
                children,
                selection: Selection::All,
            }) => children.len() == 1 && self.renders_as_atom(children[0]),
            Some(Element::Bounds { .. } | Element::Class { repeat: Some(_), .. }) => false,
            Some(_) => true,
            None => false,
        }
    }
}

impl fmt::Display for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(self.root, &mut out)?;
        f.write_str(&out)
    }
}

const META: &str = "\\.^$|?*+()[]{}";

fn write_literal(out: &mut String, ch: char) -> fmt::Result {
    if META.contains(ch) {
        out.push('\\');
        out.push(ch);
        return Ok(());
    }
    write_escaped(out, ch)
}

fn write_class_char(out: &mut String, ch: char) -> fmt::Result {
    if matches!(ch, ']' | '[' | '^' | '-') {
        out.push('\\');
        out.push(ch);
        return Ok(());
    }
    write_escaped(out, ch)
}

/// Writes set members, folding runs of three or more into `a-z` form.
fn write_class_body(out: &mut String, chars: impl Iterator<Item = char>) -> fmt::Result {
    let mut run: Option<(char, char)> = None;
    for ch in chars {
        run = match run {
            Some((start, end)) if end as u32 + 1 == ch as u32 => Some((start, ch)),
            Some(done) => {
                write_run(out, done)?;
                Some((ch, ch))
            }
            None => Some((ch, ch)),
        };
    }
    if let Some(done) = run {
        write_run(out, done)?;
    }
    Ok(())
}

fn write_run(out: &mut String, (start, end): (char, char)) -> fmt::Result {
    write_class_char(out, start)?;
    match end as u32 - start as u32 {
        0 => Ok(()),
        1 => write_class_char(out, end),
        _ => {
            out.push('-');
            write_class_char(out, end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::CharSet;

    fn sample_tree() -> ElementTree {
        let mut arena = Arena::new();
        let root = arena.alloc(Element::sequence());
        let group = arena.alloc(Element::Capture {
            index: 1,
            children: Vec::new(),
        });
        let foo = arena.alloc(Element::Str {
            text: "foo".into(),
            confounded: false,
        });
        arena.push_child(group, foo).unwrap();
        arena.push_child(root, group).unwrap();
        let backref = arena.alloc(Element::Backref { group: 1 });
        arena.push_child(root, backref).unwrap();
        let digit = arena.alloc(Element::literal('7'));
        arena.push_child(root, digit).unwrap();
        arena.bound_last(root, Repeat::between(2, 4)).unwrap();
        ElementTree::new(arena, root, 1)
    }

    #[test]
    fn bound_last_wraps_only_the_last_child() {
        let tree = sample_tree();
        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.children().len(), 3);
        let last = tree.get(root.children()[2]).unwrap();
        assert!(matches!(last, Element::Bounds { repeat, .. } if *repeat == Repeat::between(2, 4)));
        assert_eq!(tree.to_string(), "(foo)\\17{2,4}");
    }

    #[test]
    fn bound_last_rejects_empty_containers_and_leaves() {
        let mut arena = Arena::new();
        let root = arena.alloc(Element::sequence());
        let leaf = arena.alloc(Element::literal('x'));
        assert_eq!(
            arena.bound_last(root, Repeat::optional()),
            Err(Error::NothingToBound(root))
        );
        assert_eq!(
            arena.push_child(leaf, root),
            Err(Error::NotAContainer(leaf))
        );
    }

    #[test]
    fn layered_arena_reads_through_but_writes_only_its_own_nodes() {
        let tree = sample_tree();
        let mut layer = Arena::layered(Arc::clone(tree.arena()));
        assert!(layer.get(tree.root()).is_some());
        assert_eq!(
            layer.get_mut(tree.root()).map(|_| ()),
            Err(Error::ForeignNode(tree.root()))
        );

        let fresh = layer.alloc(Element::sequence());
        assert_eq!(fresh.index(), tree.arena().len());
        assert_eq!(layer.own_len(), 1);
        layer.push_child(fresh, tree.root()).unwrap();
        let wrapped = ElementTree::new(layer, fresh, 1);
        assert_eq!(wrapped.to_string(), tree.to_string());
    }

    #[test]
    fn traverse_and_duplicate_agree_on_shape() {
        let tree = sample_tree();
        let mut kinds = Vec::new();
        tree.traverse(|depth, _, element| kinds.push((depth, element.kind())));
        assert_eq!(kinds.len(), tree.node_count());
        assert_eq!(kinds[0].0, 0);
        assert_eq!(tree.capture_groups().len(), 1);

        let copy = tree.duplicate();
        assert_eq!(copy.node_count(), tree.node_count());
        assert_eq!(copy.to_string(), tree.to_string());
        assert!(!Arc::ptr_eq(copy.arena(), tree.arena()));
    }

    #[test]
    fn class_rendering_folds_runs() {
        let mut arena = Arena::new();
        let mut set = CharSet::new();
        set.add_range('a', 'f');
        set.add('x');
        set.add('y');
        set.add('-');
        let class = arena.alloc(Element::Class {
            set,
            negated: true,
            repeat: Some(Repeat::at_least(1)),
        });
        let tree = ElementTree::new(arena, class, 0);
        assert_eq!(tree.to_string(), "[^\\-a-fxy]+");
    }
}
