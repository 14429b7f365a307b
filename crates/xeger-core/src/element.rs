use std::fmt;

use crate::arena::ElementId;
use crate::charset::{CharSet, PRINTABLE_MAX, PRINTABLE_MIN};

/// One node of a pattern's element tree.
///
/// Containers refer to their children by [`ElementId`] so that a confounded
/// tree can share untouched subtrees with the tree it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Emits nothing. Anchors and empty groups dissect to this.
    Empty,
    /// A single character, or any other printable character when negated.
    Char { ch: char, negated: bool },
    /// A run of literal characters. `confounded` marks text that was
    /// rewritten so it no longer matches the source literal.
    Str { text: String, confounded: bool },
    /// One character between `start` and `end`, or outside them when negated.
    Range { start: char, end: char, negated: bool },
    /// An explicit character set, optionally repeated.
    Class {
        set: CharSet,
        negated: bool,
        repeat: Option<Repeat>,
    },
    /// A built-in class such as `\d`; `source` is the text it came from.
    Shorthand { kind: ShorthandKind, source: String },
    Sequence {
        children: Vec<ElementId>,
        selection: Selection,
    },
    /// A capturing group; `index` is its 1-based registration order.
    Capture {
        index: usize,
        children: Vec<ElementId>,
    },
    /// Replays the text last emitted by capture group `group` (1-based).
    Backref { group: usize },
    /// Repeats `child` a number of times drawn from `repeat`.
    Bounds { child: ElementId, repeat: Repeat },
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Empty => ElementKind::Empty,
            Element::Char { .. } => ElementKind::CharLiteral,
            Element::Str { .. } => ElementKind::StringLiteral,
            Element::Range { .. } => ElementKind::CharRange,
            Element::Class { .. } => ElementKind::CharacterClass,
            Element::Shorthand { .. } => ElementKind::ShorthandClass,
            Element::Sequence {
                selection: Selection::All,
                ..
            } => ElementKind::Sequence,
            Element::Sequence {
                selection: Selection::One,
                ..
            } => ElementKind::Alternation,
            Element::Capture { .. } => ElementKind::CaptureGroup,
            Element::Backref { .. } => ElementKind::Backreference,
            Element::Bounds { .. } => ElementKind::Bounds,
        }
    }

    /// Whether children can be appended to this element.
    pub fn is_container(&self) -> bool {
        matches!(self, Element::Sequence { .. } | Element::Capture { .. })
    }

    /// Direct children, in emission order.
    pub fn children(&self) -> &[ElementId] {
        match self {
            Element::Sequence { children, .. } | Element::Capture { children, .. } => children,
            Element::Bounds { child, .. } => std::slice::from_ref(child),
            _ => &[],
        }
    }

    pub fn sequence() -> Self {
        Element::Sequence {
            children: Vec::new(),
            selection: Selection::All,
        }
    }

    pub fn alternation() -> Self {
        Element::Sequence {
            children: Vec::new(),
            selection: Selection::One,
        }
    }

    pub fn literal(ch: char) -> Self {
        Element::Char { ch, negated: false }
    }
}

/// How a sequence emits its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Every child, in order.
    All,
    /// Exactly one child, chosen uniformly.
    One,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Empty,
    CharLiteral,
    StringLiteral,
    CharRange,
    CharacterClass,
    ShorthandClass,
    Sequence,
    Alternation,
    CaptureGroup,
    Backreference,
    Bounds,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Empty => "empty",
            ElementKind::CharLiteral => "char-literal",
            ElementKind::StringLiteral => "string-literal",
            ElementKind::CharRange => "char-range",
            ElementKind::CharacterClass => "character-class",
            ElementKind::ShorthandClass => "shorthand-class",
            ElementKind::Sequence => "sequence",
            ElementKind::Alternation => "alternation",
            ElementKind::CaptureGroup => "capture-group",
            ElementKind::Backreference => "backreference",
            ElementKind::Bounds => "bounds",
        };
        f.write_str(name)
    }
}

/// Repetition bounds. `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repeat {
    pub min: u32,
    pub max: Option<u32>,
}

impl Repeat {
    pub fn exact(count: u32) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    /// Bounds between `min` and `max`, swapped if given backwards.
    pub fn between(min: u32, max: u32) -> Self {
        if min <= max {
            Self {
                min,
                max: Some(max),
            }
        } else {
            Self {
                min: max,
                max: Some(min),
            }
        }
    }

    pub fn optional() -> Self {
        Self::between(0, 1)
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, None) => f.write_str("*"),
            (1, None) => f.write_str("+"),
            (0, Some(1)) => f.write_str("?"),
            (min, None) => write!(f, "{{{min},}}"),
            (min, Some(max)) if min == max => write!(f, "{{{min}}}"),
            (min, Some(max)) => write!(f, "{{{min},{max}}}"),
        }
    }
}

/// Built-in classes. Every kind has an opposite used when confounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShorthandKind {
    /// `.`: anything but a newline.
    Any,
    NewLine,
    Digit,
    NotDigit,
    Space,
    NotSpace,
    Word,
    NotWord,
    Named(NamedClass),
    NotNamed(NamedClass),
}

impl ShorthandKind {
    pub fn opposite(self) -> Self {
        match self {
            ShorthandKind::Any => ShorthandKind::NewLine,
            ShorthandKind::NewLine => ShorthandKind::Any,
            ShorthandKind::Digit => ShorthandKind::NotDigit,
            ShorthandKind::NotDigit => ShorthandKind::Digit,
            ShorthandKind::Space => ShorthandKind::NotSpace,
            ShorthandKind::NotSpace => ShorthandKind::Space,
            ShorthandKind::Word => ShorthandKind::NotWord,
            ShorthandKind::NotWord => ShorthandKind::Word,
            ShorthandKind::Named(class) => ShorthandKind::NotNamed(class),
            ShorthandKind::NotNamed(class) => ShorthandKind::Named(class),
        }
    }

    /// Pattern text that denotes this kind.
    pub fn canonical_source(self) -> String {
        match self {
            ShorthandKind::Any => ".".to_string(),
            ShorthandKind::NewLine => "\\n".to_string(),
            ShorthandKind::Digit => "\\d".to_string(),
            ShorthandKind::NotDigit => "\\D".to_string(),
            ShorthandKind::Space => "\\s".to_string(),
            ShorthandKind::NotSpace => "\\S".to_string(),
            ShorthandKind::Word => "\\w".to_string(),
            ShorthandKind::NotWord => "\\W".to_string(),
            ShorthandKind::Named(class) => format!("[[:{}:]]", class.name()),
            ShorthandKind::NotNamed(class) => format!("[[:^{}:]]", class.name()),
        }
    }

    /// The characters this kind emits from.
    ///
    /// Negated kinds emit from the printable window minus the positive
    /// alphabet. `.` emits any printable character.
    pub fn alphabet(self) -> CharSet {
        match self {
            ShorthandKind::Any => CharSet::printable(),
            ShorthandKind::NewLine => CharSet::from_chars("\n"),
            ShorthandKind::Digit => NamedClass::Digit.alphabet(),
            ShorthandKind::Space => CharSet::from_chars(" \t\n\r"),
            ShorthandKind::Word => NamedClass::Word.alphabet(),
            ShorthandKind::Named(class) => class.alphabet(),
            negated => {
                let mut printable = CharSet::printable();
                printable.subtract(&negated.opposite().alphabet());
                printable
            }
        }
    }
}

/// POSIX bracket classes plus the Unicode property names that have an
/// ASCII rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedClass {
    Alpha,
    Digit,
    Alnum,
    Upper,
    Lower,
    Punct,
    Space,
    Blank,
    XDigit,
    Print,
    Graph,
    Cntrl,
    Ascii,
    Word,
}

impl NamedClass {
    /// Resolves a POSIX class name as written inside `[:name:]`.
    pub fn from_posix(name: &str) -> Option<Self> {
        let class = match name {
            "alpha" => NamedClass::Alpha,
            "digit" => NamedClass::Digit,
            "alnum" => NamedClass::Alnum,
            "upper" => NamedClass::Upper,
            "lower" => NamedClass::Lower,
            "punct" => NamedClass::Punct,
            "space" => NamedClass::Space,
            "blank" => NamedClass::Blank,
            "xdigit" => NamedClass::XDigit,
            "print" => NamedClass::Print,
            "graph" => NamedClass::Graph,
            "cntrl" => NamedClass::Cntrl,
            "ascii" => NamedClass::Ascii,
            "word" => NamedClass::Word,
            _ => return None,
        };
        Some(class)
    }

    /// Resolves a `\p{..}` property name. Only properties whose ASCII
    /// members are a faithful sample of the property are accepted.
    pub fn from_property(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        let class = match normalized.as_str() {
            "l" | "letter" | "alphabetic" | "alpha" => NamedClass::Alpha,
            "lu" | "uppercaseletter" | "uppercase" | "upper" => NamedClass::Upper,
            "ll" | "lowercaseletter" | "lowercase" | "lower" => NamedClass::Lower,
            "n" | "nd" | "number" | "decimalnumber" | "digit" => NamedClass::Digit,
            "whitespace" | "wspace" | "space" => NamedClass::Space,
            "cc" | "control" | "cntrl" => NamedClass::Cntrl,
            "asciihexdigit" | "hexdigit" | "xdigit" => NamedClass::XDigit,
            "ascii" => NamedClass::Ascii,
            _ => return None,
        };
        Some(class)
    }

    pub fn name(self) -> &'static str {
        match self {
            NamedClass::Alpha => "alpha",
            NamedClass::Digit => "digit",
            NamedClass::Alnum => "alnum",
            NamedClass::Upper => "upper",
            NamedClass::Lower => "lower",
            NamedClass::Punct => "punct",
            NamedClass::Space => "space",
            NamedClass::Blank => "blank",
            NamedClass::XDigit => "xdigit",
            NamedClass::Print => "print",
            NamedClass::Graph => "graph",
            NamedClass::Cntrl => "cntrl",
            NamedClass::Ascii => "ascii",
            NamedClass::Word => "word",
        }
    }

    pub fn alphabet(self) -> CharSet {
        let mut set = CharSet::new();
        match self {
            NamedClass::Alpha => {
                set.add_range('a', 'z');
                set.add_range('A', 'Z');
            }
            NamedClass::Digit => set.add_range('0', '9'),
            NamedClass::Alnum => {
                set.extend_from(&NamedClass::Alpha.alphabet());
                set.add_range('0', '9');
            }
            NamedClass::Upper => set.add_range('A', 'Z'),
            NamedClass::Lower => set.add_range('a', 'z'),
            NamedClass::Punct => {
                for c in printable_chars().filter(char::is_ascii_punctuation) {
                    set.add(c);
                }
            }
            NamedClass::Space => {
                for c in [' ', '\t', '\n', '\r', '\u{b}', '\u{c}'] {
                    set.add(c);
                }
            }
            NamedClass::Blank => {
                set.add(' ');
                set.add('\t');
            }
            NamedClass::XDigit => {
                set.add_range('0', '9');
                set.add_range('a', 'f');
                set.add_range('A', 'F');
            }
            // Restricted to the printable window; still a subset of ASCII.
            NamedClass::Print | NamedClass::Ascii => set = CharSet::printable(),
            NamedClass::Graph => set.add_range('!', '~'),
            NamedClass::Cntrl => {
                set.add_range('\0', '\u{1f}');
                set.add('\u{7f}');
            }
            NamedClass::Word => {
                set.extend_from(&NamedClass::Alnum.alphabet());
                set.add('_');
            }
        }
        set
    }
}

fn printable_chars() -> impl Iterator<Item = char> {
    (PRINTABLE_MIN..=PRINTABLE_MAX).filter_map(char::from_u32)
}
