//! Pattern tokenizing.
//!
//! A [`Recognizer`] walks a pattern string and reports its structure as a
//! stream of [`PatternEvents`] callbacks. The element tree is assembled by
//! whoever receives the events, normally the [`crate::dissect::Dissector`].

use fancy_regex::{Assertion, Expr, LookAround};
use regex_syntax::ast::{
    self, Ast, ClassAsciiKind, ClassBracketed, ClassPerl, ClassPerlKind, ClassSet,
    ClassSetBinaryOpKind, ClassSetItem, ClassUnicode, ClassUnicodeKind, RepetitionKind,
    RepetitionRange, Span,
};
use tracing::debug;
use xeger_core::{NamedClass, Repeat, ShorthandKind};

use crate::errors::PatternError;

type WalkResult = Result<(), PatternError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    Capturing { name: Option<String> },
    NonCapturing,
}

/// Structural callbacks produced while walking a pattern.
///
/// Alternations are announced before their first branch, so every branch
/// arrives wrapped in `enter_branch` / `exit_branch`. Quantifiers follow the
/// atom they repeat.
pub trait PatternEvents {
    fn enter_group(&mut self, kind: GroupKind) -> WalkResult;
    fn exit_group(&mut self) -> WalkResult;
    fn enter_alternation(&mut self) -> WalkResult;
    fn enter_branch(&mut self) -> WalkResult;
    fn exit_branch(&mut self) -> WalkResult;
    fn exit_alternation(&mut self) -> WalkResult;
    fn enter_class(&mut self, negated: bool) -> WalkResult;
    fn class_char(&mut self, ch: char) -> WalkResult;
    fn class_range(&mut self, start: char, end: char) -> WalkResult;
    fn class_shorthand(&mut self, kind: ShorthandKind) -> WalkResult;
    fn exit_class(&mut self) -> WalkResult;
    fn literal_char(&mut self, ch: char) -> WalkResult;
    fn literal_string(&mut self, text: &str) -> WalkResult {
        for ch in text.chars() {
            self.literal_char(ch)?;
        }
        Ok(())
    }
    fn shorthand(&mut self, kind: ShorthandKind, source: &str) -> WalkResult;
    fn quantifier(&mut self, repeat: Repeat) -> WalkResult;
    fn backreference(&mut self, group: usize) -> WalkResult;
    fn named_backreference(&mut self, name: &str) -> WalkResult;
    /// Zero-width assertions such as `^`, `\b` or `\<`.
    fn anchor(&mut self, source: &str) -> WalkResult;
    /// A construct with no element mapping. Receivers decide whether this
    /// fails the walk.
    fn unsupported(&mut self, construct: &str, offset: usize) -> WalkResult;
}

/// Something that can walk a pattern string.
pub trait Recognizer {
    fn walk(&self, pattern: &str, events: &mut dyn PatternEvents) -> WalkResult;
}

/// Recognizer for the `regex` crate dialect plus backreferences.
///
/// Patterns are parsed by `regex-syntax`, the parser behind the `regex`
/// crate. Patterns it rejects are parsed again by `fancy-regex`, the same
/// order [`crate::oracle::Oracle`] compiles them in, so both always agree on
/// the dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxRecognizer;

impl Recognizer for SyntaxRecognizer {
    fn walk(&self, pattern: &str, events: &mut dyn PatternEvents) -> WalkResult {
        match ast::parse::Parser::new().parse(pattern) {
            Ok(tree) => ast::visit(
                &tree,
                AstWalk {
                    source: pattern,
                    base: 0,
                    events,
                },
            ),
            Err(linear_err) => {
                debug!(pattern, error = %linear_err.kind(), "walking backtracking grammar");
                let tree = Expr::parse_tree(pattern)
                    .map_err(|_| PatternError::Invalid(linear_err.to_string()))?;
                ExprWalk { pattern, events }.expr(&tree.expr)
            }
        }
    }
}

fn text<'s>(source: &'s str, span: &Span) -> &'s str {
    source
        .get(span.start.offset..span.end.offset)
        .unwrap_or_default()
}

/// Walks a `regex-syntax` AST. `base` is the offset of `source` within the
/// whole pattern.
struct AstWalk<'a> {
    source: &'a str,
    base: usize,
    events: &'a mut dyn PatternEvents,
}

impl AstWalk<'_> {
    fn unsupported(&mut self, span: &Span) -> WalkResult {
        let construct = text(self.source, span);
        self.events
            .unsupported(construct, self.base + span.start.offset)
    }

    fn class(&mut self, class: &ClassBracketed) -> WalkResult {
        self.events.enter_class(class.negated)?;
        match &class.kind {
            ClassSet::Item(item) => self.class_item(item)?,
            ClassSet::BinaryOp(op) => {
                let construct = match op.kind {
                    ClassSetBinaryOpKind::Intersection => "&&",
                    ClassSetBinaryOpKind::Difference => "--",
                    ClassSetBinaryOpKind::SymmetricDifference => "~~",
                };
                self.events
                    .unsupported(construct, self.base + op.span.start.offset)?;
            }
        }
        self.events.exit_class()
    }

    fn class_item(&mut self, item: &ClassSetItem) -> WalkResult {
        match item {
            ClassSetItem::Empty(_) => Ok(()),
            ClassSetItem::Literal(literal) => self.events.class_char(literal.c),
            ClassSetItem::Range(range) => self.events.class_range(range.start.c, range.end.c),
            ClassSetItem::Ascii(ascii) => {
                let class = posix_class(&ascii.kind);
                self.events.class_shorthand(if ascii.negated {
                    ShorthandKind::NotNamed(class)
                } else {
                    ShorthandKind::Named(class)
                })
            }
            ClassSetItem::Unicode(unicode) => match property_kind(unicode) {
                Some(kind) => self.events.class_shorthand(kind),
                None => self.unsupported(&unicode.span),
            },
            ClassSetItem::Perl(perl) => self.events.class_shorthand(perl_kind(perl)),
            ClassSetItem::Bracketed(nested) => self.unsupported(&nested.span),
            ClassSetItem::Union(union) => union
                .items
                .iter()
                .try_for_each(|item| self.class_item(item)),
        }
    }
}

impl ast::Visitor for AstWalk<'_> {
    type Output = ();
    type Err = PatternError;

    fn finish(self) -> WalkResult {
        Ok(())
    }

    fn visit_pre(&mut self, node: &Ast) -> WalkResult {
        let source = self.source;
        match node {
            Ast::Empty(_) | Ast::Concat(_) | Ast::Repetition(_) => Ok(()),
            Ast::Flags(flags) => self.unsupported(&flags.span),
            Ast::Literal(literal) => self.events.literal_char(literal.c),
            Ast::Dot(span) => self.events.shorthand(ShorthandKind::Any, text(source, span)),
            Ast::Assertion(assertion) => self.events.anchor(text(source, &assertion.span)),
            Ast::ClassUnicode(unicode) => match property_kind(unicode) {
                Some(kind) => self.events.shorthand(kind, text(source, &unicode.span)),
                None => self.unsupported(&unicode.span),
            },
            Ast::ClassPerl(perl) => self
                .events
                .shorthand(perl_kind(perl), text(source, &perl.span)),
            Ast::ClassBracketed(class) => self.class(class),
            Ast::Group(group) => {
                let kind = match &group.kind {
                    ast::GroupKind::CaptureIndex(_) => GroupKind::Capturing { name: None },
                    ast::GroupKind::CaptureName { name, .. } => GroupKind::Capturing {
                        name: Some(name.name.clone()),
                    },
                    ast::GroupKind::NonCapturing(flags) => {
                        if !flags.items.is_empty() {
                            let construct = format!("(?{}:", text(source, &flags.span));
                            self.events
                                .unsupported(&construct, self.base + group.span.start.offset)?;
                        }
                        GroupKind::NonCapturing
                    }
                };
                self.events.enter_group(kind)
            }
            Ast::Alternation(_) => {
                self.events.enter_alternation()?;
                self.events.enter_branch()
            }
        }
    }

    fn visit_post(&mut self, node: &Ast) -> WalkResult {
        match node {
            Ast::Group(_) => self.events.exit_group(),
            Ast::Alternation(_) => {
                self.events.exit_branch()?;
                self.events.exit_alternation()
            }
            Ast::Repetition(repetition) => self.events.quantifier(ast_repeat(&repetition.op.kind)),
            _ => Ok(()),
        }
    }

    fn visit_alternation_in(&mut self) -> WalkResult {
        self.events.exit_branch()?;
        self.events.enter_branch()
    }
}

/// Walks a `fancy-regex` parse tree. Character classes and shorthands are
/// left by that parser as `regex`-syntax snippets and go through [`AstWalk`].
struct ExprWalk<'a> {
    pattern: &'a str,
    events: &'a mut dyn PatternEvents,
}

impl ExprWalk<'_> {
    /// The tree carries no positions, so constructs are located by their
    /// first occurrence in the pattern.
    fn unsupported(&mut self, construct: &str) -> WalkResult {
        let offset = self.pattern.find(construct).unwrap_or_default();
        self.events.unsupported(construct, offset)
    }

    fn group(&mut self, kind: GroupKind, child: &Expr) -> WalkResult {
        self.events.enter_group(kind)?;
        self.expr(child)?;
        self.events.exit_group()
    }

    fn expr(&mut self, expr: &Expr) -> WalkResult {
        match expr {
            Expr::Empty => Ok(()),
            Expr::Any { .. } => self.events.shorthand(ShorthandKind::Any, "."),
            Expr::Assertion(assertion) => self.events.anchor(assertion_source(assertion)),
            Expr::Literal { casei: true, .. } | Expr::Delegate { casei: true, .. } => {
                self.unsupported("(?i)")
            }
            Expr::Literal { val, .. } => self.events.literal_string(val),
            Expr::Concat(children) => children.iter().try_for_each(|child| self.expr(child)),
            Expr::Alt(branches) => {
                self.events.enter_alternation()?;
                for branch in branches {
                    self.events.enter_branch()?;
                    self.expr(branch)?;
                    self.events.exit_branch()?;
                }
                self.events.exit_alternation()
            }
            Expr::Group(child) => self.group(GroupKind::Capturing { name: None }, child),
            Expr::LookAround(child, look) => {
                self.unsupported(lookaround_source(*look))?;
                self.group(GroupKind::NonCapturing, child)
            }
            Expr::AtomicGroup(child) => {
                self.unsupported("(?>")?;
                self.group(GroupKind::NonCapturing, child)
            }
            Expr::Repeat { child, lo, hi, .. } => {
                if is_atom(child) {
                    self.expr(child)?;
                } else {
                    // `(?:ab)+` parses to a bare concatenation.
                    self.group(GroupKind::NonCapturing, child)?;
                }
                let min = u32::try_from(*lo).unwrap_or(u32::MAX);
                let repeat = match u32::try_from(*hi) {
                    Ok(max) if *hi != usize::MAX => Repeat::between(min, max),
                    _ => Repeat::at_least(min),
                };
                self.events.quantifier(repeat)
            }
            Expr::Delegate { inner, .. } => {
                let tree = ast::parse::Parser::new()
                    .parse(inner)
                    .map_err(|err| PatternError::Invalid(err.to_string()))?;
                let base = self.pattern.find(inner.as_str()).unwrap_or_default();
                ast::visit(
                    &tree,
                    AstWalk {
                        source: inner,
                        base,
                        events: &mut *self.events,
                    },
                )
            }
            Expr::Backref(group) => self.events.backreference(*group),
            Expr::KeepOut => self.unsupported("\\K"),
            Expr::ContinueFromPreviousMatchEnd => self.unsupported("\\G"),
            Expr::BackrefExistsCondition(_) | Expr::Conditional { .. } => self.unsupported("(?("),
        }
    }
}

fn is_atom(expr: &Expr) -> bool {
    match expr {
        Expr::Literal { val, .. } => val.chars().count() == 1,
        Expr::Concat(_) | Expr::Alt(_) | Expr::Repeat { .. } => false,
        _ => true,
    }
}

fn ast_repeat(kind: &RepetitionKind) -> Repeat {
    match kind {
        RepetitionKind::ZeroOrOne => Repeat::optional(),
        RepetitionKind::ZeroOrMore => Repeat::at_least(0),
        RepetitionKind::OneOrMore => Repeat::at_least(1),
        RepetitionKind::Range(RepetitionRange::Exactly(count)) => Repeat::exact(*count),
        RepetitionKind::Range(RepetitionRange::AtLeast(min)) => Repeat::at_least(*min),
        RepetitionKind::Range(RepetitionRange::Bounded(min, max)) => Repeat::between(*min, *max),
    }
}

fn perl_kind(perl: &ClassPerl) -> ShorthandKind {
    match (&perl.kind, perl.negated) {
        (ClassPerlKind::Digit, false) => ShorthandKind::Digit,
        (ClassPerlKind::Digit, true) => ShorthandKind::NotDigit,
        (ClassPerlKind::Space, false) => ShorthandKind::Space,
        (ClassPerlKind::Space, true) => ShorthandKind::NotSpace,
        (ClassPerlKind::Word, false) => ShorthandKind::Word,
        (ClassPerlKind::Word, true) => ShorthandKind::NotWord,
    }
}

fn posix_class(kind: &ClassAsciiKind) -> NamedClass {
    match kind {
        ClassAsciiKind::Alnum => NamedClass::Alnum,
        ClassAsciiKind::Alpha => NamedClass::Alpha,
        ClassAsciiKind::Ascii => NamedClass::Ascii,
        ClassAsciiKind::Blank => NamedClass::Blank,
        ClassAsciiKind::Cntrl => NamedClass::Cntrl,
        ClassAsciiKind::Digit => NamedClass::Digit,
        ClassAsciiKind::Graph => NamedClass::Graph,
        ClassAsciiKind::Lower => NamedClass::Lower,
        ClassAsciiKind::Print => NamedClass::Print,
        ClassAsciiKind::Punct => NamedClass::Punct,
        ClassAsciiKind::Space => NamedClass::Space,
        ClassAsciiKind::Upper => NamedClass::Upper,
        ClassAsciiKind::Word => NamedClass::Word,
        ClassAsciiKind::Xdigit => NamedClass::XDigit,
    }
}

/// Shorthand for a `\p{..}` class, when its property has a usable ASCII
/// sample.
fn property_kind(unicode: &ClassUnicode) -> Option<ShorthandKind> {
    let class = match &unicode.kind {
        ClassUnicodeKind::OneLetter(letter) => NamedClass::from_property(&letter.to_string()),
        ClassUnicodeKind::Named(name) => NamedClass::from_property(name),
        ClassUnicodeKind::NamedValue { name, value, .. }
            if matches!(name.as_str(), "gc" | "general_category") =>
        {
            NamedClass::from_property(value)
        }
        ClassUnicodeKind::NamedValue { .. } => None,
    }?;
    Some(if unicode.is_negated() {
        ShorthandKind::NotNamed(class)
    } else {
        ShorthandKind::Named(class)
    })
}

fn assertion_source(assertion: &Assertion) -> &'static str {
    match assertion {
        Assertion::StartText => "^",
        Assertion::EndText => "$",
        Assertion::StartLine { .. } => "(?m:^)",
        Assertion::EndLine { .. } => "(?m:$)",
        Assertion::LeftWordBoundary => "\\<",
        Assertion::RightWordBoundary => "\\>",
        Assertion::WordBoundary => "\\b",
        Assertion::NotWordBoundary => "\\B",
    }
}

fn lookaround_source(look: LookAround) -> &'static str {
    match look {
        LookAround::LookAhead => "(?=",
        LookAround::LookAheadNeg => "(?!",
        LookAround::LookBehind => "(?<=",
        LookAround::LookBehindNeg => "(?<!",
    }
}
