//! Element model for pattern-driven string synthesis.
//!
//! This crate holds the character-set algebra, the closed set of element
//! variants a pattern dissects into, and the arena that stores element trees.
//! Building, emitting and confounding trees lives in `xeger-generate`.

pub mod arena;
pub mod charset;
pub mod element;
pub mod error;

pub use arena::{Arena, ElementId, ElementTree};
pub use charset::{CharSet, PRINTABLE_MAX, PRINTABLE_MIN};
pub use element::{Element, ElementKind, NamedClass, Repeat, Selection, ShorthandKind};
pub use error::{Error, Result};

/// Emitted when a character pick has nothing to choose from.
///
/// It sits just past the printable window, so it cannot satisfy a class
/// that was confounded down to an empty printable alphabet.
pub const FALLBACK_CHAR: char = '\u{7f}';
