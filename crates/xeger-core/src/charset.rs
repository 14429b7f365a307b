use std::fmt;
use std::hash::{Hash, Hasher};

use rand::{Rng, RngCore};

/// Lowest code point of the printable working window.
pub const PRINTABLE_MIN: u32 = 32;
/// Highest code point of the printable working window.
pub const PRINTABLE_MAX: u32 = 126;

const WORD_BITS: u32 = 64;

/// A set of characters over a growable bit vector.
///
/// Capacity grows monotonically to the highest code point ever referenced
/// (the "ceiling"). Sets built as initially populated back-fill new capacity
/// as members; all other sets back-fill it as non-members. Complement is
/// taken against the current ceiling only.
#[derive(Debug, Clone)]
pub struct CharSet {
    words: Vec<u64>,
    ceiling: u32,
    populated: bool,
}

impl CharSet {
    /// An empty set whose growth back-fills as empty.
    pub fn new() -> Self {
        Self {
            words: vec![0],
            ceiling: 0,
            populated: false,
        }
    }

    /// A set with `first..=last` switched on that keeps back-filling
    /// membership as its ceiling grows.
    pub fn populated(first: char, last: char) -> Self {
        let (low, high) = ordered(first as u32, last as u32);
        let mut set = Self {
            words: vec![0; words_for(high)],
            ceiling: high,
            populated: true,
        };
        set.set_span(low, high, true);
        set
    }

    /// The printable working window, `' '..='~'`.
    pub fn printable() -> Self {
        let mut set = Self::new();
        set.add_span(PRINTABLE_MIN, PRINTABLE_MAX);
        set
    }

    pub fn from_chars(chars: &str) -> Self {
        let mut set = Self::new();
        for c in chars.chars() {
            set.add(c);
        }
        set
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn add(&mut self, c: char) {
        let cp = c as u32;
        self.grow(cp);
        self.set_bit(cp, true);
    }

    pub fn remove(&mut self, c: char) {
        let cp = c as u32;
        self.grow(cp);
        self.set_bit(cp, false);
    }

    /// Adds every character between the two bounds, in either order.
    pub fn add_range(&mut self, start: char, end: char) {
        let (low, high) = ordered(start as u32, end as u32);
        self.add_span(low, high);
    }

    pub fn remove_range(&mut self, start: char, end: char) {
        let (low, high) = ordered(start as u32, end as u32);
        self.grow(high);
        self.set_span(low, high, false);
    }

    /// Adds every member of `other` to this set.
    pub fn extend_from(&mut self, other: &CharSet) {
        self.grow(other.ceiling);
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            *word |= theirs;
        }
    }

    /// Removes every member of `other` from this set.
    pub fn subtract(&mut self, other: &CharSet) {
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            *word &= !theirs;
        }
    }

    pub fn contains(&self, c: char) -> bool {
        let cp = c as u32;
        cp <= self.ceiling && self.bit(cp)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        (0..=self.ceiling)
            .filter(|cp| self.bit(*cp))
            .filter_map(char::from_u32)
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        let mut result = self.widened(other.ceiling);
        for (word, theirs) in result.words.iter_mut().zip(&other.words) {
            *word |= theirs;
        }
        result
    }

    pub fn intersection(&self, other: &CharSet) -> CharSet {
        let mut result = self.widened(other.ceiling);
        for (idx, word) in result.words.iter_mut().enumerate() {
            *word &= other.words.get(idx).copied().unwrap_or(0);
        }
        result
    }

    pub fn xor(&self, other: &CharSet) -> CharSet {
        let mut result = self.widened(other.ceiling);
        for (word, theirs) in result.words.iter_mut().zip(&other.words) {
            *word ^= theirs;
        }
        result
    }

    /// Every code point up to the ceiling that is not a member.
    pub fn complement(&self) -> CharSet {
        let mut result = CharSet {
            words: self.words.iter().map(|word| !word).collect(),
            ceiling: self.ceiling,
            populated: !self.populated,
        };
        result.clear_above_ceiling();
        result
    }

    /// Picks one member uniformly at random, or `None` when the set is empty.
    pub fn pick(&self, rng: &mut dyn RngCore) -> Option<char> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        let idx = rng.random_range(0..len);
        self.iter().nth(idx)
    }

    /// Raises the ceiling to at least `ceiling`, back-filling as the set's
    /// population mode dictates.
    pub fn widen(&mut self, ceiling: u32) {
        self.grow(ceiling);
    }

    fn add_span(&mut self, low: u32, high: u32) {
        self.grow(high);
        self.set_span(low, high, true);
    }

    fn widened(&self, ceiling: u32) -> CharSet {
        let mut copy = self.clone();
        copy.grow(ceiling);
        copy
    }

    fn grow(&mut self, to: u32) {
        if to <= self.ceiling {
            return;
        }
        let previous = self.ceiling;
        self.words.resize(words_for(to), 0);
        self.ceiling = to;
        if self.populated {
            self.set_span(previous + 1, to, true);
        }
    }

    fn set_span(&mut self, low: u32, high: u32, value: bool) {
        for cp in low..=high {
            self.set_bit(cp, value);
        }
    }

    fn clear_above_ceiling(&mut self) {
        let used = (self.ceiling % WORD_BITS) + 1;
        if used < WORD_BITS
            && let Some(last) = self.words.last_mut()
        {
            *last &= (1_u64 << used) - 1;
        }
    }

    fn bit(&self, cp: u32) -> bool {
        let (word, offset) = locate(cp);
        self.words
            .get(word)
            .is_some_and(|bits| bits & (1_u64 << offset) != 0)
    }

    fn set_bit(&mut self, cp: u32, value: bool) {
        let (word, offset) = locate(cp);
        if let Some(bits) = self.words.get_mut(word) {
            if value {
                *bits |= 1_u64 << offset;
            } else {
                *bits &= !(1_u64 << offset);
            }
        }
    }
}

impl Default for CharSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CharSet {
    fn eq(&self, other: &Self) -> bool {
        self.ceiling == other.ceiling && self.words == other.words
    }
}

impl Eq for CharSet {}

impl Hash for CharSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ceiling.hash(state);
        self.words.hash(state);
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.iter() {
            write_escaped(f, c)?;
        }
        Ok(())
    }
}

/// Writes a character the way it would appear inside a pattern.
pub fn write_escaped(out: &mut impl fmt::Write, c: char) -> fmt::Result {
    match c {
        '\n' => out.write_str("\\n"),
        '\r' => out.write_str("\\r"),
        '\t' => out.write_str("\\t"),
        '\\' => out.write_str("\\\\"),
        c if (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&(c as u32)) => out.write_char(c),
        c => write!(out, "\\u{{{:x}}}", c as u32),
    }
}

fn words_for(ceiling: u32) -> usize {
    (ceiling / WORD_BITS) as usize + 1
}

fn locate(cp: u32) -> (usize, u32) {
    ((cp / WORD_BITS) as usize, cp % WORD_BITS)
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}
