//! Character-for-character substitution with pass-through.

const ASCII_LEN: usize = 128;

/// Dense ASCII lookup. Characters without an entry, and every non-ASCII
/// character, map to themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionMap {
    table: [Option<u8>; ASCII_LEN],
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self {
            table: [None; ASCII_LEN],
        }
    }

    /// Inserts `from -> to`, replacing any previous entry for `from`.
    /// Pairs involving non-ASCII characters are ignored.
    pub fn insert(&mut self, from: char, to: char) {
        if from.is_ascii() && to.is_ascii() {
            self.table[from as usize] = Some(to as u8);
        }
    }

    pub fn get(&self, c: char) -> Option<char> {
        if c.is_ascii() {
            self.table[c as usize].map(char::from)
        } else {
            None
        }
    }

    #[inline]
    pub fn apply(&self, c: char) -> char {
        self.get(c).unwrap_or(c)
    }

    pub fn len(&self) -> usize {
        self.table.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.table
            .iter()
            .enumerate()
            .filter_map(|(from, to)| to.map(|to| (char::from(from as u8), char::from(to))))
    }
}

impl Default for SubstitutionMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverses the disguise: every mapped character is replaced, everything else
/// (newlines, stray bytes, non-ASCII) passes through untouched.
pub fn decode(text: &str, map: &SubstitutionMap) -> String {
    substitute(text, map)
}

/// Applies the forward map. Same pass-through rule as [`decode`].
pub fn encode(text: &str, map: &SubstitutionMap) -> String {
    substitute(text, map)
}

fn substitute(text: &str, map: &SubstitutionMap) -> String {
    let mut out = String::with_capacity(text.len());
    out.extend(text.chars().map(|c| map.apply(c)));
    out
}
