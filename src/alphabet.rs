//! The fixed symbol universe and the seeded permutation used to disguise
//! base64 text.

use crate::mt19937::Mt19937;
use crate::substitution::SubstitutionMap;
use std::sync::LazyLock;

/// Seed of the deployed permutation.
pub const SEED: u64 = 42;

pub const BASE64_SYMBOLS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Punctuation appended after the base64 alphabet. `+` appears here a second
/// time; existing files were produced with exactly this sequence.
pub const EXTRA_SYMBOLS: &str = "!@#$%^&*()_-=+[]{}|;:,.<>?`~ ";

static DEPLOYED: LazyLock<AlphabetTable> =
    LazyLock::new(|| AlphabetTable::new(SymbolUniverse::deployed(), SEED));

/// Ordered symbol sequence zipped against its own shuffle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolUniverse {
    symbols: Vec<char>,
}

impl SymbolUniverse {
    pub fn new(symbols: impl IntoIterator<Item = char>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// Base64 alphabet followed by [`EXTRA_SYMBOLS`]: 93 slots, 92 distinct.
    pub fn deployed() -> Self {
        Self::new(BASE64_SYMBOLS.chars().chain(EXTRA_SYMBOLS.chars()))
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_distinct(&self) -> bool {
        let mut seen = Vec::with_capacity(self.symbols.len());
        for &c in &self.symbols {
            if seen.contains(&c) {
                return false;
            }
            seen.push(c);
        }
        true
    }
}

/// Forward and inverse substitution maps derived from one universe and seed.
///
/// Both maps are built by walking the slots in order, so a symbol that occurs
/// twice on either side keeps the mapping of its last slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphabetTable {
    universe: SymbolUniverse,
    shuffled: Vec<char>,
    encode: SubstitutionMap,
    decode: SubstitutionMap,
}

impl AlphabetTable {
    pub fn new(universe: SymbolUniverse, seed: u64) -> Self {
        let mut shuffled = universe.symbols.clone();
        Mt19937::from_seed(seed).shuffle(&mut shuffled);

        let mut encode = SubstitutionMap::new();
        let mut decode = SubstitutionMap::new();
        for (&original, &disguised) in universe.symbols.iter().zip(&shuffled) {
            encode.insert(original, disguised);
            decode.insert(disguised, original);
        }

        Self {
            universe,
            shuffled,
            encode,
            decode,
        }
    }

    /// The table every existing `.encrypted` file was written with, built once
    /// per process.
    pub fn deployed() -> &'static AlphabetTable {
        &DEPLOYED
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    pub fn shuffled(&self) -> &[char] {
        &self.shuffled
    }

    pub fn encode_map(&self) -> &SubstitutionMap {
        &self.encode
    }

    pub fn decode_map(&self) -> &SubstitutionMap {
        &self.decode
    }

    /// Universe symbols that do not survive an encode/decode round trip.
    ///
    /// Non-empty whenever the shuffle places a repeated symbol on two slots:
    /// both originals encode to it but it decodes to only one of them.
    pub fn collisions(&self) -> Vec<char> {
        let mut lost: Vec<char> = self
            .universe
            .symbols
            .iter()
            .copied()
            .filter(|&c| {
                let disguised = self.encode.get(c);
                disguised.and_then(|d| self.decode.get(d)) != Some(c)
            })
            .collect();
        lost.sort_unstable();
        lost.dedup();
        lost
    }
}
