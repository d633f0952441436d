use crate::GeneratorError;
use std::str::FromStr;
use wormhole_core::ShortCode;

pub const BASE62: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// An ordered set of URL-safe symbols used to spell generated codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> Result<Self, GeneratorError> {
        let mut seen = Vec::with_capacity(symbols.len());
        for c in symbols.chars() {
            if !ShortCode::is_allowed_char(c) {
                return Err(GeneratorError::ForbiddenSymbol(c));
            }
            if seen.contains(&c) {
                return Err(GeneratorError::DuplicateSymbol(c));
            }
            seen.push(c);
        }

        if seen.len() < 2 {
            return Err(GeneratorError::AlphabetTooSmall);
        }

        Ok(Self { symbols: seen })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, index: usize) -> char {
        self.symbols[index]
    }

    /// Spells `value` in this alphabet's base, most significant symbol first.
    pub fn encode(&self, mut value: u64) -> String {
        let base = self.symbols.len() as u64;
        let mut digits = Vec::new();
        loop {
            digits.push(self.symbols[(value % base) as usize]);
            value /= base;
            if value == 0 {
                break;
            }
        }
        digits.iter().rev().collect()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            symbols: BASE62.chars().collect(),
        }
    }
}

impl FromStr for Alphabet {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
