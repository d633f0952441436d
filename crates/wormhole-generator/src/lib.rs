pub mod alphabet;
pub mod random;
pub mod seq;

pub use alphabet::Alphabet;
pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use thiserror::Error;
use typed_builder::TypedBuilder;
use wormhole_core::shortcode::{MAX_LENGTH, MIN_LENGTH};
use wormhole_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// A candidate may already be taken; the caller checks the store and
/// asks again.
///
/// Implementations can vary from simple random generators to
/// counter-derived ones.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;
    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("alphabet needs at least two distinct symbols")]
    AlphabetTooSmall,
    #[error("alphabet symbol '{0}' is not allowed in a short code")]
    ForbiddenSymbol(char),
    #[error("alphabet symbol '{0}' appears more than once")]
    DuplicateSymbol(char),
    #[error("code length must be between {min} and {max}, got {length}")]
    InvalidLength { length: usize, min: usize, max: usize },
    #[error("prefix '{0}' is not a valid short code fragment")]
    InvalidPrefix(String),
}

/// Shape of generated codes.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CodeSettings {
    #[builder(default)]
    pub alphabet: Alphabet,
    /// Total length of a generated code, prefix included.
    #[builder(default = 7)]
    pub length: usize,
    /// Fixed leading fragment, e.g. a node name when several writers share a store.
    #[builder(default, setter(into))]
    pub prefix: String,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CodeSettings {
    /// Number of symbols left for the generated part.
    pub(crate) fn body_length(&self) -> usize {
        self.length - self.prefix.len()
    }

    pub(crate) fn validate(&self) -> Result<(), GeneratorError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(GeneratorError::InvalidLength {
                length: self.length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            });
        }

        if !self.prefix.chars().all(ShortCode::is_allowed_char) || self.prefix.len() >= self.length
        {
            return Err(GeneratorError::InvalidPrefix(self.prefix.clone()));
        }

        Ok(())
    }
}
