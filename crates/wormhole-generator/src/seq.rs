use crate::{CodeSettings, Generator, GeneratorError};
use std::sync::atomic::{AtomicU64, Ordering};
use wormhole_core::shortcode::MAX_LENGTH;
use wormhole_core::ShortCode;

/// A counter-derived short code generator.
///
/// Each call takes the next counter value, spells it in the configured
/// alphabet and left-pads it to the configured length, e.g. `wh00000`,
/// `wh00001`. Codes are unique within one instance without touching
/// storage.
///
/// For distributed deployments, each node should use a unique prefix
/// (e.g., "a-", "b-"), or a distinct offset, to keep nodes apart.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    settings: CodeSettings,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            settings: self.settings.clone(),
        }
    }
}

impl SeqGenerator {
    /// Creates a generator starting at zero.
    pub fn new(settings: CodeSettings) -> Result<Self, GeneratorError> {
        Self::with_offset(settings, 0)
    }

    /// Creates a generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across nodes (e.g., node 1 starts at 0, node 2 at 1_000_000).
    pub fn with_offset(settings: CodeSettings, offset: u64) -> Result<Self, GeneratorError> {
        settings.validate()?;

        // Even the largest counter value has to fit in a short code.
        let widest = settings.prefix.len()
            + settings
                .alphabet
                .encode(u64::MAX)
                .len()
                .max(settings.body_length());
        if widest > MAX_LENGTH {
            return Err(GeneratorError::InvalidLength {
                length: widest,
                min: settings.length,
                max: MAX_LENGTH,
            });
        }

        Ok(Self {
            counter: AtomicU64::new(offset),
            settings,
        })
    }

    /// The counter value the next `generate` call will use.
    pub fn position(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Moves the counter forward to `position`. It never moves back.
    pub fn advance_to(&self, position: u64) {
        self.counter.fetch_max(position, Ordering::SeqCst);
    }

    /// The code for one counter value, without consuming it.
    pub fn code_at(&self, count: u64) -> ShortCode {
        let digits = self.settings.alphabet.encode(count);
        let padding = self.settings.body_length().saturating_sub(digits.len());

        let mut code = String::with_capacity(self.settings.length.max(digits.len()));
        code.push_str(&self.settings.prefix);
        for _ in 0..padding {
            code.push(self.settings.alphabet.symbol(0));
        }
        code.push_str(&digits);

        ShortCode::new_unchecked(code)
    }
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        self.code_at(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Alphabet;

    fn settings(prefix: &str, length: usize) -> CodeSettings {
        CodeSettings::builder()
            .alphabet(Alphabet::new("0123456789").unwrap())
            .prefix(prefix)
            .length(length)
            .build()
    }

    #[test]
    fn produces_sequential_codes() {
        let generator = SeqGenerator::new(settings("wh", 8)).unwrap();

        assert_eq!(generator.generate().as_str(), "wh000000");
        assert_eq!(generator.generate().as_str(), "wh000001");
        assert_eq!(generator.generate().as_str(), "wh000002");
    }

    #[test]
    fn with_offset() {
        let generator = SeqGenerator::with_offset(settings("wh", 8), 1000).unwrap();

        assert_eq!(generator.generate().as_str(), "wh001000");
        assert_eq!(generator.generate().as_str(), "wh001001");
    }

    #[test]
    fn uses_configured_alphabet() {
        let generator = SeqGenerator::with_offset(CodeSettings::default(), 62).unwrap();
        assert_eq!(generator.generate().as_str(), "0000010");
    }

    #[test]
    fn grows_past_padding_instead_of_wrapping() {
        let generator = SeqGenerator::with_offset(settings("", 3), 1234).unwrap();
        assert_eq!(generator.generate().as_str(), "1234");
    }

    #[test]
    fn rejects_alphabets_too_narrow_for_the_counter() {
        let settings = CodeSettings::builder()
            .alphabet(Alphabet::new("01").unwrap())
            .build();
        assert!(matches!(
            SeqGenerator::new(settings),
            Err(GeneratorError::InvalidLength { length: 64, .. })
        ));
    }

    #[test]
    fn advance_only_moves_forward() {
        let generator = SeqGenerator::with_offset(settings("wh", 8), 10).unwrap();
        assert_eq!(generator.code_at(42).as_str(), "wh000042");
        assert_eq!(generator.position(), 10);

        generator.advance_to(25);
        generator.advance_to(3);
        assert_eq!(generator.position(), 25);
        assert_eq!(generator.generate().as_str(), "wh000025");
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqGenerator>();
    }

    #[test]
    fn clone_preserves_counter_state() {
        let generator = SeqGenerator::new(settings("wh", 8)).unwrap();
        generator.generate();
        generator.generate();

        let cloned = generator.clone();

        assert_eq!(generator.generate().as_str(), "wh000002");
        assert_eq!(cloned.generate().as_str(), "wh000002");
    }
}
