use crate::{CodeSettings, Generator, GeneratorError};
use rand::Rng;
use wormhole_core::ShortCode;

/// Draws every symbol uniformly at random from the configured alphabet.
///
/// With base62 and 7 symbols there are about 3.5e12 codes, so collisions
/// stay rare until the store holds billions of links.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    settings: CodeSettings,
}

impl RandomGenerator {
    pub fn new(settings: CodeSettings) -> Result<Self, GeneratorError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &CodeSettings {
        &self.settings
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            settings: CodeSettings::default(),
        }
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let alphabet = &self.settings.alphabet;
        let mut rng = rand::rng();

        let mut code = String::with_capacity(self.settings.length);
        code.push_str(&self.settings.prefix);
        for _ in 0..self.settings.body_length() {
            code.push(alphabet.symbol(rng.random_range(0..alphabet.len())));
        }

        // Alphabet, prefix and length were validated in `new`.
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Alphabet;
    use std::collections::HashSet;

    #[test]
    fn codes_have_configured_length() {
        let generator =
            RandomGenerator::new(CodeSettings::builder().length(8).build()).unwrap();

        for _ in 0..100 {
            assert_eq!(generator.generate().as_str().len(), 8);
        }
    }

    #[test]
    fn codes_only_use_alphabet_symbols() {
        let settings = CodeSettings::builder()
            .alphabet(Alphabet::new("xyz").unwrap())
            .length(6)
            .build();
        let generator = RandomGenerator::new(settings).unwrap();

        for _ in 0..100 {
            let code = generator.generate();
            assert!(code.as_str().chars().all(|c| "xyz".contains(c)));
        }
    }

    #[test]
    fn generated_codes_pass_validation() {
        let generator = RandomGenerator::default();
        for _ in 0..100 {
            let code = generator.generate();
            assert!(ShortCode::new(code.as_str()).is_ok());
        }
    }

    #[test]
    fn prefix_is_kept() {
        let settings = CodeSettings::builder().prefix("n1-").length(9).build();
        let generator = RandomGenerator::new(settings).unwrap();

        let code = generator.generate();
        assert!(code.as_str().starts_with("n1-"));
        assert_eq!(code.as_str().len(), 9);
    }

    #[test]
    fn default_codes_rarely_repeat() {
        let generator = RandomGenerator::default();
        let codes: HashSet<_> = (0..1_000).map(|_| generator.generate()).collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(RandomGenerator::new(CodeSettings::builder().length(1).build()).is_err());
    }
}
