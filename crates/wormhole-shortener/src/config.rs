use typed_builder::TypedBuilder;

/// Route segments a custom alias may not take.
pub const RESERVED_WORDS: &[&str] = &["api", "shorten", "health"];

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Generated candidates tried before giving up with `GenerationExhausted`.
    #[builder(default = 5)]
    pub max_attempts: u32,
    /// Longest accepted `original_url`, in bytes.
    #[builder(default = 2048)]
    pub max_url_length: usize,
    #[builder(default = RESERVED_WORDS.iter().map(|w| w.to_string()).collect())]
    pub reserved_words: Vec<String>,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ShortenerConfig {
    pub fn is_reserved(&self, code: &str) -> bool {
        self.reserved_words
            .iter()
            .any(|word| word.eq_ignore_ascii_case(code))
    }
}
