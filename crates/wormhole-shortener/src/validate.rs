use url::Url;
use wormhole_core::ShortenerError;

/// Checks that `raw` is an absolute http(s) URL with a host.
///
/// The string itself is never rewritten; callers store what they were given.
pub fn validate_url(raw: &str, max_length: usize) -> Result<(), ShortenerError> {
    if raw.trim().is_empty() {
        return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
    }

    if raw.len() > max_length {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL is {} bytes long, the limit is {max_length}",
            raw.len()
        )));
    }

    // The URL parser silently drops tabs and newlines, but the stored string
    // must be usable verbatim as a Location header.
    if raw.chars().any(char::is_control) {
        return Err(ShortenerError::InvalidUrl(
            "URL contains control characters".to_string(),
        ));
    }

    let parsed = Url::parse(raw)
        .map_err(|e| ShortenerError::InvalidUrl(format!("invalid URL format: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ShortenerError::InvalidUrl(format!(
            "URL scheme must be http or https, got {}",
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(ShortenerError::InvalidUrl(format!("URL has no host: {raw}"))),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(raw: &str) -> bool {
        matches!(validate_url(raw, 2048), Err(ShortenerError::InvalidUrl(_)))
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_url("https://example.com", 2048).is_ok());
        assert!(validate_url("http://example.com:8080/a/b?c=d#e", 2048).is_ok());
    }

    #[test]
    fn rejects_empty_relative_and_foreign_schemes() {
        assert!(rejected(""));
        assert!(rejected("   "));
        assert!(rejected("not-a-valid-url"));
        assert!(rejected("/relative/path"));
        assert!(rejected("javascript:alert(1)"));
        assert!(rejected("ftp://example.com/file"));
        assert!(rejected("mailto:someone@example.com"));
    }

    #[test]
    fn enforces_the_length_limit() {
        let url = format!("https://example.com/{}", "a".repeat(100));
        assert!(validate_url(&url, url.len()).is_ok());
        assert!(validate_url(&url, url.len() - 1).is_err());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(rejected("https://example.com/a\nb"));
        assert!(rejected("https://exa\tmple.com/"));
        assert!(rejected("https://example.com/\r"));
        assert!(rejected("https://example.com/\u{7f}"));
    }

    #[test]
    fn accepts_non_ascii_paths() {
        assert!(validate_url("https://example.com/café", 2048).is_ok());
    }
}
