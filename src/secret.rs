use core::fmt;

/// Shortest key the provider has ever issued.
pub const MIN_API_KEY_LEN: usize = 10;

/// API key for the chat provider.
///
/// The value is only reachable through [`ApiKey::expose`]. `Debug` never prints it
/// and there is no `Display` impl.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_owned())
    }

    /// Parse user input, rejecting keys that are obviously malformed.
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let key = Self::new(input);
        if key.0.chars().count() < MIN_API_KEY_LEN {
            anyhow::bail!("API key must be at least {MIN_API_KEY_LEN} characters long");
        }
        if key.0.chars().any(char::is_whitespace) {
            anyhow::bail!("API key must not contain whitespace");
        }
        Ok(key)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rendering safe for terminals: only the last four characters survive,
    /// and only when the key is long enough that they don't give much away.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 12 {
            return "****".to_owned();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_the_key() {
        let key = ApiKey::new("sk-nano-0123456789abcdef");
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("0123456789"));
        assert_eq!(rendered, "ApiKey(<redacted>)");
    }

    #[test]
    fn masked_keeps_only_the_tail() {
        assert_eq!(ApiKey::new("sk-nano-0123456789abcdef").masked(), "****cdef");
        assert_eq!(ApiKey::new("short-key1").masked(), "****");
    }

    #[test]
    fn parse_trims_and_validates() {
        let key = ApiKey::parse("  sk-nano-0123456789 \n").unwrap();
        assert_eq!(key.expose(), "sk-nano-0123456789");

        assert!(ApiKey::parse("tiny").is_err());
        assert!(ApiKey::parse("sk-nano 0123456789").is_err());
        assert!(ApiKey::parse("   ").is_err());
    }

    #[test]
    fn whitespace_only_key_counts_as_empty() {
        assert!(ApiKey::new("  ").is_empty());
        assert!(!ApiKey::new("sk-nano-0123456789").is_empty());
    }
}
