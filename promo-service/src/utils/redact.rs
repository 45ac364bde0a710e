use std::fmt;

const VISIBLE_CHARS: usize = 4;

/// Log-safe rendering of a redemption token: the first few characters, then
/// a fixed mask.
pub struct TokenPrefix<'a>(pub &'a str);

impl fmt::Display for TokenPrefix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(VISIBLE_CHARS).collect();
        write!(f, "{}***", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_prefix_is_shown() {
        assert_eq!(TokenPrefix("ABC12345").to_string(), "ABC1***");
        assert_eq!(TokenPrefix("AB").to_string(), "AB***");
        assert_eq!(TokenPrefix("ÄÖÜßXYZ").to_string(), "ÄÖÜß***");
    }
}
