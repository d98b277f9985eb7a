//! Confirmation preview of a received script

use std::fmt;

/// Appended to a preview that was cut short
pub const TRUNCATION_MARKER: &str = "\n\n... (truncated)";

/// The prefix of a script shown to the operator before it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPreview {
    text: String,
    truncated: bool,
    total_chars: usize,
}

impl ScriptPreview {
    /// Keep the first `limit` characters of `script`, marking any cut
    pub fn new(script: &str, limit: usize) -> Self {
        let total_chars = script.chars().count();

        match script.char_indices().nth(limit) {
            Some((cut, _)) => Self {
                text: format!("{}{}", &script[..cut], TRUNCATION_MARKER),
                truncated: true,
                total_chars,
            },
            None => Self {
                text: script.to_string(),
                truncated: false,
                total_chars,
            },
        }
    }

    /// Preview text, including the marker when truncated
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the script was longer than the limit
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Length of the full script in characters
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Full confirmation message
    pub fn prompt(&self) -> String {
        format!("Script received:\n\n{}\n\nExecute this script now?", self.text)
    }
}

impl fmt::Display for ScriptPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_script_is_truncated() {
        let script = "a".repeat(5000);
        let preview = ScriptPreview::new(&script, 4000);

        assert!(preview.is_truncated());
        assert_eq!(preview.text(), format!("{}{}", "a".repeat(4000), TRUNCATION_MARKER));
        assert_eq!(preview.total_chars(), 5000);
    }

    #[test]
    fn test_short_script_is_whole() {
        let script = "b".repeat(100);
        let preview = ScriptPreview::new(&script, 4000);

        assert!(!preview.is_truncated());
        assert_eq!(preview.text(), script);
    }

    #[test]
    fn test_exact_limit_is_not_truncated() {
        let script = "c".repeat(4000);
        assert!(!ScriptPreview::new(&script, 4000).is_truncated());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let script = "é".repeat(10);
        let preview = ScriptPreview::new(&script, 4);
        assert_eq!(preview.text(), format!("éééé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_prompt() {
        let preview = ScriptPreview::new("fn run(ctx) {}", 4000);
        assert_eq!(
            preview.prompt(),
            "Script received:\n\nfn run(ctx) {}\n\nExecute this script now?"
        );
    }
}
