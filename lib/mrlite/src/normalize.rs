use crate::api::Normalizer;
use regex::Regex;

/// Default line normalizer: ASCII lowercase, then keep the leading `[a-z0-9]`
/// run. Blank lines and lines starting with anything else are invalid.
#[derive(Clone, Debug)]
pub struct AlnumPrefix {
    prefix: Regex,
}

impl AlnumPrefix {
    pub fn new() -> Self {
        Self { prefix: Regex::new(r"^[a-z0-9]+").expect("static pattern compiles") }
    }
}

impl Default for AlnumPrefix {
    fn default() -> Self { Self::new() }
}

impl Normalizer for AlnumPrefix {
    fn normalize(&self, raw: &str) -> Option<String> {
        let folded = raw.to_ascii_lowercase();
        self.prefix.find(&folded).map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_and_keeps_leading_run() {
        let n = AlnumPrefix::new();
        assert_eq!(n.normalize("Apple"), Some("apple".to_string()));
        assert_eq!(n.normalize("BANANA split"), Some("banana".to_string()));
        assert_eq!(n.normalize("route66!"), Some("route66".to_string()));
        assert_eq!(n.normalize("cherry\r"), Some("cherry".to_string()));
    }

    #[test]
    fn blank_and_punctuation_lines_are_invalid() {
        let n = AlnumPrefix::new();
        assert_eq!(n.normalize(""), None);
        assert_eq!(n.normalize("   "), None);
        assert_eq!(n.normalize("--- ..."), None);
        assert_eq!(n.normalize(" leading space"), None);
    }

    #[test]
    fn non_ascii_letters_end_the_key() {
        let n = AlnumPrefix::new();
        assert_eq!(n.normalize("caf\u{e9}"), Some("caf".to_string()));
        assert_eq!(n.normalize("\u{c9}lan"), None);
    }
}
