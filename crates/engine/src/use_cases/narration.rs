//! Narration parsing: numbered choices and cleaned scene text.
//!
//! The narrator is asked to end each scene with numbered options. A line is
//! an option if, after leading whitespace, it starts with digits followed by
//! `.`, `)` or `-`. The grammar is intentionally permissive and ambiguous: a
//! narration line like `3- wolves circle you` parses as option 3. Kept as-is
//! for compatibility with existing prompts.

use std::collections::BTreeMap;

use regex_lite::Regex;

/// Parses assistant narration into choices and clean prose.
///
/// `parse` and `clean_narration` partition lines consistently: every line
/// classified as an option by one is excluded from the other's output.
#[derive(Debug, Clone)]
pub struct NarrationParser {
    option_line: Regex,
    bold: Regex,
}

impl Default for NarrationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrationParser {
    // Both patterns are literals, exercised by every test below.
    #[allow(clippy::unwrap_used)]
    pub fn new() -> Self {
        Self {
            option_line: Regex::new(r"^\s*(\d+)[.)-]\s*(.*)$").unwrap(),
            bold: Regex::new(r"\*\*(.*?)\*\*").unwrap(),
        }
    }

    /// Classify one line. The single source of truth for the partition
    /// between options and narration.
    fn match_option(&self, line: &str) -> Option<(u32, String)> {
        let caps = self.option_line.captures(line)?;
        // A digit run too long for u32 is treated as narration.
        let number: u32 = caps[1].parse().ok()?;
        let text = self.strip_bold(caps[2].trim());
        Some((number, text))
    }

    /// Extract the numbered choices from narrated text.
    ///
    /// Duplicate numbers within one text overwrite earlier occurrences;
    /// last one wins.
    pub fn parse(&self, text: &str) -> BTreeMap<u32, String> {
        let mut options = BTreeMap::new();
        for line in text.lines() {
            if let Some((number, option_text)) = self.match_option(line) {
                options.insert(number, option_text);
            }
        }
        options
    }

    /// The narrated text with all option lines removed and bold markup
    /// stripped, trimmed of surrounding whitespace.
    pub fn clean_narration(&self, text: &str) -> String {
        let kept: Vec<&str> = text
            .lines()
            .filter(|line| self.match_option(line).is_none())
            .collect();
        self.strip_bold(&kept.join("\n")).trim().to_string()
    }

    fn strip_bold(&self, text: &str) -> String {
        self.bold.replace_all(text, "$1").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> NarrationParser {
        NarrationParser::new()
    }

    #[test]
    fn parses_all_three_delimiters() {
        let text = "1. Go north\n2) Go south\n3- Wait\nRandom line";
        let options = parser().parse(text);
        assert_eq!(options.len(), 3);
        assert_eq!(options[&1], "Go north");
        assert_eq!(options[&2], "Go south");
        assert_eq!(options[&3], "Wait");
    }

    #[test]
    fn narration_keeps_only_non_option_lines() {
        let text = "1. Go north\n2) Go south\n3- Wait\nRandom line";
        assert_eq!(parser().clean_narration(text), "Random line");
    }

    #[test]
    fn parse_and_clean_partition_every_line() {
        let text = "The hall is silent.\n  1. Push the door\nDust falls.\n2) Turn back\n";
        let p = parser();
        let options = p.parse(text);
        let narration = p.clean_narration(text);

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let in_options = options.values().any(|v| line.contains(v.as_str()));
            let in_narration = narration.contains(line.trim());
            assert!(
                in_options ^ in_narration,
                "line {line:?} must land in exactly one output"
            );
        }
    }

    #[test]
    fn parse_is_idempotent() {
        let text = "Something stirs.\n1. Draw your blade\n2. Run";
        let p = parser();
        assert_eq!(p.parse(text), p.parse(text));
    }

    #[test]
    fn duplicate_numbers_last_wins() {
        let options = parser().parse("1. First\n1. Second");
        assert_eq!(options[&1], "Second");
    }

    #[test]
    fn leading_whitespace_and_bold_are_handled() {
        let options = parser().parse("   2.   **Flee** into the dark  ");
        assert_eq!(options[&2], "Flee into the dark");
    }

    #[test]
    fn bold_markup_is_stripped_from_narration() {
        assert_eq!(
            parser().clean_narration("You find a **glowing** sword."),
            "You find a glowing sword."
        );
    }

    #[test]
    fn empty_input_yields_empty_outputs() {
        let p = parser();
        assert!(p.parse("").is_empty());
        assert_eq!(p.clean_narration(""), "");
    }

    #[test]
    fn text_without_options_passes_through() {
        let text = "A cold wind blows.";
        let p = parser();
        assert!(p.parse(text).is_empty());
        assert_eq!(p.clean_narration(text), text);
    }

    #[test]
    fn digit_dash_prose_is_still_an_option() {
        // Ambiguous by construction; the permissive grammar is preserved.
        let options = parser().parse("3- wolves circle you");
        assert_eq!(options[&3], "wolves circle you");
    }

    #[test]
    fn digit_run_exceeding_u32_is_narration() {
        let text = "99999999999999999999. not a real option";
        let p = parser();
        assert!(p.parse(text).is_empty());
        assert_eq!(p.clean_narration(text), text);
    }
}
