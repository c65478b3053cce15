//! Text sanitisation for the page description.
//!
//! Clinician-entered text is embedded in a LaTeX page description, where a stray `%`, `&` or
//! `\` changes the meaning of the document. Every leaf string goes through [`Sanitizer`] before
//! it reaches a renderer.
//!
//! Escaping is driven by an ordered, immutable list of [`EscapeRule`]s applied in a single
//! left-to-right scan: at each input position the first matching rule wins and its replacement
//! is emitted without being scanned again. The backslash rule comes first and line breaks
//! second, so the braces inside `\textbackslash{}` or the backslash of `\newline` are never
//! mistaken for user text.

use std::sync::Arc;

/// The forced-line-break token of the target markup.
pub const FORCED_LINE_BREAK: &str = "\\newline ";

/// What an [`EscapeRule`] matches at the current input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// A single character.
    Char(char),
    /// `\r\n`, `\n` or `\r`.
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeRule {
    pub matcher: Matcher,
    pub replacement: &'static str,
}

const fn rule(c: char, replacement: &'static str) -> EscapeRule {
    EscapeRule {
        matcher: Matcher::Char(c),
        replacement,
    }
}

/// LaTeX rules in application order.
pub const LATEX_RULES: &[EscapeRule] = &[
    rule('\\', "\\textbackslash{}"),
    EscapeRule {
        matcher: Matcher::LineBreak,
        replacement: FORCED_LINE_BREAK,
    },
    rule('&', "\\&"),
    rule('%', "\\%"),
    rule('$', "\\$"),
    rule('#', "\\#"),
    rule('_', "\\_"),
    rule('{', "\\{"),
    rule('}', "\\}"),
    rule('~', "\\textasciitilde{}"),
    rule('^', "\\textasciicircum{}"),
    rule('<', "\\textless{}"),
    rule('>', "\\textgreater{}"),
    rule('|', "\\textbar{}"),
    rule('"', "\\textquotedbl{}"),
    rule('\'', "\\textquotesingle{}"),
    rule('`', "\\textasciigrave{}"),
];

/// Sanitised text together with the trimmed source it came from.
///
/// Renderers normally embed [`SafeText::escaped`]. Wrapping needs the source so that forced
/// breaks are inserted between source characters and never inside an escape sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeText {
    source: String,
    escaped: String,
}

impl SafeText {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn escaped(&self) -> &str {
        &self.escaped
    }

    pub fn is_empty(&self) -> bool {
        self.escaped.is_empty()
    }
}

/// Escapes arbitrary strings for embedding in the page description.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Arc<[EscapeRule]>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::latex()
    }
}

impl Sanitizer {
    /// Builds a sanitizer over a caller-supplied rule list.
    pub fn new(rules: Vec<EscapeRule>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// The sanitizer for the LaTeX page description.
    pub fn latex() -> Self {
        Self::new(LATEX_RULES.to_vec())
    }

    /// Sanitises `raw`.
    ///
    /// `None`, empty and whitespace-only input yield an empty string. Otherwise the input is
    /// trimmed and escaped.
    pub fn sanitize(&self, raw: Option<&str>) -> String {
        self.sanitize_text(raw).escaped
    }

    /// Like [`Sanitizer::sanitize`] but keeps the trimmed source alongside.
    pub fn sanitize_text(&self, raw: Option<&str>) -> SafeText {
        let source = raw.map(str::trim).unwrap_or_default();
        if source.is_empty() {
            return SafeText::default();
        }

        SafeText {
            escaped: self.escape(source),
            source: source.to_string(),
        }
    }

    /// Escapes `text` after hard-wrapping its source every `width` characters.
    ///
    /// Breaks are placed regardless of word boundaries. Existing line breaks restart the count.
    /// A `width` of zero disables wrapping.
    pub fn escape_wrapped(&self, text: &SafeText, width: usize) -> String {
        if width == 0 {
            return text.escaped.clone();
        }

        let normalized = text.source.replace("\r\n", "\n").replace('\r', "\n");
        let mut pieces: Vec<String> = Vec::new();
        for line in normalized.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                pieces.push(String::new());
                continue;
            }
            for chunk in chars.chunks(width) {
                let chunk: String = chunk.iter().collect();
                pieces.push(self.escape(&chunk));
            }
        }

        pieces.join(FORCED_LINE_BREAK)
    }

    /// Applies the rule list in one left-to-right pass without trimming.
    pub fn escape(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len() + input.len() / 4);
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            let matched = self.rules.iter().find(|rule| match rule.matcher {
                Matcher::Char(target) => target == c,
                Matcher::LineBreak => c == '\n' || c == '\r',
            });

            match matched {
                Some(rule) => {
                    if rule.matcher == Matcher::LineBreak && c == '\r' {
                        chars.next_if_eq(&'\n');
                    }
                    out.push_str(rule.replacement);
                }
                None => out.push(c),
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: &str) -> String {
        Sanitizer::latex().sanitize(Some(raw))
    }

    #[test]
    fn test_none_and_blank_are_empty() {
        let sanitizer = Sanitizer::latex();
        assert_eq!(sanitizer.sanitize(None), "");
        assert_eq!(sanitizer.sanitize(Some("")), "");
        assert_eq!(sanitizer.sanitize(Some(" \t\n ")), "");
    }

    #[test]
    fn test_trims_before_escaping() {
        assert_eq!(sanitize("  Amoxicillin 500mg \n"), "Amoxicillin 500mg");
    }

    #[test]
    fn test_backslash_braces_are_not_re_escaped() {
        assert_eq!(sanitize(r"a\b"), "a\\textbackslash{}b");
    }

    #[test]
    fn test_line_breaks_become_forced_breaks() {
        assert_eq!(sanitize("one\ntwo"), "one\\newline two");
        assert_eq!(sanitize("one\r\ntwo"), "one\\newline two");
        assert_eq!(sanitize("one\rtwo"), "one\\newline two");
    }

    #[test]
    fn test_forced_break_backslash_is_not_re_escaped() {
        let out = sanitize("a\nb");
        assert!(!out.contains("textbackslash"));
    }

    #[test]
    fn test_reserved_characters() {
        assert_eq!(sanitize("5% & $3 #1"), "5\\% \\& \\$3 \\#1");
        assert_eq!(sanitize("a_b{c}"), "a\\_b\\{c\\}");
        assert_eq!(sanitize("~^"), "\\textasciitilde{}\\textasciicircum{}");
        assert_eq!(sanitize("<|>"), "\\textless{}\\textbar{}\\textgreater{}");
        assert_eq!(
            sanitize("\"'`"),
            "\\textquotedbl{}\\textquotesingle{}\\textasciigrave{}"
        );
    }

    #[test]
    fn test_plain_text_is_unchanged_and_stable() {
        let samples = ["Amoxicillin", "D1", "2024-01-01", "Dr. One, Dr. Two", "Ünïcode 5mg/kg"];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(once, sample);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_each_reserved_char_escapes_to_fixed_point_free_output() {
        // Escaped output of one reserved character must not contain that character unescaped
        // at a position a later rule could have matched.
        for rule in LATEX_RULES {
            if let Matcher::Char(c) = rule.matcher {
                let input = format!("x{}y", c);
                let out = sanitize(&input);
                assert_eq!(out, format!("x{}y", rule.replacement));
            }
        }
    }

    #[test]
    fn test_sanitize_text_keeps_source() {
        let text = Sanitizer::latex().sanitize_text(Some("  50% dose "));
        assert_eq!(text.source(), "50% dose");
        assert_eq!(text.escaped(), "50\\% dose");
        assert!(!text.is_empty());
    }

    #[test]
    fn test_escape_wrapped_breaks_on_source_characters() {
        let sanitizer = Sanitizer::latex();
        let text = sanitizer.sanitize_text(Some("abcdefghijk"));
        assert_eq!(sanitizer.escape_wrapped(&text, 4), "abcd\\newline efgh\\newline ijk");
    }

    #[test]
    fn test_escape_wrapped_never_splits_escape_sequences() {
        let sanitizer = Sanitizer::latex();
        let text = sanitizer.sanitize_text(Some("%%%%"));
        assert_eq!(
            sanitizer.escape_wrapped(&text, 1),
            "\\%\\newline \\%\\newline \\%\\newline \\%"
        );
    }

    #[test]
    fn test_escape_wrapped_restarts_at_line_breaks() {
        let sanitizer = Sanitizer::latex();
        let text = sanitizer.sanitize_text(Some("abc\nde"));
        assert_eq!(sanitizer.escape_wrapped(&text, 2), "ab\\newline c\\newline de");
    }

    #[test]
    fn test_escape_wrapped_short_text_is_plain_escape() {
        let sanitizer = Sanitizer::latex();
        let text = sanitizer.sanitize_text(Some("12 kg"));
        assert_eq!(sanitizer.escape_wrapped(&text, 18), "12 kg");
        assert_eq!(sanitizer.escape_wrapped(&text, 0), "12 kg");
    }

    #[test]
    fn test_custom_rules_apply_in_order() {
        let sanitizer = Sanitizer::new(vec![
            EscapeRule {
                matcher: Matcher::Char('a'),
                replacement: "b",
            },
            EscapeRule {
                matcher: Matcher::Char('b'),
                replacement: "c",
            },
        ]);
        // Single pass: the `b` produced for `a` is not rewritten to `c`.
        assert_eq!(sanitizer.sanitize(Some("ab")), "bc");
    }
}
