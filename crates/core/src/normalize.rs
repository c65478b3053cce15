//! Literal escape-sequence normalisation.
//!
//! Forms occasionally deliver text containing backslash sequences the clinician typed by hand
//! (`\t`, `\n`, `C:\drugs`). These are never intended as escapes. Before a record is read, every
//! string value in the JSON tree has each two-character backslash sequence replaced with a single
//! underscore. Only real line-break characters survive to the sanitizer, which turns them into
//! forced line breaks.
//!
//! The pass is idempotent: after one pass the only backslash that can remain in a string is a
//! lone trailing one, which no later pass can pair up.

use serde_json::Value;

/// A record JSON tree that has been through [`normalize_record`] exactly once.
///
/// The record reader only accepts this type, so un-normalised input cannot reach shaping and
/// normalisation cannot be applied twice by accident.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord(Value);

impl NormalizedRecord {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Normalises every string in `record`, recursing through arrays and objects.
///
/// Object keys are left untouched; they are structural, not clinician text.
pub fn normalize_record(mut record: Value) -> NormalizedRecord {
    normalize_value(&mut record);
    NormalizedRecord(record)
}

fn normalize_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains('\\') {
                *s = normalize_literal_escapes(s);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_value),
        Value::Object(map) => map.values_mut().for_each(normalize_value),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Replaces every backslash plus its following character with `_`.
///
/// `\n` written literally is treated like any other pair: it becomes `_`, never a line break.
pub fn normalize_literal_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(_) => out.push('_'),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_sequences_become_underscore() {
        assert_eq!(normalize_literal_escapes(r"C:\drugs\tpn"), "C:_rugs_pn");
        assert_eq!(normalize_literal_escapes(r"line\nbreak"), "line_break");
        assert_eq!(normalize_literal_escapes(r"a\\b"), "a_b");
    }

    #[test]
    fn test_real_line_breaks_survive() {
        assert_eq!(normalize_literal_escapes("first\nsecond"), "first\nsecond");
    }

    #[test]
    fn test_trailing_backslash_is_kept() {
        assert_eq!(normalize_literal_escapes(r"dose\"), r"dose\");
        assert_eq!(normalize_literal_escapes(r"\\\"), r"_\");
    }

    #[test]
    fn test_normalisation_is_idempotent() {
        let samples = [
            r"plain",
            r"\t\n\\",
            r"ends with \",
            r"\\\\\",
            "mixed \\x and\nreal break",
            r"ünïcödé \é",
        ];
        for sample in samples {
            let once = normalize_literal_escapes(sample);
            let twice = normalize_literal_escapes(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_record_is_normalised_recursively() {
        let record = json!({
            "Name": r"Baby\tA",
            "Age_year": 3,
            "each_entry_layout": {
                "entry_1": {
                    "title": r"Anti\microbials",
                    "subtitles": {
                        "subtitle_1": {"content": r"Amox\n500", "dose": "5mg"}
                    }
                }
            },
            "tags": [r"a\b", null, true]
        });

        let normalized = normalize_record(record).into_value();
        assert_eq!(normalized["Name"], "Baby_A");
        assert_eq!(normalized["Age_year"], 3);
        assert_eq!(normalized["each_entry_layout"]["entry_1"]["title"], "Anti_icrobials");
        assert_eq!(
            normalized["each_entry_layout"]["entry_1"]["subtitles"]["subtitle_1"]["content"],
            "Amox_500"
        );
        assert_eq!(normalized["tags"][0], "a_");
        assert_eq!(normalized["tags"][2], true);
    }

    #[test]
    fn test_keys_are_not_rewritten() {
        let record = json!({ r"odd\key": "value" });
        let normalized = normalize_record(record);
        assert!(normalized.as_value().get(r"odd\key").is_some());
    }
}
