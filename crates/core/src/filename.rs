//! Artifact file naming.

use wardchart_ids::RunId;
use wardchart_types::NonEmptyText;

const MAX_FILENAME_CHARS: usize = 200;
/// Upper bound for a full artifact stem, leaving room for the extension under the common
/// 255-byte file name limit.
const MAX_STEM_BYTES: usize = 240;
const EMPTY_FILENAME_FALLBACK: &str = "sanitized_empty_filename";

fn is_forbidden(c: char) -> bool {
    matches!(
        c,
        '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\n' | '\r' | '\t'
    )
}

/// Makes `input` safe to use as one path component.
///
/// Surrounding whitespace is trimmed, characters that are invalid in file names on common
/// platforms become `_`, runs of `_` are collapsed, leading and trailing `_` are stripped, and
/// the result is limited to 200 characters. Input that sanitises to nothing yields
/// `sanitized_empty_filename`.
pub fn sanitize_filename(input: &str) -> NonEmptyText {
    let input = input.trim();
    let mut collapsed = String::with_capacity(input.len());
    for c in input.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    let limited: String = collapsed
        .trim_matches(is_edge)
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();

    non_empty_or_fallback(limited.trim_matches(is_edge))
}

/// Builds the artifact stem `<name>_<uhid>_<run id>`.
///
/// Both parts go through [`sanitize_filename`]; the whole stem is then held to
/// `MAX_STEM_BYTES` bytes. The run id is never shortened. The uhid keeps up to half of the
/// remaining budget and the name takes what is left, each cut on a character boundary.
pub fn artifact_stem(name: &str, uhid: &str, run_id: &RunId) -> NonEmptyText {
    let run_id = run_id.to_string();
    let name = sanitize_filename(name);
    let uhid = sanitize_filename(uhid);

    let budget = MAX_STEM_BYTES.saturating_sub(run_id.len() + 2);
    let uhid = truncate_to_bytes(uhid.as_str(), budget / 2);
    let name = truncate_to_bytes(name.as_str(), budget - uhid.len());

    let stem = format!("{}_{}_{}", name, uhid, run_id);
    NonEmptyText::new(stem).unwrap_or_else(|_| non_empty_or_fallback(""))
}

/// Cuts `text` to at most `max_bytes` bytes without splitting a character, then strips any
/// separator left dangling at either edge.
fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    let mut end = text.len().min(max_bytes);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].trim_matches(is_edge)
}

fn is_edge(c: char) -> bool {
    c == '_' || c.is_whitespace()
}

fn non_empty_or_fallback(text: &str) -> NonEmptyText {
    NonEmptyText::new(text).unwrap_or_else(|_| {
        NonEmptyText::new(EMPTY_FILENAME_FALLBACK).expect("fallback name is non-empty")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardchart_ids::RunIdGenerator;

    #[test]
    fn test_forbidden_characters_become_underscores() {
        assert_eq!(sanitize_filename("a<b>c:d").as_str(), "a_b_c_d");
        assert_eq!(sanitize_filename(r#"x"y/z\w|v?u*t"#).as_str(), "x_y_z_w_v_u_t");
        assert_eq!(sanitize_filename("line\nfeed\ttab").as_str(), "line_feed_tab");
    }

    #[test]
    fn test_runs_collapse_and_edges_strip() {
        assert_eq!(sanitize_filename("__a//__b__").as_str(), "a_b");
        assert_eq!(sanitize_filename("Baby A").as_str(), "Baby A");
    }

    #[test]
    fn test_empty_input_falls_back() {
        assert_eq!(sanitize_filename("").as_str(), "sanitized_empty_filename");
        assert_eq!(sanitize_filename("///").as_str(), "sanitized_empty_filename");
        assert_eq!(sanitize_filename("   ").as_str(), "sanitized_empty_filename");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(sanitize_filename(" _x_ ").as_str(), "x");
        assert_eq!(sanitize_filename(" Baby A ").as_str(), "Baby A");
        assert_eq!(sanitize_filename("a / b").as_str(), "a _ b");
    }

    #[test]
    fn test_stem_keeps_short_parts_whole() {
        let run_id = RunIdGenerator::new().next_id();
        let stem = artifact_stem(" Baby A ", "UH/001", &run_id);
        assert_eq!(stem.as_str(), format!("Baby A_UH_001_{}", run_id));
    }

    #[test]
    fn test_stem_fits_byte_budget_for_multibyte_name() {
        let run_id = RunIdGenerator::new().next_id();
        let name = "राजेश".repeat(14);
        assert_eq!(name.chars().count(), 70);

        let stem = artifact_stem(&name, "AIIMS-2024-0001234", &run_id);
        assert!(stem.as_str().len() <= MAX_STEM_BYTES);
        assert!(stem.as_str().starts_with("राजेश"));
        assert!(stem
            .as_str()
            .ends_with(&format!("_AIIMS-2024-0001234_{}", run_id)));
    }

    #[test]
    fn test_stem_fits_byte_budget_for_long_ascii_parts() {
        let run_id = RunIdGenerator::new().next_id();
        let name = "a".repeat(300);
        let uhid = "9".repeat(300);

        let stem = artifact_stem(&name, &uhid, &run_id);
        let stem = stem.as_str();
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(stem.ends_with(&run_id.to_string()));
        let parts: Vec<&str> = stem.splitn(3, '_').collect();
        assert!(!parts[0].is_empty() && parts[0].chars().all(|c| c == 'a'));
        assert!(!parts[1].is_empty() && parts[1].chars().all(|c| c == '9'));
    }

    #[test]
    fn test_truncation_never_splits_a_character() {
        assert_eq!(truncate_to_bytes("éé", 3), "é");
        assert_eq!(truncate_to_bytes("a_b", 2), "a");
        assert_eq!(truncate_to_bytes("abc", 10), "abc");
    }

    #[test]
    fn test_length_is_limited() {
        let long = "é".repeat(250);
        assert_eq!(sanitize_filename(&long).as_str().chars().count(), 200);
    }
}
