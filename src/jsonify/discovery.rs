//! Locating JSON literals inside free-form text.
//!
//! The scanner walks the text once, and at every `{` or `[` tries to find the
//! matching close bracket. Brackets inside JSON strings (with `\"` escapes)
//! do not count, and a closer of the wrong kind abandons the candidate.
//! Nesting depth is unbounded.

use crate::error::ExtractError;
use serde_json::value::RawValue;
use tracing::debug;

/// Every balanced top-level `{...}` / `[...]` literal, left to right.
///
/// Scanning resumes after the end of each candidate, so candidates never
/// overlap. An opener with no balanced close is skipped.
pub fn find_candidates(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if matches!(bytes[pos], b'{' | b'[') {
            if let Some(end) = balanced_end(bytes, pos) {
                candidates.push(&text[pos..end]);
                pos = end;
                continue;
            }
        }
        pos += 1;
    }
    candidates
}

/// Byte offset one past the bracket closing the one at `start`.
///
/// All structural characters are ASCII, so byte offsets always fall on char
/// boundaries.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut expected: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(b) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Turn candidates into individual value literals.
///
/// A candidate that parses as a JSON array contributes one value per element.
/// Anything else that does not start with `[` is kept whole. A `[` candidate
/// that is not a valid array makes the whole batch ambiguous and fails it.
pub fn normalize<'a>(candidates: &[&'a str]) -> Result<Vec<&'a str>, ExtractError> {
    let mut values = Vec::new();
    for &candidate in candidates {
        match serde_json::from_str::<Vec<&RawValue>>(candidate) {
            Ok(elements) => {
                debug!(elements = elements.len(), "Flattened JSON array candidate");
                values.extend(elements.into_iter().map(RawValue::get));
            }
            Err(_) if !candidate.starts_with('[') => values.push(candidate),
            Err(_) => {
                return Err(ExtractError::MalformedArray {
                    literal: candidate.to_string(),
                });
            }
        }
    }
    Ok(values)
}

/// Discovery plus normalization: every value literal found in `text`.
pub fn extract_values(text: &str) -> Result<Vec<&str>, ExtractError> {
    let candidates = find_candidates(text);
    if candidates.is_empty() {
        return Err(ExtractError::NoStructureFound);
    }
    normalize(&candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object_in_prose() {
        let values = extract_values(
            "Some text before {\"heading\": \"Test Title\", \"summary\": \"Test Summary\"} and after",
        )
        .unwrap();
        assert_eq!(
            values,
            vec!["{\"heading\": \"Test Title\", \"summary\": \"Test Summary\"}"]
        );
    }

    #[test]
    fn test_array_of_objects_is_flattened() {
        let values = extract_values(
            "Text [{\"heading\": \"Title 1\", \"summary\": \"Sum 1\"}, {\"heading\": \"Title 2\", \"summary\": \"Sum 2\"}]",
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                "{\"heading\": \"Title 1\", \"summary\": \"Sum 1\"}",
                "{\"heading\": \"Title 2\", \"summary\": \"Sum 2\"}",
            ]
        );
    }

    #[test]
    fn test_no_structure() {
        assert!(matches!(
            extract_values("Text with no JSON"),
            Err(ExtractError::NoStructureFound)
        ));
    }

    #[test]
    fn test_invalid_array_is_fatal() {
        assert!(matches!(
            extract_values("[invalid json]"),
            Err(ExtractError::MalformedArray { .. })
        ));
        assert!(matches!(
            extract_values("{\"a\": 1} then [not, valid]"),
            Err(ExtractError::MalformedArray { literal }) if literal == "[not, valid]"
        ));
    }

    #[test]
    fn test_unparseable_object_is_kept_whole() {
        let values = extract_values("maybe {this is prose} here").unwrap();
        assert_eq!(values, vec!["{this is prose}"]);
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let text = r#"Result: {"summary": "uses [brackets] and {braces} and \"quotes\""} done"#;
        let candidates = find_candidates(text);
        assert_eq!(
            candidates,
            vec![r#"{"summary": "uses [brackets] and {braces} and \"quotes\""}"#]
        );
    }

    #[test]
    fn test_deep_nesting() {
        let text = r#"x {"a": {"b": {"c": [1, [2, {"d": 3}]]}}} y"#;
        let candidates = find_candidates(text);
        assert_eq!(candidates, vec![r#"{"a": {"b": {"c": [1, [2, {"d": 3}]]}}}"#]);
    }

    #[test]
    fn test_discovery_order_across_candidates() {
        let text = r#"{"n": 1} then [{"n": 2}, {"n": 3}] and finally {"n": 4}"#;
        let values = extract_values(text).unwrap();
        assert_eq!(
            values,
            vec![r#"{"n": 1}"#, r#"{"n": 2}"#, r#"{"n": 3}"#, r#"{"n": 4}"#]
        );
    }

    #[test]
    fn test_mismatched_closer_is_skipped() {
        let text = r#"oops [ } then {"ok": true}"#;
        assert_eq!(find_candidates(text), vec![r#"{"ok": true}"#]);
    }

    #[test]
    fn test_unclosed_opener_is_skipped() {
        let text = r#"{"truncated": [1, 2 and later [3]"#;
        assert_eq!(find_candidates(text), vec!["[3]"]);
    }

    #[test]
    fn test_non_ascii_text() {
        let text = "要約: {\"heading\": \"見出し\"} です";
        assert_eq!(extract_values(text).unwrap(), vec!["{\"heading\": \"見出し\"}"]);
    }
}
