//! JSON array extraction from LLM response text.
//!
//! The model is instructed to emit a bare JSON array, but real responses
//! regularly arrive wrapped in markdown fences or surrounded by commentary.
//! Extraction tries, in order:
//!
//! 1. A ```json fenced block
//! 2. A generic ``` fenced block
//! 3. Content that starts with '['
//! 4. The first '[' anywhere, matched to its closing bracket
//!
//! Every candidate must parse as a `serde_json::Value` before it is accepted;
//! failure at all stages means the response is structurally unusable.

use regex::Regex;

/// Extracts a JSON array from mixed model output.
///
/// Returns the parsed array elements, or `None` when the content holds no
/// parseable JSON array.
pub fn extract_json_array(content: &str) -> Option<Vec<serde_json::Value>> {
    let trimmed = content.trim();

    if let Some(block) = extract_from_code_block(trimmed) {
        if let Some(values) = parse_array(&block) {
            return Some(values);
        }
    }

    if trimmed.starts_with('[') {
        if let Some(end) = find_matching_bracket(trimmed) {
            if let Some(values) = parse_array(&trimmed[..=end]) {
                return Some(values);
            }
        }
    }

    // Last resort: first '[' anywhere in the content.
    let start = trimmed.find('[')?;
    let end = find_matching_bracket(&trimmed[start..])?;
    parse_array(&trimmed[start..=start + end])
}

/// Parses a candidate string, accepting only a top-level JSON array.
fn parse_array(candidate: &str) -> Option<Vec<serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(serde_json::Value::Array(values)) => Some(values),
        _ => None,
    }
}

/// Extract the body of a ```json (or generic ```) fenced block.
fn extract_from_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let body = caps.get(1)?.as_str().trim();
    if let Some(start) = body.find('[') {
        if let Some(end) = find_matching_bracket(&body[start..]) {
            return Some(body[start..=start + end].to_string());
        }
    }
    None
}

/// Find the index of the closing ']' matching a leading '[',
/// skipping brackets inside string literals and escape sequences.
pub fn find_matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '[' if !in_string => {
                depth += 1;
            }
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_array() {
        let result = extract_json_array(r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_json_fenced_block() {
        let input = "Here you go:\n```json\n[{\"keywords\": []}]\n```\nDone!";
        let result = extract_json_array(input).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_generic_fenced_block() {
        let input = "```\n[1, 2, 3]\n```";
        let result = extract_json_array(input).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_array_with_surrounding_text() {
        let input = r#"The array is [1, 2, 3] as requested."#;
        let result = extract_json_array(input).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_nested_arrays_and_strings() {
        let input = r#"[["x", "]"], {"s": "[not a bracket]"}]"#;
        let result = extract_json_array(input).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_escaped_quotes_in_strings() {
        let input = r#"[{"msg": "he said \"]\" loudly"}]"#;
        let result = extract_json_array(input).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_top_level_object_rejected() {
        assert!(extract_json_array(r#"{"not": "an array"}"#).is_none());
    }

    #[test]
    fn test_truncated_array_rejected() {
        assert!(extract_json_array(r#"[{"a": 1}, {"b":"#).is_none());
    }

    #[test]
    fn test_plain_text_rejected() {
        assert!(extract_json_array("no json here").is_none());
        assert!(extract_json_array("").is_none());
    }

    #[test]
    fn test_find_matching_bracket() {
        assert_eq!(find_matching_bracket("[]"), Some(1));
        assert_eq!(find_matching_bracket(r#"[[1], [2]]"#), Some(9));
        assert_eq!(find_matching_bracket("[1, 2"), None);
    }
}
